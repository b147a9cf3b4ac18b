use rand::{Rng, RngCore};

use crate::models::{
    AuthMethod, ClientConfig, DatabaseType, DeviceClass, Node, NodeKind, PerformanceTier,
    Protocol, QueryComplexity,
};
use crate::state::RequestType;

pub fn type_size_multiplier(request_type: RequestType) -> f64 {
    match request_type {
        RequestType::Read => 0.7,
        RequestType::Write => 1.5,
        RequestType::Compute => 1.0,
        RequestType::Transaction => 2.0,
    }
}

/// Additive client-side overheads on top of a neutral 1.0.
pub fn client_size_multiplier(client: &ClientConfig) -> f64 {
    let protocol: f64 = match client.preferred_protocol {
        Protocol::Http => 0.0,
        Protocol::Https => 0.05,
        Protocol::Grpc => -0.2,
        Protocol::WebSocket => -0.1,
        Protocol::Tcp => -0.15,
    };
    let device = match client.device_class {
        DeviceClass::Desktop => 0.0,
        DeviceClass::Mobile => -0.1,
        DeviceClass::Iot => -0.3,
    };
    let auth = match client.authentication {
        AuthMethod::None => 0.0,
        AuthMethod::ApiKey => 0.02,
        AuthMethod::Jwt => 0.1,
        AuthMethod::OAuth => 0.15,
        AuthMethod::Mtls => 0.05,
    };
    (1.0 + protocol + device + auth).max(0.1)
}

pub fn destination_size_multiplier(destination: &Node, client: &ClientConfig) -> f64 {
    match &destination.kind {
        NodeKind::Database(db) => {
            let complexity = match db.query_complexity {
                QueryComplexity::Simple => 1.0,
                QueryComplexity::Moderate => 1.3,
                QueryComplexity::Complex => 1.8,
            };
            let storage = match db.database_type {
                DatabaseType::Relational => 1.0,
                DatabaseType::Document => 1.1,
                DatabaseType::KeyValue => 0.8,
                DatabaseType::Graph => 1.2,
                DatabaseType::TimeSeries => 0.9,
            };
            complexity * storage
        }
        NodeKind::Server(server) => {
            let mut multiplier = 1.0;
            if !server.supports(client.preferred_protocol) {
                multiplier += 0.1;
            }
            if server.authentication != AuthMethod::None {
                multiplier += 0.05;
            }
            multiplier
        }
        NodeKind::LoadBalancer(lb) => {
            let mut multiplier = 1.0;
            if lb.content_based_routing {
                multiplier += 0.1;
            }
            if lb.ssl_termination {
                multiplier += 0.05;
            }
            multiplier
        }
        NodeKind::Cache(_) | NodeKind::Client(_) => 1.0,
    }
}

/// Payload size in whole KB, never below 1.
pub fn estimate_request_size(
    base_size_kb: f64,
    request_type: RequestType,
    client: &ClientConfig,
    destination: &Node,
    rng: &mut dyn RngCore,
) -> u32 {
    let size = base_size_kb
        * type_size_multiplier(request_type)
        * client_size_multiplier(client)
        * destination_size_multiplier(destination, client)
        * rng.gen_range(0.8..=1.2);
    size.round().max(1.0) as u32
}

/// Time the request spends at its client before leaving.
pub fn initial_processing_time(client: &ClientConfig) -> f64 {
    let base = match client.device_performance {
        PerformanceTier::Low => 30.0,
        PerformanceTier::Medium => 20.0,
        PerformanceTier::High => 10.0,
    };
    match client.bandwidth_limit_mbps {
        Some(bandwidth) if bandwidth > 0.0 => base * (10.0 / bandwidth).min(3.0),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatabaseConfig, ServerConfig};
    use crate::random::FixedRng;

    #[test]
    fn size_combines_all_multipliers() {
        let client = ClientConfig::default();
        let server = Node::new("api", NodeKind::Server(ServerConfig::default()));
        let mut rng = FixedRng::low();
        // 10 * 1.5 * 1.0 * 1.0 * 0.8
        assert_eq!(
            estimate_request_size(10.0, RequestType::Write, &client, &server, &mut rng),
            12
        );
    }

    #[test]
    fn complex_queries_grow_payloads() {
        let client = ClientConfig::default();
        let db = Node::new(
            "db",
            NodeKind::Database(DatabaseConfig {
                query_complexity: QueryComplexity::Complex,
                database_type: DatabaseType::Graph,
                ..DatabaseConfig::default()
            }),
        );
        assert!((destination_size_multiplier(&db, &client) - 2.16).abs() < 1e-9);
    }

    #[test]
    fn client_overheads_are_additive() {
        let client = ClientConfig {
            preferred_protocol: Protocol::Grpc,
            device_class: DeviceClass::Mobile,
            authentication: AuthMethod::OAuth,
            ..ClientConfig::default()
        };
        assert!((client_size_multiplier(&client) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn tiny_payloads_round_up_to_one_kb() {
        let client = ClientConfig {
            device_class: DeviceClass::Iot,
            ..ClientConfig::default()
        };
        let server = Node::new("api", NodeKind::Server(ServerConfig::default()));
        let mut rng = FixedRng::low();
        assert_eq!(
            estimate_request_size(0.5, RequestType::Read, &client, &server, &mut rng),
            1
        );
    }

    #[test]
    fn processing_estimate_scales_with_bandwidth() {
        let mut client = ClientConfig {
            device_performance: PerformanceTier::Low,
            ..ClientConfig::default()
        };
        assert_eq!(initial_processing_time(&client), 30.0);
        client.bandwidth_limit_mbps = Some(5.0);
        assert_eq!(initial_processing_time(&client), 60.0);
        client.bandwidth_limit_mbps = Some(1.0);
        assert_eq!(initial_processing_time(&client), 90.0);
        client.device_performance = PerformanceTier::High;
        client.bandwidth_limit_mbps = Some(100.0);
        assert!((initial_processing_time(&client) - 1.0).abs() < 1e-9);
    }
}
