use rand::RngCore;

use crate::models::{LoadBalancerType, Node, NodeKind, WritePolicy};
use crate::random::{jitter, roll};
use crate::state::RequestType;

const CACHE_HIT_MS: f64 = 3.0;
const CACHE_MISS_FACTOR: f64 = 3.0;
const CLIENT_PROCESSING_MS: f64 = 10.0;
const SESSION_PERSISTENCE_MS: f64 = 2.0;
const CONTENT_ROUTING_MS: f64 = 8.0;
/// Clients talking to a database directly pay for the missing tiers.
const DIRECT_DATABASE_PENALTY: f64 = 5.0;
const LATENCY_JITTER: f64 = 0.2;

/// Time a request must spend at `node` before it may move on.
///
/// `previous` is the node the request just left, if any.
pub fn required_processing_time(
    node: &Node,
    previous: Option<&Node>,
    request_type: RequestType,
    rng: &mut dyn RngCore,
) -> f64 {
    let base = match &node.kind {
        NodeKind::Server(server) => {
            let factor = if request_type == RequestType::Compute {
                1.5
            } else {
                1.0
            };
            server.average_processing_time_ms * factor
        }
        NodeKind::Database(db) => {
            let factor = match request_type {
                RequestType::Write => 1.5,
                RequestType::Transaction => 2.0,
                RequestType::Read | RequestType::Compute => 1.0,
            };
            db.average_latency_ms * factor
        }
        NodeKind::Cache(cache) => {
            if roll(rng, cache.expected_hit_rate) {
                return CACHE_HIT_MS;
            }
            let policy = match cache.write_policy {
                WritePolicy::WriteThrough => 1.8,
                WritePolicy::WriteBehind => 0.9,
                WritePolicy::WriteAround => 1.5,
            };
            cache.average_latency_ms * CACHE_MISS_FACTOR * policy
        }
        NodeKind::LoadBalancer(lb) => {
            let mut latency = lb.processing_latency_ms.unwrap_or(match lb.lb_type {
                LoadBalancerType::Network => 2.0,
                LoadBalancerType::Application => 5.0,
                LoadBalancerType::Gateway => 8.0,
                LoadBalancerType::Classic => 4.0,
            });
            if lb.session_persistence {
                latency += SESSION_PERSISTENCE_MS;
            }
            if lb.content_based_routing {
                latency += CONTENT_ROUTING_MS;
            }
            latency
        }
        NodeKind::Client(_) => CLIENT_PROCESSING_MS,
    };

    let mut required = base * jitter(rng, LATENCY_JITTER);
    if previous.map_or(false, Node::is_client) && node.is_database() {
        required *= DIRECT_DATABASE_PENALTY;
    }
    required
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CacheConfig, ClientConfig, DatabaseConfig, LoadBalancerConfig, ServerConfig};
    use crate::random::FixedRng;

    #[test]
    fn server_compute_takes_longer() {
        let server = Node::new("api", NodeKind::Server(ServerConfig::default()));
        let mut rng = FixedRng::low();
        assert_eq!(
            required_processing_time(&server, None, RequestType::Read, &mut rng),
            40.0
        );
        assert_eq!(
            required_processing_time(&server, None, RequestType::Compute, &mut rng),
            60.0
        );
    }

    #[test]
    fn cache_hit_is_fixed_and_miss_depends_on_write_policy() {
        let cache = Node::new(
            "kv",
            NodeKind::Cache(CacheConfig {
                write_policy: WritePolicy::WriteBehind,
                ..CacheConfig::default()
            }),
        );
        assert_eq!(
            required_processing_time(&cache, None, RequestType::Write, &mut FixedRng::low()),
            CACHE_HIT_MS
        );
        let miss = required_processing_time(&cache, None, RequestType::Write, &mut FixedRng::high());
        // 2 * 3 * 0.9 * 1.2
        assert!((miss - 6.48).abs() < 1e-9);
        let read_miss =
            required_processing_time(&cache, None, RequestType::Read, &mut FixedRng::high());
        assert!((read_miss - 6.48).abs() < 1e-9);

        let write_through = Node::new("kv", NodeKind::Cache(CacheConfig::default()));
        let read_miss =
            required_processing_time(&write_through, None, RequestType::Read, &mut FixedRng::high());
        // 2 * 3 * 1.8 * 1.2
        assert!((read_miss - 12.96).abs() < 1e-9);
    }

    #[test]
    fn load_balancer_overheads_are_additive() {
        let lb = Node::new(
            "lb",
            NodeKind::LoadBalancer(LoadBalancerConfig {
                lb_type: LoadBalancerType::Gateway,
                session_persistence: true,
                content_based_routing: true,
                ..LoadBalancerConfig::default()
            }),
        );
        let required =
            required_processing_time(&lb, None, RequestType::Read, &mut FixedRng::low());
        assert!((required - 14.4).abs() < 1e-9);

        let explicit = Node::new(
            "lb",
            NodeKind::LoadBalancer(LoadBalancerConfig {
                processing_latency_ms: Some(10.0),
                ..LoadBalancerConfig::default()
            }),
        );
        assert_eq!(
            required_processing_time(&explicit, None, RequestType::Read, &mut FixedRng::low()),
            8.0
        );
    }

    #[test]
    fn clients_hitting_databases_are_penalised() {
        let client = Node::new("c", NodeKind::Client(ClientConfig::default()));
        let server = Node::new("api", NodeKind::Server(ServerConfig::default()));
        let db = Node::new("db", NodeKind::Database(DatabaseConfig::default()));
        let mut rng = FixedRng::low();

        let direct = required_processing_time(&db, Some(&client), RequestType::Transaction, &mut rng);
        // 20 * 2 * 0.8 * 5
        assert_eq!(direct, 160.0);
        let tiered = required_processing_time(&db, Some(&server), RequestType::Transaction, &mut rng);
        assert_eq!(tiered, 32.0);
    }
}
