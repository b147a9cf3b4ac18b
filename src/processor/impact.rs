use crate::models::{
    CacheType, Edge, EdgeKind, IsolationLevel, LoadBalancerType, Node, NodeKind, QueryComplexity,
    WritePolicy,
};
use crate::state::{RequestType, SimulationRequest};

const CLIENT_IMPACT: f64 = 0.01;
const MAX_EDGE_IMPACT: f64 = 0.1;
const REFERENCE_CORES: f64 = 4.0;
const LOW_MEMORY_GB: f64 = 4.0;

/// Per-capacity-unit share, guarding against zero capacity.
fn per_slot(capacity: u32) -> f64 {
    1.0 / capacity.max(1) as f64
}

/// Utilization one request adds to `node` while it is processed there,
/// capped at `max_impact`.
pub fn node_impact(node: &Node, request: &SimulationRequest, max_impact: f64) -> f64 {
    let impact = match &node.kind {
        NodeKind::Server(server) => {
            let type_factor = match request.request_type {
                RequestType::Read => 1.0,
                RequestType::Write => 1.2,
                RequestType::Compute => 1.5,
                RequestType::Transaction => 1.3,
            };
            let core_factor = (REFERENCE_CORES / server.cpu_cores.max(1) as f64).clamp(0.5, 2.0);
            let memory_factor = if server.memory_gb < LOW_MEMORY_GB {
                1.2
            } else {
                1.0
            };
            let size_factor = 1.0 + request.size_kb as f64 / 1000.0;
            per_slot(server.max_concurrent_requests)
                * type_factor
                * core_factor
                * memory_factor
                * size_factor
        }
        NodeKind::Database(db) => {
            let type_factor = match request.request_type {
                RequestType::Read if db.read_replicas > 0 => 0.4,
                RequestType::Read => 0.8,
                RequestType::Write => 1.5,
                RequestType::Transaction => 2.0 * isolation_factor(db.isolation_level),
                RequestType::Compute => 1.2,
            };
            let complexity = match db.query_complexity {
                QueryComplexity::Simple => 1.0,
                QueryComplexity::Moderate => 1.3,
                QueryComplexity::Complex => 1.8,
            };
            per_slot(db.max_connections) * type_factor * complexity
        }
        NodeKind::LoadBalancer(lb) => {
            let mut factor = match lb.lb_type {
                LoadBalancerType::Network => 0.5,
                LoadBalancerType::Application => 1.0,
                LoadBalancerType::Gateway => 1.2,
                LoadBalancerType::Classic => 0.8,
            };
            if lb.content_based_routing {
                factor *= 1.2;
            }
            if lb.ssl_termination {
                factor *= 1.1;
            }
            per_slot(lb.max_connections) * factor
        }
        NodeKind::Cache(cache) => {
            let operation = match request.request_type {
                RequestType::Write | RequestType::Transaction => match cache.write_policy {
                    WritePolicy::WriteThrough => 1.5,
                    WritePolicy::WriteBehind => 1.1,
                    WritePolicy::WriteAround => 0.8,
                },
                RequestType::Read | RequestType::Compute => 0.6,
            };
            let storage = match cache.cache_type {
                CacheType::InMemory => 0.8,
                CacheType::Distributed => 1.0,
                CacheType::Cdn => 0.7,
            };
            per_slot(cache.max_connections) * operation * storage
        }
        NodeKind::Client(_) => CLIENT_IMPACT,
    };
    impact.clamp(0.0, max_impact)
}

fn isolation_factor(level: IsolationLevel) -> f64 {
    match level {
        IsolationLevel::Serializable => 1.3,
        IsolationLevel::RepeatableRead => 1.15,
        IsolationLevel::ReadCommitted => 1.0,
        IsolationLevel::ReadUncommitted => 0.9,
    }
}

/// Utilization one request adds to `edge` while crossing it: the larger of
/// its bandwidth share and its throughput share, shaped by protocol.
pub fn edge_impact(edge: &Edge, request: &SimulationRequest) -> f64 {
    let link = &edge.link;
    let megabits = request.size_kb as f64 * 8.0 / 1000.0;
    let bandwidth_share = if link.bandwidth_mbps > 0.0 {
        megabits / link.bandwidth_mbps
    } else {
        MAX_EDGE_IMPACT
    };
    let throughput_share = match link.throughput_rps {
        Some(rps) if rps > 0.0 => 1.0 / rps,
        _ => 0.0,
    };

    let mut impact = bandwidth_share.max(throughput_share) * protocol_factor(&edge.kind);
    if link.encrypted {
        impact *= 1.1;
    }
    impact.clamp(0.0, MAX_EDGE_IMPACT)
}

fn protocol_factor(kind: &EdgeKind) -> f64 {
    match kind {
        EdgeKind::Http {
            keep_alive,
            compression,
        } => {
            let mut factor = if *keep_alive { 0.9 } else { 1.0 };
            if *compression {
                factor *= 0.7;
            }
            factor
        }
        EdgeKind::WebSocket { .. } => 0.6,
        EdgeKind::Grpc { compression, .. } => {
            if *compression {
                0.4
            } else {
                0.5
            }
        }
        EdgeKind::Tcp { .. } => 0.8,
        EdgeKind::Udp => 0.4,
        EdgeKind::Kafka(_) => 0.5,
        EdgeKind::RabbitMq(_) => 0.6,
        EdgeKind::Sqs(_) => 0.7,
        EdgeKind::Database { .. } => 1.0,
        EdgeKind::EventStream { .. } => 0.5,
    }
}
