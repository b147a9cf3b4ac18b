use crate::models::{
    BalancingAlgorithm, CacheType, EvictionPolicy, IsolationLevel, Node, NodeKind,
};
use crate::state::RequestType;

const BASE_OVERLOAD_THRESHOLD: f64 = 0.8;
const MAX_OVERLOAD_THRESHOLD: f64 = 0.95;
const LARGE_MEMORY_GB: f64 = 16.0;
const MANY_CORES: u32 = 8;

/// Utilization above which `node` counts as overloaded for this request.
pub fn overload_threshold(node: &Node, request_type: RequestType) -> f64 {
    let mut threshold = BASE_OVERLOAD_THRESHOLD;
    match &node.kind {
        NodeKind::Server(server) => {
            if server.auto_scaling {
                threshold += 0.1;
            }
            if server.memory_gb >= LARGE_MEMORY_GB {
                threshold += 0.05;
            }
            if server.cpu_cores >= MANY_CORES {
                threshold += 0.05;
            }
        }
        NodeKind::Database(db) => {
            if request_type == RequestType::Read && db.read_replicas > 0 {
                threshold += 0.05;
            }
            if db.sharding {
                threshold += 0.05;
            }
            if db.isolation_level == IsolationLevel::Serializable {
                threshold -= 0.05;
            }
        }
        NodeKind::LoadBalancer(lb) => {
            if lb.auto_scaling {
                threshold += 0.1;
            }
            if lb.algorithm == BalancingAlgorithm::LeastConnections {
                threshold += 0.05;
            }
        }
        NodeKind::Cache(cache) => {
            if matches!(cache.eviction_policy, EvictionPolicy::Lru | EvictionPolicy::Lfu) {
                threshold += 0.05;
            }
            if cache.cache_type == CacheType::Distributed {
                threshold += 0.05;
            }
        }
        NodeKind::Client(_) => {}
    }
    threshold.min(MAX_OVERLOAD_THRESHOLD)
}

/// Chance that `node` fails a request during one tick of `tick_ms`. Load is
/// handled by the overload check, not here. Clients never fail on their own.
pub fn ambient_failure_probability(node: &Node, request_type: RequestType, tick_ms: u64) -> f64 {
    let rate = match &node.kind {
        NodeKind::Server(server) => {
            let mut rate = server.failure_probability;
            if server.auto_scaling {
                rate *= 0.5;
            }
            rate
        }
        NodeKind::Database(db) => {
            let mut rate = db.failure_probability;
            if db.replication {
                rate *= 0.5;
            }
            if request_type == RequestType::Transaction {
                rate *= 1.5;
            }
            rate
        }
        NodeKind::Cache(cache) => {
            let mut rate = cache.failure_probability;
            if cache.replication {
                rate *= 0.5;
            }
            rate
        }
        NodeKind::LoadBalancer(lb) => {
            let mut rate = lb.failure_probability;
            if lb.health_checks {
                rate *= 0.5;
            }
            rate
        }
        NodeKind::Client(_) => 0.0,
    };
    (rate * tick_ms as f64 / 1000.0).clamp(0.0, 1.0)
}
