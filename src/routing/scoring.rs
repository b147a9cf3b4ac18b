use crate::models::{Node, NodeId};
use crate::routing::{PathScorer, RouteContext};
use crate::state::{RequestType, SimulationRequest};

// Weights are game-design values, not tuned against real systems.
const BASE_PATH_SCORE: f64 = 100.0;
const EARLY_LOAD_BALANCER_BONUS: f64 = 15.0;
const SERVER_BEFORE_DATABASE_BONUS: f64 = 10.0;
const CACHE_BEFORE_DATABASE_BONUS: f64 = 15.0;
const COMPUTE_SERVER_BONUS: f64 = 5.0;
const SPECIALIZED_NODE_BONUS: f64 = 10.0;
const HIGH_CORE_COUNT: u32 = 8;
const LOAD_BALANCER_WINDOW: usize = 3;
const LOAD_BALANCER_WINDOW_BONUS: f64 = 5.0;
const MAX_LOAD_BALANCERS: usize = 2;
const EXTRA_LOAD_BALANCER_PENALTY: f64 = 10.0;
const UTILIZATION_WEIGHT: f64 = 20.0;
const PROTOCOL_MISMATCH_PENALTY: f64 = 50.0;

/// Default path scorer: favours conventional layering (load balancer in
/// front, servers ahead of databases, caches ahead of databases for reads),
/// lightly loaded nodes, and servers that speak the client's protocol.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchitecturalScorer;

impl PathScorer for ArchitecturalScorer {
    fn score(&self, path: &[NodeId], request: &SimulationRequest, ctx: &RouteContext) -> f64 {
        // Unresolved ids keep their slot so positional rules stay aligned.
        let nodes: Vec<Option<&Node>> = path.iter().map(|id| ctx.graph.node(id)).collect();

        let score = BASE_PATH_SCORE
            + layering_score(&nodes, request.request_type)
            + specialized_node_score(&nodes, request.request_type)
            + load_balancing_score(&nodes)
            + utilization_score(path, ctx)
            - protocol_penalty(&nodes, request);
        score.max(0.0)
    }
}

fn first_index(nodes: &[Option<&Node>], predicate: impl Fn(&Node) -> bool) -> Option<usize> {
    nodes
        .iter()
        .position(|node| node.map_or(false, |node| predicate(node)))
}

fn count(nodes: &[Option<&Node>], predicate: impl Fn(&Node) -> bool) -> usize {
    nodes.iter().flatten().filter(|node| predicate(node)).count()
}

fn layering_score(nodes: &[Option<&Node>], request_type: RequestType) -> f64 {
    let mut score = 0.0;

    if first_index(nodes, Node::is_load_balancer) == Some(1) {
        score += EARLY_LOAD_BALANCER_BONUS;
    }

    let server = first_index(nodes, Node::is_server);
    let database = first_index(nodes, Node::is_database);
    let cache = first_index(nodes, Node::is_cache);

    if matches!(request_type, RequestType::Read | RequestType::Write) {
        if let (Some(server), Some(database)) = (server, database) {
            if server < database {
                score += SERVER_BEFORE_DATABASE_BONUS;
            }
        }
    }

    if request_type == RequestType::Read {
        if let Some(cache) = cache {
            if database.map_or(true, |database| cache < database) {
                score += CACHE_BEFORE_DATABASE_BONUS;
            }
        }
    }

    if request_type == RequestType::Compute {
        score += COMPUTE_SERVER_BONUS * count(nodes, Node::is_server) as f64;
    }

    score
}

fn specialized_node_score(nodes: &[Option<&Node>], request_type: RequestType) -> f64 {
    let present = match request_type {
        RequestType::Read => count(nodes, Node::is_cache) > 0,
        RequestType::Write | RequestType::Transaction => count(nodes, Node::is_database) > 0,
        RequestType::Compute => count(nodes, |node| {
            node.as_server()
                .map_or(false, |server| server.cpu_cores >= HIGH_CORE_COUNT)
        }) > 0,
    };
    if present {
        SPECIALIZED_NODE_BONUS
    } else {
        0.0
    }
}

fn load_balancing_score(nodes: &[Option<&Node>]) -> f64 {
    let mut score = 0.0;

    let window = nodes.iter().skip(1).take(LOAD_BALANCER_WINDOW);
    if window.flatten().any(|node| node.is_load_balancer()) {
        score += LOAD_BALANCER_WINDOW_BONUS;
    }

    let balancers = count(nodes, Node::is_load_balancer);
    if balancers > MAX_LOAD_BALANCERS {
        score -= EXTRA_LOAD_BALANCER_PENALTY * (balancers - MAX_LOAD_BALANCERS) as f64;
    }

    score
}

/// Rewards paths whose nodes after the first are lightly loaded.
fn utilization_score(path: &[NodeId], ctx: &RouteContext) -> f64 {
    let downstream = path.get(1..).unwrap_or_default();
    if downstream.is_empty() {
        return UTILIZATION_WEIGHT;
    }
    let total: f64 = downstream
        .iter()
        .map(|id| ctx.utilization.node(id))
        .sum();
    UTILIZATION_WEIGHT * (1.0 - total / downstream.len() as f64)
}

fn protocol_penalty(nodes: &[Option<&Node>], request: &SimulationRequest) -> f64 {
    let mismatch = nodes
        .iter()
        .flatten()
        .filter_map(|node| node.as_server())
        .any(|server| !server.supports(request.preferred_protocol));
    if mismatch {
        PROTOCOL_MISMATCH_PENALTY
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ArchitectureGraph;
    use crate::models::{
        CacheConfig, ClientConfig, DatabaseConfig, LoadBalancerConfig, NodeKind, Protocol,
        RetryPolicy, ServerConfig,
    };
    use crate::state::{ComponentUtilization, ProcessingData, RequestStatus};

    fn graph() -> ArchitectureGraph {
        ArchitectureGraph::new(
            vec![
                Node::new("client", NodeKind::Client(ClientConfig::default())),
                Node::new("lb", NodeKind::LoadBalancer(LoadBalancerConfig::default())),
                Node::new("lb2", NodeKind::LoadBalancer(LoadBalancerConfig::default())),
                Node::new("lb3", NodeKind::LoadBalancer(LoadBalancerConfig::default())),
                Node::new("api", NodeKind::Server(ServerConfig::default())),
                Node::new(
                    "grpc-api",
                    NodeKind::Server(ServerConfig {
                        supported_protocols: vec![Protocol::Grpc],
                        ..ServerConfig::default()
                    }),
                ),
                Node::new(
                    "worker",
                    NodeKind::Server(ServerConfig {
                        cpu_cores: 16,
                        ..ServerConfig::default()
                    }),
                ),
                Node::new("kv", NodeKind::Cache(CacheConfig::default())),
                Node::new("db", NodeKind::Database(DatabaseConfig::default())),
            ],
            Vec::new(),
        )
    }

    fn request(request_type: RequestType) -> SimulationRequest {
        SimulationRequest {
            id: 7,
            request_type,
            status: RequestStatus::Processing,
            source_node_id: "client".to_string(),
            current_node_id: "client".to_string(),
            previous_node_id: None,
            destination_node_id: "db".to_string(),
            path: vec!["client".to_string()],
            current_edge_id: None,
            size_kb: 10,
            created_at_ms: 0,
            completed_at_ms: None,
            failed_at_ms: None,
            failure_reason: None,
            preferred_protocol: Protocol::Http,
            retry_policy: RetryPolicy::Fixed,
            max_retries: 3,
            retry_on_error: true,
            cache_enabled: true,
            source_region: "us-east".to_string(),
            processing: ProcessingData::default(),
        }
    }

    fn score(path: &[&str], request_type: RequestType, utilization: &ComponentUtilization) -> f64 {
        let graph = graph();
        let ctx = RouteContext {
            graph: &graph,
            utilization,
        };
        let path: Vec<NodeId> = path.iter().map(|id| id.to_string()).collect();
        ArchitecturalScorer.score(&path, &request(request_type), &ctx)
    }

    #[test]
    fn layered_read_path_collects_bonuses() {
        let idle = ComponentUtilization::default();
        // 100 + 15 (lb first) + 10 (server before db) + 5 (lb window) + 20 (idle)
        assert_eq!(score(&["client", "lb", "api", "db"], RequestType::Read, &idle), 150.0);
        // 100 + 10 + 20
        assert_eq!(score(&["client", "api", "db"], RequestType::Read, &idle), 130.0);
    }

    #[test]
    fn cache_ahead_of_database_rewards_reads() {
        let idle = ComponentUtilization::default();
        // 100 + 15 (cache before db) + 10 (cache present) + 20
        assert_eq!(score(&["client", "kv", "db"], RequestType::Read, &idle), 145.0);
        // writes only get the database bonus
        assert_eq!(score(&["client", "kv", "db"], RequestType::Write, &idle), 130.0);
    }

    #[test]
    fn compute_counts_servers_and_cores() {
        let idle = ComponentUtilization::default();
        // 100 + 2*5 + 10 (16 cores) + 20
        assert_eq!(
            score(&["client", "api", "worker"], RequestType::Compute, &idle),
            140.0
        );
    }

    #[test]
    fn too_many_load_balancers_are_penalised() {
        let idle = ComponentUtilization::default();
        // 100 + 15 + 5 - 10 + 20
        assert_eq!(
            score(&["client", "lb", "lb2", "lb3", "db"], RequestType::Transaction, &idle),
            140.0
        );
    }

    #[test]
    fn busy_nodes_lower_the_score() {
        let mut busy = ComponentUtilization::default();
        busy.add_node("api", 0.5);
        busy.add_node("db", 0.5);
        // 100 + 10 + 20 * (1 - 0.5)
        assert_eq!(score(&["client", "api", "db"], RequestType::Read, &busy), 120.0);
    }

    #[test]
    fn protocol_mismatch_costs_fifty() {
        let idle = ComponentUtilization::default();
        assert_eq!(
            score(&["client", "grpc-api", "db"], RequestType::Read, &idle),
            80.0
        );
    }

    #[test]
    fn unknown_nodes_are_ignored_but_keep_positions() {
        let idle = ComponentUtilization::default();
        // lb sits at index 2, so only the window bonus applies
        assert_eq!(
            score(&["client", "ghost", "lb", "db"], RequestType::Transaction, &idle),
            135.0
        );
    }
}
