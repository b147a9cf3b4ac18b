use rand::{Rng, RngCore};
use std::cmp::Ordering;

use crate::graph::ArchitectureGraph;
use crate::models::{
    ClientConfig, DatabaseType, IsolationLevel, LoadBalancerType, Node, NodeId, NodeKind, Protocol,
    ServerType,
};
use crate::state::RequestType;

/// Only the best few candidates take part in the weighted pick.
const TOP_CANDIDATES: usize = 3;
const SCORE_JITTER: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Cache,
    Database,
    Server,
}

impl Target {
    fn matches(self, node: &Node) -> bool {
        match self {
            Target::Cache => node.is_cache(),
            Target::Database => node.is_database(),
            Target::Server => node.is_server(),
        }
    }
}

fn priorities(request_type: RequestType, cache_enabled: bool) -> Vec<Target> {
    match request_type {
        RequestType::Read if cache_enabled => {
            vec![Target::Cache, Target::Database, Target::Server]
        }
        RequestType::Read => vec![Target::Database, Target::Server],
        RequestType::Write | RequestType::Transaction => vec![Target::Database, Target::Server],
        RequestType::Compute => vec![Target::Server],
    }
}

/// Chooses where a new request from `client` should end up, or `None` when
/// nothing useful is reachable.
pub fn select_destination(
    graph: &ArchitectureGraph,
    client: &Node,
    request_type: RequestType,
    rng: &mut dyn RngCore,
) -> Option<NodeId> {
    let config = client.as_client()?;
    let reachable: Vec<&Node> = graph
        .reachable_from(&client.id)
        .into_iter()
        .filter(|node| node.id != client.id)
        .collect();
    if reachable.is_empty() {
        return None;
    }

    for target in priorities(request_type, config.cache_enabled) {
        let candidates = filter(&reachable, |node| target.matches(node));
        if let Some(node) = pick_candidate(&candidates, request_type, config, rng) {
            return Some(node.id.clone());
        }
    }

    let fallbacks: [fn(&Node) -> bool; 3] = [
        Node::is_load_balancer,
        |node: &Node| !node.is_client(),
        Node::is_client,
    ];
    for predicate in fallbacks {
        let candidates = filter(&reachable, predicate);
        if let Some(node) = pick_candidate(&candidates, request_type, config, rng) {
            return Some(node.id.clone());
        }
    }

    None
}

fn filter<'a>(nodes: &[&'a Node], predicate: impl Fn(&Node) -> bool) -> Vec<&'a Node> {
    nodes.iter().copied().filter(|node| predicate(node)).collect()
}

/// Keeps the top scorers and picks among them proportionally to score, so
/// traffic spreads across comparable nodes instead of piling onto the best.
fn pick_candidate<'a>(
    candidates: &[&'a Node],
    request_type: RequestType,
    client: &ClientConfig,
    rng: &mut dyn RngCore,
) -> Option<&'a Node> {
    match candidates {
        [] => return None,
        [only] => return Some(*only),
        _ => {}
    }

    let mut scored: Vec<(&Node, f64)> = candidates
        .iter()
        .map(|node| (*node, score_candidate(node, request_type, client, rng)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(TOP_CANDIDATES);

    let total: f64 = scored.iter().map(|(_, score)| score).sum();
    let mut target = rng.gen::<f64>() * total;
    for (node, score) in &scored {
        if target < *score {
            return Some(*node);
        }
        target -= score;
    }
    scored.last().map(|(node, _)| *node)
}

/// Desirability of `node` as the destination of a request from `client`.
/// Always positive.
pub fn score_candidate(
    node: &Node,
    request_type: RequestType,
    client: &ClientConfig,
    rng: &mut dyn RngCore,
) -> f64 {
    let base = match &node.kind {
        NodeKind::Server(server) => {
            let mut score = 50.0
                + server.cpu_cores as f64 * 2.0
                + (server.max_concurrent_requests as f64 / 10.0).min(30.0);
            if server.auto_scaling {
                score += 10.0;
            }
            if server.supports(client.preferred_protocol) {
                score += 15.0;
            }
            if request_type == RequestType::Compute
                && (server.cpu_cores >= 8 || server.server_type == ServerType::Compute)
            {
                score += 20.0;
            }
            score + reliability_score(server.failure_probability)
        }
        NodeKind::Database(db) => {
            let mut score = 50.0 + (db.max_connections as f64 / 10.0).min(30.0);
            match request_type {
                RequestType::Read => score += (db.read_replicas as f64 * 10.0).min(30.0),
                RequestType::Write | RequestType::Transaction => {
                    if db.database_type == DatabaseType::Relational {
                        score += 15.0;
                    }
                    if request_type == RequestType::Transaction
                        && db.isolation_level == IsolationLevel::Serializable
                    {
                        score += 10.0;
                    }
                }
                RequestType::Compute => {}
            }
            if db.replication {
                score += 5.0;
            }
            score + reliability_score(db.failure_probability)
        }
        NodeKind::Cache(cache) => {
            let mut score = 50.0
                + cache.expected_hit_rate * 30.0
                + (cache.capacity_mb / 1024.0 * 2.0).min(20.0);
            if request_type == RequestType::Read {
                score += 10.0;
            }
            score + reliability_score(cache.failure_probability)
        }
        NodeKind::LoadBalancer(lb) => {
            let mut score = 50.0 + (lb.max_connections as f64 / 100.0).min(30.0);
            if lb.health_checks {
                score += 10.0;
            }
            if lb.auto_scaling {
                score += 10.0;
            }
            let http_client = matches!(client.preferred_protocol, Protocol::Http | Protocol::Https);
            if http_client
                && matches!(
                    lb.lb_type,
                    LoadBalancerType::Application | LoadBalancerType::Gateway
                )
            {
                score += 5.0;
            }
            score + reliability_score(lb.failure_probability)
        }
        NodeKind::Client(_) => 10.0,
    };

    (base + rng.gen_range(0.0..SCORE_JITTER)).max(1.0)
}

fn reliability_score(failure_probability: f64) -> f64 {
    (1.0 - failure_probability).clamp(0.0, 1.0) * 20.0
}
