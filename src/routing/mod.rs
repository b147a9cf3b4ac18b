mod scoring;

use std::collections::HashSet;
use tracing::trace;

use crate::graph::ArchitectureGraph;
use crate::models::{Node, NodeId};
use crate::state::{ComponentUtilization, SimulationRequest};

pub use scoring::ArchitecturalScorer;

/// Ranks candidate paths for a request. Higher is better.
pub trait PathScorer {
    fn score(&self, path: &[NodeId], request: &SimulationRequest, ctx: &RouteContext) -> f64;
}

/// Graph snapshot and utilization as seen by the router.
pub struct RouteContext<'g, 'u> {
    pub graph: &'g ArchitectureGraph,
    pub utilization: &'u ComponentUtilization,
}

/// Every cycle-free path from `from` to `to`, following edges in declaration
/// order.
pub fn find_all_paths<'a>(graph: &'a ArchitectureGraph, from: &'a str, to: &str) -> Vec<Vec<NodeId>> {
    let mut paths = Vec::new();
    let mut path = vec![from];
    let mut visited: HashSet<&str> = HashSet::from([from]);
    walk(graph, from, to, &mut path, &mut visited, &mut paths);
    paths
}

fn walk<'a>(
    graph: &'a ArchitectureGraph,
    current: &'a str,
    target: &str,
    path: &mut Vec<&'a str>,
    visited: &mut HashSet<&'a str>,
    paths: &mut Vec<Vec<NodeId>>,
) {
    if current == target {
        paths.push(path.iter().map(|id| id.to_string()).collect());
        return;
    }

    for next in graph.neighbors(current) {
        if !visited.insert(next) {
            continue;
        }
        path.push(next);
        walk(graph, next, target, path, visited, paths);
        path.pop();
        visited.remove(next);
    }
}

/// Next hop for a request that has finished work at its current node.
///
/// Returns `None` when the request is already at its destination, when no
/// path exists, or when the chosen hop does not resolve to a node.
pub fn determine_next_node<'g>(
    request: &SimulationRequest,
    ctx: &RouteContext<'g, '_>,
    scorer: &dyn PathScorer,
) -> Option<&'g Node> {
    if request.current_node_id == request.destination_node_id {
        return None;
    }

    let paths = find_all_paths(
        ctx.graph,
        &request.current_node_id,
        &request.destination_node_id,
    );

    let mut best: Option<(&[NodeId], f64)> = None;
    for path in &paths {
        let score = scorer.score(path, request, ctx);
        trace!(request_id = request.id, ?path, score, "scored path");
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((path.as_slice(), score)),
        }
    }

    let (path, _) = best?;
    let next = path.get(1)?;
    ctx.graph.node(next)
}
