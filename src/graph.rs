use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};
use crate::models::{Edge, Node, NodeKind, Scenario};

/// Point-in-time view of the architecture. Lookups and adjacency are indexed
/// once at construction; the engine treats the snapshot as read-only for the
/// duration of a tick.
#[derive(Clone, Debug, Default)]
pub struct ArchitectureGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<String, usize>,
    edge_index: HashMap<String, usize>,
    outgoing: HashMap<String, Vec<usize>>,
}

impl ArchitectureGraph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            node_index.entry(node.id.clone()).or_insert(idx);
        }

        let mut edge_index = HashMap::with_capacity(edges.len());
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, edge) in edges.iter().enumerate() {
            edge_index.entry(edge.id.clone()).or_insert(idx);
            outgoing.entry(edge.source.clone()).or_default().push(idx);
        }

        Self {
            nodes,
            edges,
            node_index,
            edge_index,
            outgoing,
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self::new(scenario.nodes.clone(), scenario.edges.clone())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|&idx| &self.edges[idx])
    }

    pub fn clients(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_client())
    }

    /// Outgoing edges of `id`, in declaration order.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(id)
            .into_iter()
            .flat_map(move |indices| indices.iter().map(move |&idx| &self.edges[idx]))
    }

    /// Target ids of the outgoing edges of `id`, in declaration order.
    pub fn neighbors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.outgoing(id).map(|edge| edge.target.as_str())
    }

    /// First edge declared from `source` to `target`.
    pub fn edge_between(&self, source: &str, target: &str) -> Option<&Edge> {
        self.outgoing(source).find(|edge| edge.target == target)
    }

    /// Breadth-first reachability over directed edges. The start node is only
    /// included when a cycle leads back to it. Results keep discovery order.
    pub fn reachable_from(&self, start: &str) -> Vec<&Node> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut reachable = Vec::new();

        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(current) {
                if !visited.insert(next) {
                    continue;
                }
                if let Some(node) = self.node(next) {
                    reachable.push(node);
                }
                queue.push_back(next);
            }
        }

        reachable
    }

    /// Rejects scenarios that would only ever produce failed requests or
    /// nonsensical rates. The engine itself tolerates inconsistent graphs.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::EmptyGraph);
        }

        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(Error::EmptyNodeId);
            }
            if !node_ids.insert(node.id.as_str()) {
                return Err(Error::DuplicateNodeId(node.id.clone()));
            }
            validate_node(node)?;
        }

        let mut edge_ids = HashSet::new();
        for edge in &self.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(Error::DuplicateEdgeId(edge.id.clone()));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint.as_str()) {
                    return Err(Error::DanglingEdge {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
            if edge.link.bandwidth_mbps <= 0.0 {
                return Err(Error::InvalidCapacity(edge.id.clone()));
            }
            if let Some(probability) = edge.link.failure_probability {
                check_probability(&format!("{}.failure_probability", edge.id), probability)?;
            }
        }

        Ok(())
    }
}

/// Shorter think times describe demand no tick can represent.
const MIN_THINK_TIME_MS: f64 = 1.0;

fn validate_node(node: &Node) -> Result<()> {
    let id = &node.id;
    let (capacity, failure_probability) = match &node.kind {
        NodeKind::Client(client) => {
            if client.think_time_ms.is_nan() || client.think_time_ms < MIN_THINK_TIME_MS {
                return Err(Error::InvalidThinkTime(id.clone()));
            }
            return Ok(());
        }
        NodeKind::Server(server) => (server.max_concurrent_requests, server.failure_probability),
        NodeKind::Database(db) => (db.max_connections, db.failure_probability),
        NodeKind::LoadBalancer(lb) => (lb.max_connections, lb.failure_probability),
        NodeKind::Cache(cache) => {
            check_probability(&format!("{}.expected_hit_rate", id), cache.expected_hit_rate)?;
            (cache.max_connections, cache.failure_probability)
        }
    };

    if capacity == 0 {
        return Err(Error::InvalidCapacity(id.clone()));
    }
    check_probability(&format!("{}.failure_probability", id), failure_probability)
}

pub(crate) fn check_probability(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::InvalidProbability {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}
