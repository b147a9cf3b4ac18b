use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::models::{EdgeId, NodeId, Protocol, RetryPolicy};

pub type RequestId = u64;

/// Utilization entries below this are treated as fully released.
const UTILIZATION_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    Read,
    Write,
    Compute,
    Transaction,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestType::Read => "read",
            RequestType::Write => "write",
            RequestType::Compute => "compute",
            RequestType::Transaction => "transaction",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    Timeout,
    RetriesExhausted,
    CurrentNodeNotFound,
    NodeOverload,
    RandomNodeFailure,
    NextNodeNotFound,
    NextEdgeNotFound,
    NetworkCongestion,
    EdgeFailure,
}

impl FailureReason {
    pub const ALL: [FailureReason; 9] = [
        FailureReason::Timeout,
        FailureReason::RetriesExhausted,
        FailureReason::CurrentNodeNotFound,
        FailureReason::NodeOverload,
        FailureReason::RandomNodeFailure,
        FailureReason::NextNodeNotFound,
        FailureReason::NextEdgeNotFound,
        FailureReason::NetworkCongestion,
        FailureReason::EdgeFailure,
    ];

    pub fn message(self) -> &'static str {
        match self {
            FailureReason::Timeout => "Timeout",
            FailureReason::RetriesExhausted => "Exceeded maximum retry attempts",
            FailureReason::CurrentNodeNotFound => "Current node not found",
            FailureReason::NodeOverload => "Node overload",
            FailureReason::RandomNodeFailure => "Random node failure",
            FailureReason::NextNodeNotFound => "Next node not found",
            FailureReason::NextEdgeNotFound => "Next edge not found",
            FailureReason::NetworkCongestion => "Network congestion",
            FailureReason::EdgeFailure => "Edge Failure Probability",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Per-request bookkeeping the processor needs across ticks.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProcessingData {
    pub retry_count: u32,
    pub processing_time_ms: f64,
    pub required_processing_time_ms: f64,
    /// Utilization this request added to each node it currently occupies.
    pub node_contributions: BTreeMap<NodeId, f64>,
    /// Utilization this request added to each edge not yet released.
    pub edge_contributions: BTreeMap<EdgeId, f64>,
    pub total_processing_time_ms: f64,
    pub edge_pending_decrement: Option<EdgeId>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SimulationRequest {
    pub id: RequestId,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub source_node_id: NodeId,
    pub current_node_id: NodeId,
    pub previous_node_id: Option<NodeId>,
    pub destination_node_id: NodeId,
    pub path: Vec<NodeId>,
    pub current_edge_id: Option<EdgeId>,
    pub size_kb: u32,
    pub created_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub failed_at_ms: Option<u64>,
    pub failure_reason: Option<FailureReason>,
    pub preferred_protocol: Protocol,
    pub retry_policy: RetryPolicy,
    pub max_retries: u32,
    pub retry_on_error: bool,
    pub cache_enabled: bool,
    pub source_region: String,
    pub processing: ProcessingData,
}

impl SimulationRequest {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall time from creation to completion or failure.
    pub fn response_time_ms(&self) -> Option<u64> {
        self.completed_at_ms
            .or(self.failed_at_ms)
            .map(|end| end.saturating_sub(self.created_at_ms))
    }
}

/// Saturating per-component load. Callers must release exactly the value
/// returned by the matching `add_*` call.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct ComponentUtilization {
    pub nodes: BTreeMap<NodeId, f64>,
    pub edges: BTreeMap<EdgeId, f64>,
}

impl ComponentUtilization {
    pub fn node(&self, id: &str) -> f64 {
        self.nodes.get(id).copied().unwrap_or(0.0)
    }

    pub fn edge(&self, id: &str) -> f64 {
        self.edges.get(id).copied().unwrap_or(0.0)
    }

    /// Adds up to `amount`, returning the delta actually applied after clamping.
    pub fn add_node(&mut self, id: &str, amount: f64) -> f64 {
        saturating_add(&mut self.nodes, id, amount)
    }

    pub fn add_edge(&mut self, id: &str, amount: f64) -> f64 {
        saturating_add(&mut self.edges, id, amount)
    }

    pub fn release_node(&mut self, id: &str, amount: f64) {
        saturating_sub(&mut self.nodes, id, amount);
    }

    pub fn release_edge(&mut self, id: &str, amount: f64) {
        saturating_sub(&mut self.edges, id, amount);
    }

    pub fn is_idle(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn is_bounded(&self) -> bool {
        self.nodes
            .values()
            .chain(self.edges.values())
            .all(|value| (0.0..=1.0).contains(value))
    }
}

fn saturating_add(map: &mut BTreeMap<String, f64>, id: &str, amount: f64) -> f64 {
    let amount = amount.max(0.0);
    let current = map.get(id).copied().unwrap_or(0.0);
    let next = (current + amount).min(1.0);
    let applied = next - current;
    if applied > 0.0 {
        map.insert(id.to_string(), next);
    }
    applied
}

fn saturating_sub(map: &mut BTreeMap<String, f64>, id: &str, amount: f64) {
    let Some(current) = map.get_mut(id) else {
        return;
    };
    *current = (*current - amount.max(0.0)).max(0.0);
    if *current <= UTILIZATION_EPSILON {
        map.remove(id);
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MetricDataPoint {
    pub timestamp_ms: u64,
    pub active_requests: usize,
    pub completed_count: u64,
    pub failed_count: u64,
    pub generated: usize,
    pub average_response_time_ms: f64,
    pub average_request_size_kb: f64,
}

/// Authoritative engine state after a tick.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SimulationState {
    pub tick: u64,
    pub elapsed_ms: u64,
    pub active_requests: Vec<SimulationRequest>,
    pub completed_requests: VecDeque<SimulationRequest>,
    pub failed_requests: VecDeque<SimulationRequest>,
    pub completed_count: u64,
    pub failed_count: u64,
    pub generated_count: u64,
    pub average_response_time_ms: f64,
    pub average_request_size_kb: f64,
    pub utilization: ComponentUtilization,
    pub metrics_history: VecDeque<MetricDataPoint>,
    pub failure_breakdown: BTreeMap<FailureReason, u64>,
}

/// Outcome of a batch run, as handed to the output formatters.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub ticks: u64,
    pub tick_interval_ms: u64,
    pub elapsed_ms: u64,
    pub generated_count: u64,
    pub completed_count: u64,
    pub failed_count: u64,
    pub active_count: usize,
    pub average_response_time_ms: f64,
    pub average_request_size_kb: f64,
    pub failure_breakdown: BTreeMap<FailureReason, u64>,
    pub utilization: ComponentUtilization,
    pub metrics: Vec<MetricDataPoint>,
}
