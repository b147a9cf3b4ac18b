//! Per-tick request state machine.
//!
//! Every utilization increment a request makes is stored on the request and
//! released verbatim when the request moves on or terminates.

mod failure;
mod impact;
mod latency;

use rand::RngCore;
use tracing::debug;

use crate::events::RequestEvent;
use crate::graph::ArchitectureGraph;
use crate::models::{Node, SimulationSettings};
use crate::random::roll;
use crate::routing::{determine_next_node, PathScorer, RouteContext};
use crate::state::{ComponentUtilization, FailureReason, RequestStatus, SimulationRequest};

pub use failure::{ambient_failure_probability, overload_threshold};
pub use impact::{edge_impact, node_impact};
pub use latency::required_processing_time;

pub struct ProcessContext<'a> {
    pub graph: &'a ArchitectureGraph,
    pub settings: &'a SimulationSettings,
    /// The tick's working copy; the processor is its only writer.
    pub utilization: &'a mut ComponentUtilization,
    pub scorer: &'a dyn PathScorer,
    pub rng: &'a mut dyn RngCore,
    pub now_ms: u64,
}

/// Advances `request` by one tick. Returns the lifecycle event the step
/// produced, if any. Terminal requests are left untouched.
pub fn process_request(
    request: &mut SimulationRequest,
    ctx: &mut ProcessContext,
) -> Option<RequestEvent> {
    if request.is_terminal() {
        return None;
    }

    if let Some(edge_id) = request.processing.edge_pending_decrement.take() {
        release_edge(request, &edge_id, ctx.utilization);
    }

    let age = ctx.now_ms.saturating_sub(request.created_at_ms);
    if age > ctx.settings.max_request_lifetime_ms {
        return Some(fail(request, FailureReason::Timeout, ctx));
    }

    if request.processing.retry_count > request.max_retries {
        return Some(fail(request, FailureReason::RetriesExhausted, ctx));
    }

    let graph = ctx.graph;
    let Some(node) = graph.node(&request.current_node_id) else {
        return Some(fail(request, FailureReason::CurrentNodeNotFound, ctx));
    };

    if request.status == RequestStatus::Pending {
        request.status = RequestStatus::Processing;
    }

    if request.processing.processing_time_ms < request.processing.required_processing_time_ms {
        return accrue(request, node, ctx);
    }

    advance(request, node, ctx)
}

/// Spends one tick at `node`, or half a tick if the node is overloaded.
fn accrue(
    request: &mut SimulationRequest,
    node: &Node,
    ctx: &mut ProcessContext,
) -> Option<RequestEvent> {
    if !request.processing.node_contributions.contains_key(&node.id) {
        let impact = node_impact(node, request, ctx.settings.max_node_impact);
        let applied = ctx.utilization.add_node(&node.id, impact);
        request
            .processing
            .node_contributions
            .insert(node.id.clone(), applied);
    }

    let tick_ms = ctx.settings.tick_interval_ms as f64;
    let load = ctx.utilization.node(&node.id);
    let step = if load > overload_threshold(node, request.request_type) {
        if roll(ctx.rng, ctx.settings.node_overload_failure_chance) {
            return Some(fail(request, FailureReason::NodeOverload, ctx));
        }
        tick_ms / 2.0
    } else {
        let probability =
            ambient_failure_probability(node, request.request_type, ctx.settings.tick_interval_ms);
        if roll(ctx.rng, probability) {
            return Some(fail(request, FailureReason::RandomNodeFailure, ctx));
        }
        tick_ms
    };

    request.processing.processing_time_ms += step;
    request.processing.total_processing_time_ms += step;
    None
}

/// Work at `node` is done: complete, retry in place, or hop onwards.
fn advance(
    request: &mut SimulationRequest,
    node: &Node,
    ctx: &mut ProcessContext,
) -> Option<RequestEvent> {
    if request.current_node_id == request.destination_node_id {
        return Some(complete(request, ctx));
    }

    if request.retry_on_error && roll(ctx.rng, ctx.settings.retry_chance) {
        return Some(retry(request));
    }

    let route = RouteContext {
        graph: ctx.graph,
        utilization: ctx.utilization,
    };
    let Some(next) = determine_next_node(request, &route, ctx.scorer) else {
        return Some(retry_or_fail(request, FailureReason::NextNodeNotFound, ctx));
    };
    let Some(edge) = ctx.graph.edge_between(&node.id, &next.id) else {
        return Some(retry_or_fail(request, FailureReason::NextEdgeNotFound, ctx));
    };

    release_node(request, &node.id, ctx.utilization);
    let applied = ctx.utilization.add_edge(&edge.id, edge_impact(edge, request));
    *request
        .processing
        .edge_contributions
        .entry(edge.id.clone())
        .or_insert(0.0) += applied;

    let congested = ctx.utilization.edge(&edge.id) > ctx.settings.edge_overload_threshold;
    if congested && roll(ctx.rng, ctx.settings.network_congestion_failure_chance) {
        return Some(fail(request, FailureReason::NetworkCongestion, ctx));
    }
    if roll(ctx.rng, edge.link.failure_probability.unwrap_or(0.0)) {
        return Some(fail(request, FailureReason::EdgeFailure, ctx));
    }

    let mut required = required_processing_time(next, Some(node), request.request_type, ctx.rng);
    if congested {
        required += ctx.settings.edge_overload_penalty_ms;
    }

    let from = std::mem::replace(&mut request.current_node_id, next.id.clone());
    request.previous_node_id = Some(from.clone());
    request.path.push(next.id.clone());
    request.current_edge_id = Some(edge.id.clone());
    request.processing.processing_time_ms = 0.0;
    request.processing.required_processing_time_ms = required;
    request.processing.edge_pending_decrement = Some(edge.id.clone());

    debug!(
        request_id = request.id,
        from = %from,
        to = %next.id,
        edge = %edge.id,
        congested,
        required_ms = required,
        "request hopped"
    );
    Some(RequestEvent::Hopped {
        request_id: request.id,
        from,
        to: next.id.clone(),
        edge: edge.id.clone(),
    })
}

fn complete(request: &mut SimulationRequest, ctx: &mut ProcessContext) -> RequestEvent {
    let node_id = request.current_node_id.clone();
    release_node(request, &node_id, ctx.utilization);
    request.status = RequestStatus::Completed;
    request.completed_at_ms = Some(ctx.now_ms);

    let response_time_ms = request.response_time_ms().unwrap_or_default();
    debug!(request_id = request.id, node = %node_id, response_time_ms, "request completed");
    RequestEvent::Completed {
        request_id: request.id,
        node: node_id,
        response_time_ms,
    }
}

fn retry(request: &mut SimulationRequest) -> RequestEvent {
    request.processing.retry_count += 1;
    debug!(
        request_id = request.id,
        node = %request.current_node_id,
        retry_count = request.processing.retry_count,
        "request retried"
    );
    RequestEvent::Retried {
        request_id: request.id,
        node: request.current_node_id.clone(),
        retry_count: request.processing.retry_count,
    }
}

fn retry_or_fail(
    request: &mut SimulationRequest,
    reason: FailureReason,
    ctx: &mut ProcessContext,
) -> RequestEvent {
    if request.retry_on_error {
        retry(request)
    } else {
        fail(request, reason, ctx)
    }
}

fn fail(
    request: &mut SimulationRequest,
    reason: FailureReason,
    ctx: &mut ProcessContext,
) -> RequestEvent {
    release_all(request, ctx.utilization);
    request.status = RequestStatus::Failed;
    request.failed_at_ms = Some(ctx.now_ms);
    request.failure_reason = Some(reason);

    debug!(request_id = request.id, node = %request.current_node_id, %reason, "request failed");
    RequestEvent::Failed {
        request_id: request.id,
        node: request.current_node_id.clone(),
        reason,
    }
}

fn release_node(request: &mut SimulationRequest, id: &str, utilization: &mut ComponentUtilization) {
    if let Some(amount) = request.processing.node_contributions.remove(id) {
        utilization.release_node(id, amount);
    }
}

fn release_edge(request: &mut SimulationRequest, id: &str, utilization: &mut ComponentUtilization) {
    if let Some(amount) = request.processing.edge_contributions.remove(id) {
        utilization.release_edge(id, amount);
    }
}

fn release_all(request: &mut SimulationRequest, utilization: &mut ComponentUtilization) {
    for (id, amount) in std::mem::take(&mut request.processing.node_contributions) {
        utilization.release_node(&id, amount);
    }
    for (id, amount) in std::mem::take(&mut request.processing.edge_contributions) {
        utilization.release_edge(&id, amount);
    }
    request.processing.edge_pending_decrement = None;
}
