//! Per-tick request generation from client nodes.

mod destination;
mod sizing;

use rand::{Rng, RngCore};
use std::f64::consts::PI;
use tracing::debug;

use crate::graph::ArchitectureGraph;
use crate::models::{ClientConfig, Node, RequestMix, RequestPattern, SimulationSettings};
use crate::state::{ProcessingData, RequestId, RequestStatus, RequestType, SimulationRequest};

pub use destination::{score_candidate, select_destination};
pub use sizing::{
    client_size_multiplier, destination_size_multiplier, estimate_request_size,
    initial_processing_time, type_size_multiplier,
};

/// Absorbs float noise so an expected count of exactly 1.0 is not rounded to 2.
const DEMAND_EPSILON: f64 = 1e-9;

pub struct GeneratorContext<'a> {
    pub graph: &'a ArchitectureGraph,
    pub settings: &'a SimulationSettings,
    pub elapsed_ms: u64,
    pub delta_ms: u64,
    pub rng: &'a mut dyn RngCore,
}

pub fn calculate_requests_per_second(concurrent_users: u32, think_time_ms: f64) -> f64 {
    if think_time_ms <= 0.0 {
        return 0.0;
    }
    concurrent_users as f64 * (1000.0 / think_time_ms)
}

pub fn pattern_multiplier(client: &ClientConfig, elapsed_ms: u64, rng: &mut dyn RngCore) -> f64 {
    match client.request_pattern {
        RequestPattern::Steady => 1.0,
        RequestPattern::Bursty => {
            let period = client.burst_period_ms.max(1);
            if elapsed_ms % period < client.burst_duration_ms {
                client.burst_multiplier
            } else {
                1.0
            }
        }
        RequestPattern::Periodic => {
            let period = client.periodic_period_ms.max(1) as f64;
            let phase = 2.0 * PI * elapsed_ms as f64 / period;
            (1.0 + client.periodic_amplitude * phase.sin()).max(0.0)
        }
        RequestPattern::Random => rng.gen_range(0.5..=1.5),
    }
}

/// Number of requests a client emits this tick. Any positive demand yields
/// at least one request.
pub fn requests_for_tick(
    client: &ClientConfig,
    elapsed_ms: u64,
    delta_ms: u64,
    rng: &mut dyn RngCore,
) -> u32 {
    let rps = calculate_requests_per_second(client.concurrent_users, client.think_time_ms);
    let expected = rps * (delta_ms as f64 / 1000.0) * pattern_multiplier(client, elapsed_ms, rng);
    if expected <= 0.0 {
        return 0;
    }
    (expected - DEMAND_EPSILON).ceil().max(1.0) as u32
}

pub fn classify_request(mix: &RequestMix, rng: &mut dyn RngCore) -> RequestType {
    let draw = rng.gen::<f64>();
    let write_threshold = mix.read + mix.write;
    let compute_threshold = write_threshold + mix.compute;
    if draw < mix.read {
        RequestType::Read
    } else if draw < write_threshold {
        RequestType::Write
    } else if draw < compute_threshold {
        RequestType::Compute
    } else {
        RequestType::Transaction
    }
}

/// Produces this tick's new requests, one batch per client in graph order.
/// Requests without a reachable destination are dropped.
pub fn generate_requests(
    ctx: &mut GeneratorContext,
    next_id: &mut RequestId,
) -> Vec<SimulationRequest> {
    let mut requests = Vec::new();

    for client_node in ctx.graph.clients() {
        let Some(client) = client_node.as_client() else {
            continue;
        };
        let demand = requests_for_tick(client, ctx.elapsed_ms, ctx.delta_ms, ctx.rng);
        let count = demand.min(ctx.settings.max_requests_per_tick);
        if count < demand {
            debug!(client = %client_node.id, demand, count, "request batch capped");
        }

        for _ in 0..count {
            let request_type = classify_request(&ctx.settings.request_mix, ctx.rng);
            let Some(destination) =
                select_destination(ctx.graph, client_node, request_type, ctx.rng)
            else {
                debug!(client = %client_node.id, %request_type, "no reachable destination, request dropped");
                continue;
            };
            let Some(destination_node) = ctx.graph.node(&destination) else {
                continue;
            };

            let request = build_request(
                *next_id,
                client_node,
                client,
                destination_node,
                request_type,
                ctx,
            );
            *next_id += 1;
            requests.push(request);
        }
    }

    requests
}

fn build_request(
    id: RequestId,
    client_node: &Node,
    client: &ClientConfig,
    destination: &Node,
    request_type: RequestType,
    ctx: &mut GeneratorContext,
) -> SimulationRequest {
    let size_kb = estimate_request_size(
        ctx.settings.base_request_size_kb,
        request_type,
        client,
        destination,
        ctx.rng,
    );

    SimulationRequest {
        id,
        request_type,
        status: RequestStatus::Pending,
        source_node_id: client_node.id.clone(),
        current_node_id: client_node.id.clone(),
        previous_node_id: None,
        destination_node_id: destination.id.clone(),
        path: vec![client_node.id.clone()],
        current_edge_id: None,
        size_kb,
        created_at_ms: ctx.elapsed_ms,
        completed_at_ms: None,
        failed_at_ms: None,
        failure_reason: None,
        preferred_protocol: client.preferred_protocol,
        retry_policy: client.retry_policy,
        max_retries: client.max_retries,
        retry_on_error: client.retry_on_error,
        cache_enabled: client.cache_enabled,
        source_region: client.region.clone(),
        processing: ProcessingData {
            required_processing_time_ms: initial_processing_time(client),
            ..ProcessingData::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Edge, EdgeKind, NodeKind, ServerConfig};
    use crate::random::FixedRng;

    fn client_with(users: u32, think_time_ms: f64, pattern: RequestPattern) -> ClientConfig {
        ClientConfig {
            concurrent_users: users,
            think_time_ms,
            request_pattern: pattern,
            ..ClientConfig::default()
        }
    }

    #[test]
    fn requests_per_second_matches_think_time() {
        assert_eq!(calculate_requests_per_second(100, 1000.0), 100.0);
        assert_eq!(calculate_requests_per_second(100, 500.0), 200.0);
        assert_eq!(calculate_requests_per_second(100, 1.0), 100_000.0);
        assert_eq!(calculate_requests_per_second(100, 0.0), 0.0);
    }

    #[test]
    fn steady_client_emits_exactly_expected_count() {
        let client = client_with(10, 1000.0, RequestPattern::Steady);
        let mut rng = FixedRng::low();
        assert_eq!(requests_for_tick(&client, 100, 100, &mut rng), 1);
        assert_eq!(requests_for_tick(&client, 100, 1000, &mut rng), 10);
    }

    #[test]
    fn fractional_demand_rounds_up() {
        let client = client_with(1, 1000.0, RequestPattern::Steady);
        let mut rng = FixedRng::low();
        assert_eq!(requests_for_tick(&client, 100, 100, &mut rng), 1);
        let idle = client_with(0, 1000.0, RequestPattern::Steady);
        assert_eq!(requests_for_tick(&idle, 100, 100, &mut rng), 0);
    }

    #[test]
    fn bursty_pattern_multiplies_inside_window() {
        let client = client_with(10, 1000.0, RequestPattern::Bursty);
        let mut rng = FixedRng::low();
        assert_eq!(pattern_multiplier(&client, 500, &mut rng), 3.0);
        assert_eq!(pattern_multiplier(&client, 2_500, &mut rng), 1.0);
        assert_eq!(pattern_multiplier(&client, 5_200, &mut rng), 3.0);
    }

    #[test]
    fn periodic_pattern_follows_sine() {
        let client = client_with(10, 1000.0, RequestPattern::Periodic);
        let mut rng = FixedRng::low();
        assert!((pattern_multiplier(&client, 0, &mut rng) - 1.0).abs() < 1e-9);
        assert!((pattern_multiplier(&client, 2_500, &mut rng) - 1.5).abs() < 1e-9);
        assert!((pattern_multiplier(&client, 7_500, &mut rng) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn random_pattern_stays_in_range() {
        let client = client_with(10, 1000.0, RequestPattern::Random);
        assert_eq!(pattern_multiplier(&client, 0, &mut FixedRng::low()), 0.5);
        let high = pattern_multiplier(&client, 0, &mut FixedRng::high());
        assert!(high > 1.49 && high <= 1.5);
    }

    #[test]
    fn classification_uses_fixed_thresholds() {
        let mix = RequestMix::default();
        assert_eq!(classify_request(&mix, &mut FixedRng::low()), RequestType::Read);
        assert_eq!(
            classify_request(&mix, &mut FixedRng::high()),
            RequestType::Transaction
        );
        // 0.5 falls in the write band [0.40, 0.70)
        assert_eq!(
            classify_request(&mix, &mut FixedRng(1u64 << 63)),
            RequestType::Write
        );
    }

    #[test]
    fn generated_requests_start_at_client() {
        let graph = ArchitectureGraph::new(
            vec![
                Node::new(
                    "client",
                    NodeKind::Client(client_with(10, 1000.0, RequestPattern::Steady)),
                ),
                Node::new("api", NodeKind::Server(ServerConfig::default())),
            ],
            vec![Edge::new("e1", "client", "api", EdgeKind::http())],
        );
        let settings = SimulationSettings::default();
        let mut rng = FixedRng::low();
        let mut ctx = GeneratorContext {
            graph: &graph,
            settings: &settings,
            elapsed_ms: 100,
            delta_ms: 100,
            rng: &mut rng,
        };
        let mut next_id = 1;

        let requests = generate_requests(&mut ctx, &mut next_id);
        assert_eq!(requests.len(), 1);
        assert_eq!(next_id, 2);

        let request = &requests[0];
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.current_node_id, "client");
        assert_eq!(request.destination_node_id, "api");
        assert_eq!(request.path, vec!["client".to_string()]);
        assert_eq!(request.created_at_ms, 100);
        assert_eq!(request.processing.required_processing_time_ms, 20.0);
    }

    #[test]
    fn batch_size_is_capped_per_client() {
        let graph = ArchitectureGraph::new(
            vec![
                Node::new(
                    "client",
                    NodeKind::Client(client_with(10, 1.0, RequestPattern::Steady)),
                ),
                Node::new("api", NodeKind::Server(ServerConfig::default())),
            ],
            vec![Edge::new("e1", "client", "api", EdgeKind::http())],
        );
        let mut rng = FixedRng::low();
        let client = client_with(10, 1.0, RequestPattern::Steady);
        assert_eq!(requests_for_tick(&client, 100, 100, &mut rng), 1_000);

        let settings = SimulationSettings {
            max_requests_per_tick: 25,
            ..SimulationSettings::default()
        };
        let mut ctx = GeneratorContext {
            graph: &graph,
            settings: &settings,
            elapsed_ms: 100,
            delta_ms: 100,
            rng: &mut rng,
        };
        let mut next_id = 1;
        assert_eq!(generate_requests(&mut ctx, &mut next_id).len(), 25);
        assert_eq!(next_id, 26);
    }

    #[test]
    fn unreachable_clients_generate_nothing() {
        let graph = ArchitectureGraph::new(
            vec![Node::new(
                "client",
                NodeKind::Client(ClientConfig::default()),
            )],
            Vec::new(),
        );
        let settings = SimulationSettings::default();
        let mut rng = FixedRng::low();
        let mut ctx = GeneratorContext {
            graph: &graph,
            settings: &settings,
            elapsed_ms: 100,
            delta_ms: 100,
            rng: &mut rng,
        };
        let mut next_id = 1;
        assert!(generate_requests(&mut ctx, &mut next_id).is_empty());
        assert_eq!(next_id, 1);
    }
}
