use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::events::RequestEvent;
use crate::generator::{generate_requests, GeneratorContext};
use crate::graph::{check_probability, ArchitectureGraph};
use crate::metrics::{push_bounded, record_completions, snapshot};
use crate::models::{Scenario, SimulationSettings};
use crate::processor::{process_request, ProcessContext};
use crate::routing::{ArchitecturalScorer, PathScorer};
use crate::state::{RequestId, RequestStatus, RunReport, SimulationRequest, SimulationState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineStatus {
    Idle,
    Running,
    Paused,
}

/// What one call to [`SimulationEngine::tick`] did.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub elapsed_ms: u64,
    pub generated: usize,
    pub completed: usize,
    pub failed: usize,
    pub events: Vec<RequestEvent>,
}

/// Owns the authoritative simulation state and drives
/// generation, processing and aggregation one tick at a time.
pub struct SimulationEngine {
    settings: SimulationSettings,
    state: SimulationState,
    rng: Box<dyn RngCore + Send>,
    scorer: Box<dyn PathScorer + Send>,
    status: EngineStatus,
    next_request_id: RequestId,
    seed: u64,
}

impl SimulationEngine {
    pub fn new(settings: SimulationSettings) -> Self {
        let seed = settings.seed.unwrap_or_else(rand::random);
        Self {
            settings,
            state: SimulationState::default(),
            rng: Box::new(StdRng::seed_from_u64(seed)),
            scorer: Box::new(ArchitecturalScorer),
            status: EngineStatus::Idle,
            next_request_id: 1,
            seed,
        }
    }

    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn PathScorer + Send>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn start(&mut self) {
        if self.status != EngineStatus::Running {
            info!(seed = self.seed, tick_ms = self.settings.tick_interval_ms, "simulation started");
            self.status = EngineStatus::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.status == EngineStatus::Running {
            info!(tick = self.state.tick, "simulation paused");
            self.status = EngineStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == EngineStatus::Paused {
            info!(tick = self.state.tick, "simulation resumed");
            self.status = EngineStatus::Running;
        }
    }

    /// Drops every in-flight request, all history and all utilization in one
    /// step and returns to `Idle`. The random source keeps its position.
    pub fn reset(&mut self) {
        info!(tick = self.state.tick, "simulation reset");
        self.state = SimulationState::default();
        self.next_request_id = 1;
        self.status = EngineStatus::Idle;
    }

    /// Advances simulated time by one interval against `graph`. Does nothing
    /// unless the engine is running.
    pub fn tick(&mut self, graph: &ArchitectureGraph) -> TickReport {
        if self.status != EngineStatus::Running {
            return TickReport {
                tick: self.state.tick,
                elapsed_ms: self.state.elapsed_ms,
                ..TickReport::default()
            };
        }

        let delta_ms = self.settings.tick_interval_ms;
        let elapsed_ms = self.state.elapsed_ms + delta_ms;
        let mut events = Vec::new();

        let mut generator = GeneratorContext {
            graph,
            settings: &self.settings,
            elapsed_ms,
            delta_ms,
            rng: &mut *self.rng,
        };
        let generated = generate_requests(&mut generator, &mut self.next_request_id);
        events.extend(generated.iter().map(|request| RequestEvent::Generated {
            request_id: request.id,
            request_type: request.request_type,
            source: request.source_node_id.clone(),
            destination: request.destination_node_id.clone(),
            size_kb: request.size_kb,
        }));
        let generated_count = generated.len();

        let mut requests = std::mem::take(&mut self.state.active_requests);
        requests.extend(generated);

        // Requests see each other's changes in list order; the snapshot is
        // only published once the whole batch has been folded in.
        let mut utilization = self.state.utilization.clone();
        let mut ctx = ProcessContext {
            graph,
            settings: &self.settings,
            utilization: &mut utilization,
            scorer: &*self.scorer,
            rng: &mut *self.rng,
            now_ms: elapsed_ms,
        };
        for request in requests.iter_mut() {
            if let Some(event) = process_request(request, &mut ctx) {
                events.push(event);
            }
        }

        let (finished, active): (Vec<SimulationRequest>, Vec<SimulationRequest>) =
            requests.into_iter().partition(SimulationRequest::is_terminal);
        let (completed, failed): (Vec<SimulationRequest>, Vec<SimulationRequest>) = finished
            .into_iter()
            .partition(|request| request.status == RequestStatus::Completed);

        let state = &mut self.state;
        record_completions(state, &completed);
        state.completed_count += completed.len() as u64;
        state.failed_count += failed.len() as u64;
        state.generated_count += generated_count as u64;
        for reason in failed.iter().filter_map(|request| request.failure_reason) {
            *state.failure_breakdown.entry(reason).or_insert(0) += 1;
        }

        let report = TickReport {
            tick: state.tick + 1,
            elapsed_ms,
            generated: generated_count,
            completed: completed.len(),
            failed: failed.len(),
            events,
        };

        let history = self.settings.max_history_length;
        for request in completed {
            push_bounded(&mut state.completed_requests, request, history);
        }
        for request in failed {
            push_bounded(&mut state.failed_requests, request, history);
        }

        state.active_requests = active;
        state.utilization = utilization;
        state.tick += 1;
        state.elapsed_ms = elapsed_ms;

        let point = snapshot(state, generated_count);
        push_bounded(&mut state.metrics_history, point, self.settings.max_metric_history);

        debug!(
            tick = state.tick,
            elapsed_ms,
            generated = report.generated,
            completed = report.completed,
            failed = report.failed,
            active = state.active_requests.len(),
            "tick complete"
        );
        report
    }

    /// Runs `ticks` ticks back to back, starting the engine if needed.
    pub fn run_ticks(&mut self, graph: &ArchitectureGraph, ticks: u64) -> Result<()> {
        if ticks == 0 {
            return Err(Error::TicksZero);
        }
        self.start();
        for _ in 0..ticks {
            self.tick(graph);
        }
        info!(
            ticks = self.state.tick,
            generated = self.state.generated_count,
            completed = self.state.completed_count,
            failed = self.state.failed_count,
            avg_response_ms = self.state.average_response_time_ms,
            "run finished"
        );
        Ok(())
    }

    pub fn report(&self) -> RunReport {
        let state = &self.state;
        RunReport {
            seed: self.seed,
            ticks: state.tick,
            tick_interval_ms: self.settings.tick_interval_ms,
            elapsed_ms: state.elapsed_ms,
            generated_count: state.generated_count,
            completed_count: state.completed_count,
            failed_count: state.failed_count,
            active_count: state.active_requests.len(),
            average_response_time_ms: state.average_response_time_ms,
            average_request_size_kb: state.average_request_size_kb,
            failure_breakdown: state.failure_breakdown.clone(),
            utilization: state.utilization.clone(),
            metrics: state.metrics_history.iter().cloned().collect(),
        }
    }
}

/// Handle for callers on several threads. Ticks are serialized by the lock.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<SimulationEngine>>,
}

impl SharedEngine {
    pub fn new(engine: SimulationEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn tick(&self, graph: &ArchitectureGraph) -> TickReport {
        self.lock().tick(graph)
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut SimulationEngine) -> R) -> R {
        f(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, SimulationEngine> {
        // Engine state stays consistent between ticks, so a panicked holder
        // leaves nothing half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn run_scenario(scenario: &Scenario, ticks: u64) -> Result<RunReport> {
    validate_settings(&scenario.simulation)?;
    let graph = ArchitectureGraph::from_scenario(scenario);
    graph.validate()?;

    let mut engine = SimulationEngine::new(scenario.simulation.clone());
    engine.run_ticks(&graph, ticks)?;
    Ok(engine.report())
}

pub fn validate_settings(settings: &SimulationSettings) -> Result<()> {
    if settings.tick_interval_ms == 0 {
        return Err(Error::InvalidTickInterval);
    }

    let mix = &settings.request_mix;
    for (field, value) in [
        ("request_mix.read", mix.read),
        ("request_mix.write", mix.write),
        ("request_mix.compute", mix.compute),
        ("node_overload_failure_chance", settings.node_overload_failure_chance),
        ("retry_chance", settings.retry_chance),
        (
            "network_congestion_failure_chance",
            settings.network_congestion_failure_chance,
        ),
        ("edge_overload_threshold", settings.edge_overload_threshold),
    ] {
        check_probability(field, value)?;
    }
    let total = mix.read + mix.write + mix.compute;
    if total > 1.0 + 1e-9 {
        return Err(Error::InvalidRequestMix(total));
    }

    if settings.base_request_size_kb <= 0.0 || settings.max_node_impact <= 0.0 {
        return Err(Error::InvalidCapacity("simulation".to_string()));
    }
    Ok(())
}
