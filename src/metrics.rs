use std::collections::VecDeque;

use crate::state::{MetricDataPoint, SimulationRequest, SimulationState};

/// Merges a batch mean into a running mean weighted by sample counts.
/// An empty batch leaves the running mean unchanged.
pub fn weighted_average(old_avg: f64, old_count: u64, batch_avg: f64, batch_count: u64) -> f64 {
    if batch_count == 0 {
        return old_avg;
    }
    let total = old_count + batch_count;
    (old_avg * old_count as f64 + batch_avg * batch_count as f64) / total as f64
}

/// Appends `item`, dropping the oldest entries beyond `limit`.
pub fn push_bounded<T>(buffer: &mut VecDeque<T>, item: T, limit: usize) {
    buffer.push_back(item);
    while buffer.len() > limit {
        buffer.pop_front();
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u64), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Folds this tick's completions into the running response-time and size
/// averages. Must run before `completed_count` is bumped.
pub fn record_completions(state: &mut SimulationState, completed: &[SimulationRequest]) {
    let batch = completed.len() as u64;
    if batch == 0 {
        return;
    }

    if let Some(response) = mean(
        completed
            .iter()
            .filter_map(|request| request.response_time_ms())
            .map(|ms| ms as f64),
    ) {
        state.average_response_time_ms = weighted_average(
            state.average_response_time_ms,
            state.completed_count,
            response,
            batch,
        );
    }
    if let Some(size) = mean(completed.iter().map(|request| request.size_kb as f64)) {
        state.average_request_size_kb = weighted_average(
            state.average_request_size_kb,
            state.completed_count,
            size,
            batch,
        );
    }
}

pub fn snapshot(state: &SimulationState, generated: usize) -> MetricDataPoint {
    MetricDataPoint {
        timestamp_ms: state.elapsed_ms,
        active_requests: state.active_requests.len(),
        completed_count: state.completed_count,
        failed_count: state.failed_count,
        generated,
        average_response_time_ms: state.average_response_time_ms,
        average_request_size_kb: state.average_request_size_kb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_average_merges_batches() {
        assert_eq!(weighted_average(0.0, 0, 120.0, 3), 120.0);
        assert_eq!(weighted_average(100.0, 1, 200.0, 1), 150.0);
        assert_eq!(weighted_average(100.0, 3, 200.0, 1), 125.0);
        assert_eq!(weighted_average(42.0, 10, 999.0, 0), 42.0);
    }

    #[test]
    fn bounded_buffer_drops_oldest_first() {
        let mut buffer = VecDeque::new();
        for value in 0..5 {
            push_bounded(&mut buffer, value, 3);
        }
        assert_eq!(buffer, VecDeque::from(vec![2, 3, 4]));

        push_bounded(&mut buffer, 9, 0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(mean([1.0, 2.0, 6.0].into_iter()), Some(3.0));
    }
}
