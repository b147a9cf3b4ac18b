use std::fmt::Write;

use crate::models::Scenario;
use crate::state::RunReport;

pub trait Formatter {
    fn write(&self, report: &RunReport) -> String;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;

impl Formatter for HumanFormatter {
    fn write(&self, report: &RunReport) -> String {
        let mut out = String::new();
        write_metadata(&mut out, report);

        out.push_str("Timeline:\n");
        for point in &report.metrics {
            let _ = writeln!(
                out,
                "t={}ms active={} completed={} failed={} new={}",
                point.timestamp_ms,
                point.active_requests,
                point.completed_count,
                point.failed_count,
                point.generated
            );
        }

        write_summary(&mut out, report);

        if !report.failure_breakdown.is_empty() {
            out.push_str("Failures:\n");
            for (reason, count) in &report.failure_breakdown {
                let _ = writeln!(out, "{}: {}", reason, count);
            }
        }

        if !report.utilization.is_idle() {
            out.push_str("Utilization:\n");
            for (id, value) in &report.utilization.nodes {
                let _ = writeln!(out, "node {}: {:.1}%", id, value * 100.0);
            }
            for (id, value) in &report.utilization.edges {
                let _ = writeln!(out, "edge {}: {:.1}%", id, value * 100.0);
            }
        }
        out
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, report: &RunReport) -> String {
        let mut out = String::new();
        write_metadata(&mut out, report);
        write_summary(&mut out, report);
        out
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, report: &RunReport) -> String {
        match serde_json::to_string_pretty(report) {
            Ok(json) => format!("{}\n", json),
            Err(err) => format!("{{\"error\": \"{}\"}}\n", err),
        }
    }
}

fn write_metadata(out: &mut String, report: &RunReport) {
    out.push_str("Metadata:\n");
    let _ = writeln!(out, "seed: {}", report.seed);
    let _ = writeln!(out, "ticks: {}", report.ticks);
    let _ = writeln!(out, "tick_ms: {}", report.tick_interval_ms);
    let _ = writeln!(out, "elapsed_ms: {}", report.elapsed_ms);
}

fn write_summary(out: &mut String, report: &RunReport) {
    out.push_str("Summary:\n");
    let _ = writeln!(out, "generated: {}", report.generated_count);
    let _ = writeln!(out, "completed: {}", report.completed_count);
    let _ = writeln!(out, "failed: {}", report.failed_count);
    let _ = writeln!(out, "active: {}", report.active_count);
    let _ = writeln!(
        out,
        "avg response: {:.2}ms",
        report.average_response_time_ms
    );
    let _ = writeln!(out, "avg size: {:.2}KB", report.average_request_size_kb);
}

/// Human-readable listing of a parsed scenario for `show-config`.
pub fn describe_scenario(scenario: &Scenario) -> String {
    let settings = &scenario.simulation;
    let mut out = String::new();
    let _ = writeln!(out, "Tick interval: {}ms", settings.tick_interval_ms);
    let _ = writeln!(out, "Request lifetime: {}ms", settings.max_request_lifetime_ms);
    match settings.seed {
        Some(seed) => {
            let _ = writeln!(out, "Seed: {}", seed);
        }
        None => out.push_str("Seed: random\n"),
    }
    let mix = &settings.request_mix;
    let _ = writeln!(
        out,
        "Request mix: read {:.2}, write {:.2}, compute {:.2}, transaction {:.2}",
        mix.read,
        mix.write,
        mix.compute,
        mix.transaction()
    );

    out.push_str("Nodes:\n");
    for node in &scenario.nodes {
        let _ = writeln!(out, "- {} ({})", node.id, node.kind.label());
    }
    out.push_str("Edges:\n");
    for edge in &scenario.edges {
        let _ = writeln!(
            out,
            "- {}: {} -> {} ({})",
            edge.id,
            edge.source,
            edge.target,
            edge.kind.label()
        );
    }
    out
}
