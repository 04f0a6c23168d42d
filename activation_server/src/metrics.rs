//! Prometheus metrics for activation pipeline observability.

use metrics::{counter, histogram};

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record a lifecycle webhook received event.
pub fn webhook_received(event_type: &str) {
    counter!("act_webhooks_received_total", "event" => event_type.to_string()).increment(1);
}

/// Record a meeting outcome processed.
pub fn outcome_processed(outcome: &str) {
    counter!("act_outcomes_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a pipeline status transition.
pub fn pipeline_status_changed(status: &str) {
    counter!("act_pipelines_total", "status" => status.to_string()).increment(1);
}

/// Record an auto-kill.
pub fn pipeline_auto_killed(reason: &str) {
    counter!("act_auto_kills_total", "reason" => reason.to_string()).increment(1);
}

/// Record how many slots a generation pass produced.
pub fn slots_generated(count: usize) {
    histogram!("act_slots_generated").record(count as f64);
}

/// Record a bonus credit awarded.
pub fn bonus_awarded(role: &str) {
    counter!("act_bonus_credits_total", "role" => role.to_string()).increment(1);
}
