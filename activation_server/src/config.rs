//! Activation server configuration — loaded from environment variables.

#[derive(Clone, Debug)]
pub struct ActivationConfig {
    /// Bearer token expected on lifecycle webhook calls.
    pub webhook_secret: String,
    /// Base URL for downstream campaign performance signals.
    pub signal_endpoint: String,
    /// Hard cap on the booking window in days.
    pub booking_window_cap_days: i64,
    /// No-show count at which a pipeline is auto-killed.
    pub no_show_kill_threshold: i32,
    /// Reschedule count at which a pipeline is auto-killed.
    pub reschedule_kill_threshold: i32,
    /// Days a pipeline may sit blocked before the sweep kills it.
    pub blocked_stale_days: i64,
    /// Seconds between background sweep passes.
    pub sweep_interval_secs: u64,
}

impl ActivationConfig {
    pub fn from_env() -> Self {
        let webhook_secret = std::env::var("ACT_WEBHOOK_SECRET").unwrap_or_default();
        let signal_endpoint = std::env::var("ACT_SIGNAL_ENDPOINT").unwrap_or_default();
        let booking_window_cap_days = std::env::var("ACT_BOOKING_WINDOW_CAP_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(14);
        let no_show_kill_threshold = std::env::var("ACT_NO_SHOW_KILL_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2);
        let reschedule_kill_threshold = std::env::var("ACT_RESCHEDULE_KILL_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);
        let blocked_stale_days = std::env::var("ACT_BLOCKED_STALE_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(14);
        let sweep_interval_secs = std::env::var("ACT_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        if webhook_secret.is_empty() {
            tracing::warn!("ACT_WEBHOOK_SECRET not set -- lifecycle webhook auth disabled");
        }
        if signal_endpoint.is_empty() {
            tracing::warn!("ACT_SIGNAL_ENDPOINT not set -- performance signals disabled");
        }

        Self {
            webhook_secret,
            signal_endpoint,
            booking_window_cap_days,
            no_show_kill_threshold,
            reschedule_kill_threshold,
            blocked_stale_days,
            sweep_interval_secs,
        }
    }
}
