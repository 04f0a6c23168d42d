//! Narrow notification capability: `notify(recipient, content) -> sent|failed`.
//!
//! Actual email/SMS delivery lives outside this service; callers only see
//! this trait. Failures are logged and isolated from the primary transition.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyStatus {
    Sent,
    Failed,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, content: &str) -> NotifyStatus;
}

/// Default notifier: records the notification in the log stream only. The
/// production deployment swaps in a delivery-backed implementation.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: &str, content: &str) -> NotifyStatus {
        tracing::info!(recipient, content, "Notification dispatched");
        NotifyStatus::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_reports_sent() {
        let n = LogNotifier;
        assert_eq!(n.notify("sdr-7", "follow up tomorrow").await, NotifyStatus::Sent);
    }
}
