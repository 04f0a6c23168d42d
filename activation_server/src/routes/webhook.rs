//! Lifecycle webhook handler — receives external product events.

use axum::http::HeaderMap;
use diesel_async::AsyncPgConnection;
use serde::Deserialize;

use crate::config::ActivationConfig;
use crate::error::ApiError;
use crate::services::event_service::{self, IngestResult};

/// Lifecycle webhook body.
#[derive(Debug, Deserialize)]
pub struct LifecycleWebhook {
    pub user_id: String,
    pub event_type: String,
    pub payload: Option<serde_json::Value>,
}

/// Check the optional bearer-token secret. An unset secret disables auth
/// (warned at startup).
pub fn authorize(config: &ActivationConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    if config.webhook_secret.is_empty() {
        return Ok(());
    }
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    if token != config.webhook_secret {
        tracing::warn!("Lifecycle webhook rejected: bad bearer token");
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

/// Handle an incoming lifecycle webhook payload.
pub async fn handle_webhook(
    config: &ActivationConfig,
    conn: &mut AsyncPgConnection,
    headers: &HeaderMap,
    body: LifecycleWebhook,
) -> Result<IngestResult, ApiError> {
    authorize(config, headers)?;
    event_service::ingest_event(conn, &body.user_id, &body.event_type, body.payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config(secret: &str) -> ActivationConfig {
        ActivationConfig {
            webhook_secret: secret.to_string(),
            signal_endpoint: String::new(),
            booking_window_cap_days: 14,
            no_show_kill_threshold: 2,
            reschedule_kill_threshold: 3,
            blocked_stale_days: 14,
            sweep_interval_secs: 300,
        }
    }

    #[test]
    fn empty_secret_disables_auth() {
        assert!(authorize(&config(""), &HeaderMap::new()).is_ok());
    }

    #[test]
    fn wrong_token_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer nope"));
        assert!(matches!(
            authorize(&config("s3cret"), &headers),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn matching_token_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        assert!(authorize(&config("s3cret"), &headers).is_ok());
    }

    #[test]
    fn missing_header_rejected_when_secret_set() {
        assert!(matches!(
            authorize(&config("s3cret"), &HeaderMap::new()),
            Err(ApiError::Unauthorized)
        ));
    }
}
