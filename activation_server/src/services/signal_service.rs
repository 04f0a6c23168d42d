//! Downstream campaign performance signals.
//!
//! Fire-and-forget: emission failures are logged and never block or roll
//! back the meeting/pipeline transition that triggered them.

use serde::Serialize;

#[derive(Debug, Serialize)]
struct SignalBody<'a> {
    campaign_id: i64,
    signal: &'a str,
    pipeline_id: i64,
}

/// Post one performance signal for a campaign.
pub async fn emit_signal(
    endpoint: &str,
    campaign_id: i64,
    signal: &str,
    pipeline_id: i64,
) -> anyhow::Result<()> {
    if endpoint.is_empty() {
        tracing::debug!(signal, "Signal endpoint not set, skipping emission");
        return Ok(());
    }

    let body = SignalBody {
        campaign_id,
        signal,
        pipeline_id,
    };

    let client = reqwest::Client::new();
    let resp = client
        .post(endpoint)
        .header("User-Agent", "activation-server")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        tracing::warn!(signal, %status, "Performance signal rejected: {text}");
    }

    Ok(())
}

/// Spawn signal emissions for an outcome without blocking the caller.
pub fn emit_outcome_signals(endpoint: &str, campaign_id: i64, pipeline_id: i64, installed: bool) {
    let mut signals = vec!["install_attended"];
    if installed {
        signals.push("calculator_installed");
    }

    for signal in signals {
        let endpoint = endpoint.to_string();
        tokio::spawn(async move {
            if let Err(e) = emit_signal(&endpoint, campaign_id, signal, pipeline_id).await {
                tracing::warn!(campaign_id, signal, "Performance signal failed: {e}");
            }
        });
    }
}
