//! Background sweep — periodic jobs spawned as a tokio task.
//!
//! Two passes per tick: auto-kill pipelines blocked longer than the
//! configured staleness window, and reconcile unprocessed lifecycle events
//! (redelivery safety net; processed rows are skipped).

use chrono::{Duration, Utc};

use crate::config::ActivationConfig;
use crate::routes::DbPool;
use crate::services::{event_service, outcome_service, pipeline_service};

const RECONCILE_BATCH: i64 = 100;

/// Run the sweep loop forever. Spawned as a background tokio task.
pub async fn run_sweep(pool: DbPool, config: ActivationConfig) {
    tracing::info!(
        interval_secs = config.sweep_interval_secs,
        blocked_stale_days = config.blocked_stale_days,
        "Background sweep started"
    );

    loop {
        if let Err(e) = sweep_once(&pool, &config).await {
            tracing::error!("Sweep pass error: {e}");
        }
        tokio::time::sleep(std::time::Duration::from_secs(config.sweep_interval_secs)).await;
    }
}

/// One sweep pass.
async fn sweep_once(pool: &DbPool, config: &ActivationConfig) -> anyhow::Result<()> {
    let mut conn = pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("db pool: {e}"))?;

    // Time-based auto-kill for stale blocked pipelines.
    let cutoff = Utc::now() - Duration::days(config.blocked_stale_days);
    let stale = pipeline_service::list_stale_blocked(&mut conn, cutoff).await?;
    for pipeline_id in stale {
        if outcome_service::kill(&mut conn, pipeline_id, outcome_service::KILL_BLOCKED_STALE)
            .await?
        {
            outcome_service::record_activation_event(
                &mut conn,
                pipeline_id,
                None,
                "auto_kill_blocked_stale",
                None,
                None,
            )
            .await?;
            crate::metrics::pipeline_auto_killed(outcome_service::KILL_BLOCKED_STALE);
            tracing::info!(pipeline_id, "Stale blocked pipeline auto-killed");
        }
    }

    // Reconciliation of unprocessed lifecycle events.
    event_service::process_unprocessed(&mut conn, RECONCILE_BATCH).await?;

    Ok(())
}
