//! Lifecycle event ingestion: append-only persistence, idempotent derived
//! updates, activation detection, attribution, and bonus triggering.
//!
//! Append always succeeds, even with no pipeline link yet; the background
//! sweep re-scans unprocessed rows so redelivery and out-of-order arrival
//! are safe. `processed` flips true only after all derived updates land.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::error::ApiError;
use crate::models::client_event::{ClientEvent, NewClientEvent};
use crate::models::lifecycle::{self, LifecycleEventType};
use crate::models::pipeline::{Pipeline, PipelineChange};
use crate::schema::act_client_events;
use crate::services::{bonus_service, pipeline_service};

/// Ingestion result returned to the webhook caller.
#[derive(Debug, Serialize)]
pub struct IngestResult {
    pub event_id: i64,
    pub has_link: bool,
    pub will_process: bool,
}

/// Persist one external lifecycle event and process it when a pipeline link
/// exists. Events with no link are kept for later reconciliation.
pub async fn ingest_event(
    conn: &mut AsyncPgConnection,
    jcc_user_id: &str,
    event_type: &str,
    payload: Option<serde_json::Value>,
) -> Result<IngestResult, ApiError> {
    if jcc_user_id.trim().is_empty() {
        return Err(ApiError::missing_field("user_id"));
    }
    let parsed = LifecycleEventType::parse(event_type)
        .ok_or_else(|| ApiError::Validation(format!("unknown event_type: {event_type}")))?;

    // Append unconditionally; the canonical name is stored, not the alias.
    let event: ClientEvent = diesel::insert_into(act_client_events::table)
        .values(&NewClientEvent {
            jcc_user_id: jcc_user_id.to_string(),
            event_type: parsed.as_str().to_string(),
            payload,
            processed: false,
        })
        .get_result(conn)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    crate::metrics::webhook_received(parsed.as_str());

    let pipeline = pipeline_service::find_by_jcc_user(conn, jcc_user_id).await?;
    let has_link = pipeline.is_some();

    if let Some(pipeline) = pipeline {
        process_event(conn, &event, parsed, &pipeline).await?;
    } else {
        tracing::debug!(jcc_user_id, event_type = parsed.as_str(), "Event stored without link");
    }

    Ok(IngestResult {
        event_id: event.id,
        has_link,
        will_process: has_link,
    })
}

/// Apply one event's derived updates to its linked pipeline, then mark the
/// event processed. Safe to replay: milestone writes are null-guarded and
/// the processed flag flips at most once.
pub async fn process_event(
    conn: &mut AsyncPgConnection,
    event: &ClientEvent,
    event_type: LifecycleEventType,
    pipeline: &Pipeline,
) -> Result<(), ApiError> {
    let occurred_at = event_occurred_at(event);
    let (attribution, update) =
        lifecycle::derive_updates(event_type, event.payload.as_ref(), occurred_at);

    if let Some(milestone) = update.milestone {
        pipeline_service::set_milestone(conn, pipeline.id, milestone, occurred_at).await?;
    }

    if let Some(followup) = update.followup {
        let change = PipelineChange {
            followup_owner_role: Some(Some(followup.owner_role.to_string())),
            next_action: Some(Some(followup.next_action.to_string())),
            next_followup_at: Some(Some(followup.due_at)),
            ..Default::default()
        };
        // Terminal pipelines ignore follow-up scheduling; that is not an error.
        pipeline_service::apply_change(conn, pipeline.id, change).await?;
    }

    // Attribution is supplementary: a failure must not fail ingestion.
    if let Some(code) = attribution.touch_code.as_deref() {
        if let Err(e) = pipeline_service::apply_attribution(conn, pipeline.id, code).await {
            tracing::warn!(pipeline_id = pipeline.id, "Attribution write failed: {e}");
        }
    }

    if event_type.is_activation_trigger() {
        pipeline_service::mark_activated_if_eligible(conn, pipeline.id).await?;
    }

    if event_type.triggers_bonus() {
        if let Some(campaign_id) = pipeline.campaign_id {
            if let Err(e) = bonus_service::award_bonuses(
                conn,
                campaign_id,
                event_type.as_str(),
                &event.jcc_user_id,
                pipeline,
            )
            .await
            {
                tracing::warn!(pipeline_id = pipeline.id, "Bonus awarding failed: {e}");
            }
        }
    }

    mark_processed(conn, event.id).await?;
    Ok(())
}

/// Flip `processed` false→true. A replayed call affects zero rows.
async fn mark_processed(conn: &mut AsyncPgConnection, event_id: i64) -> anyhow::Result<()> {
    diesel::update(
        act_client_events::table
            .find(event_id)
            .filter(act_client_events::processed.eq(false)),
    )
    .set((
        act_client_events::processed.eq(true),
        act_client_events::processed_at.eq(Utc::now()),
        act_client_events::write_date.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;
    Ok(())
}

/// Reconciliation pass: re-process unprocessed events whose pipeline link
/// now exists. Processed rows are skipped outright.
pub async fn process_unprocessed(conn: &mut AsyncPgConnection, limit: i64) -> anyhow::Result<usize> {
    let pending: Vec<ClientEvent> = act_client_events::table
        .filter(act_client_events::processed.eq(false))
        .order(act_client_events::id.asc())
        .limit(limit)
        .load(conn)
        .await?;

    let mut handled = 0;
    for event in &pending {
        let event_type = match LifecycleEventType::parse(&event.event_type) {
            Some(t) => t,
            None => continue,
        };
        let pipeline = match pipeline_service::find_by_jcc_user(conn, &event.jcc_user_id).await? {
            Some(p) => p,
            None => continue,
        };
        if let Err(e) = process_event(conn, event, event_type, &pipeline).await {
            tracing::warn!(event_id = event.id, "Reconciliation failed: {e}");
            continue;
        }
        handled += 1;
    }

    if handled > 0 {
        tracing::info!(handled, "Reconciled unprocessed lifecycle events");
    }
    Ok(handled)
}

/// Event timestamp: `occurred_at` from the payload when the sender supplied
/// one, otherwise the ingestion time.
fn event_occurred_at(event: &ClientEvent) -> DateTime<Utc> {
    event
        .payload
        .as_ref()
        .and_then(|p| p.get("occurred_at"))
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or(event.create_date)
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(payload: Option<serde_json::Value>) -> ClientEvent {
        ClientEvent {
            id: 1,
            jcc_user_id: "jcc-1".to_string(),
            event_type: "trial_started".to_string(),
            payload,
            processed: false,
            processed_at: None,
            active: true,
            create_date: Some(
                DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            ),
            write_date: None,
        }
    }

    #[test]
    fn occurred_at_prefers_payload_timestamp() {
        let e = event(Some(serde_json::json!({ "occurred_at": "2024-05-30T08:15:00Z" })));
        assert_eq!(
            event_occurred_at(&e),
            DateTime::parse_from_rfc3339("2024-05-30T08:15:00Z").unwrap()
        );
    }

    #[test]
    fn occurred_at_falls_back_to_ingestion_time() {
        let e = event(Some(serde_json::json!({ "plan": "pro" })));
        assert_eq!(event_occurred_at(&e), e.create_date.unwrap());
    }

    #[test]
    fn occurred_at_ignores_malformed_timestamps() {
        let e = event(Some(serde_json::json!({ "occurred_at": "yesterday-ish" })));
        assert_eq!(event_occurred_at(&e), e.create_date.unwrap());
    }
}
