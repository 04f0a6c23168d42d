//! Meeting records: booking, lookup, and the conditional status claim that
//! serializes racing outcome completions.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::meeting::{status, Meeting, NewMeeting};
use crate::schema::act_meetings;

/// Create a new meeting record.
pub async fn create_meeting(
    conn: &mut AsyncPgConnection,
    new_meeting: NewMeeting,
) -> anyhow::Result<Meeting> {
    let result = diesel::insert_into(act_meetings::table)
        .values(&new_meeting)
        .get_result::<Meeting>(conn)
        .await?;

    tracing::info!(
        meeting_id = result.id,
        pipeline_id = result.pipeline_id,
        attempt = result.attempt_number,
        "Meeting scheduled"
    );
    Ok(result)
}

/// Get a meeting by ID.
pub async fn get_meeting(
    conn: &mut AsyncPgConnection,
    meeting_id: i64,
) -> anyhow::Result<Option<Meeting>> {
    let result = act_meetings::table
        .find(meeting_id)
        .first::<Meeting>(conn)
        .await
        .optional()?;
    Ok(result)
}

/// Claim a scheduled meeting for outcome processing by conditionally moving
/// it out of `scheduled`. Exactly one of two racing completions wins; the
/// loser sees zero rows updated.
pub async fn claim_for_outcome(
    conn: &mut AsyncPgConnection,
    meeting_id: i64,
    new_status: &str,
) -> anyhow::Result<bool> {
    let updated = diesel::update(
        act_meetings::table
            .find(meeting_id)
            .filter(act_meetings::status.eq(status::SCHEDULED)),
    )
    .set((
        act_meetings::status.eq(new_status),
        act_meetings::completed_at.eq(Utc::now()),
        act_meetings::write_date.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;
    Ok(updated > 0)
}

/// Record outcome payload fields on a claimed meeting.
pub async fn record_outcome_fields(
    conn: &mut AsyncPgConnection,
    meeting_id: i64,
    req: &crate::models::outcome::OutcomeRequest,
) -> anyhow::Result<()> {
    diesel::update(act_meetings::table.find(meeting_id))
        .set((
            act_meetings::outcome_notes.eq(req.outcome_notes.clone()),
            act_meetings::proof_method.eq(req.proof_method.clone()),
            act_meetings::install_url.eq(req.install_url.clone()),
            act_meetings::block_reason.eq(req.block_reason.clone()),
            act_meetings::cancel_reason.eq(req.cancel_reason.clone()),
            act_meetings::canceled_by.eq(req.canceled_by.clone()),
            act_meetings::reschedule_reason.eq(req.reschedule_reason.clone()),
            act_meetings::contact_attempted
                .eq(req.contact_attempted.as_ref().map(|v| serde_json::json!(v))),
            act_meetings::lead_delivery_methods.eq(req
                .lead_delivery_methods
                .as_ref()
                .map(|v| serde_json::json!(v))),
            act_meetings::kill_reason.eq(req.kill_reason.clone()),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

/// All scheduled meetings for the given activators intersecting a time range.
/// Input to slot generation.
pub async fn scheduled_in_range(
    conn: &mut AsyncPgConnection,
    activator_ids: &[i64],
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> anyhow::Result<Vec<Meeting>> {
    let results = act_meetings::table
        .filter(act_meetings::activator_user_id.eq_any(activator_ids))
        .filter(act_meetings::status.eq(status::SCHEDULED))
        .filter(act_meetings::scheduled_end_at.gt(range_start))
        .filter(act_meetings::scheduled_start_at.lt(range_end))
        .order(act_meetings::scheduled_start_at.asc())
        .load::<Meeting>(conn)
        .await?;
    Ok(results)
}

/// The meeting chain for a pipeline, oldest attempt first.
pub async fn chain_for_pipeline(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
) -> anyhow::Result<Vec<Meeting>> {
    let results = act_meetings::table
        .filter(act_meetings::pipeline_id.eq(pipeline_id))
        .order(act_meetings::attempt_number.asc())
        .load::<Meeting>(conn)
        .await?;
    Ok(results)
}

/// Whether any scheduled meeting for the activator overlaps the interval.
/// Booking re-validates this even though the slot generator already checked,
/// since slot output can go stale under concurrent bookings.
pub async fn has_conflict(
    conn: &mut AsyncPgConnection,
    activator_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let count: i64 = act_meetings::table
        .filter(act_meetings::activator_user_id.eq(activator_id))
        .filter(act_meetings::status.eq(status::SCHEDULED))
        .filter(act_meetings::scheduled_end_at.gt(start))
        .filter(act_meetings::scheduled_start_at.lt(end))
        .count()
        .get_result(conn)
        .await?;
    Ok(count > 0)
}
