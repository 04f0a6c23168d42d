//! Pipeline state machine: status writes, terminal enforcement, counters,
//! milestones, and the activation invariant.
//!
//! Every status/follow-up write is predicated on the row not being terminal,
//! so `active` and `killed` freeze the pipeline at the store level and a
//! racing writer simply affects zero rows.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::lifecycle::Milestone;
use crate::models::pipeline::{ActivationStatus, NewPipeline, Pipeline, PipelineChange};
use crate::schema::act_pipelines;

const TERMINAL_STATUSES: [&str; 2] = ["active", "killed"];

/// Create a new pipeline record.
pub async fn create_pipeline(
    conn: &mut AsyncPgConnection,
    new_pipeline: NewPipeline,
) -> anyhow::Result<Pipeline> {
    let result = diesel::insert_into(act_pipelines::table)
        .values(&new_pipeline)
        .get_result::<Pipeline>(conn)
        .await?;

    crate::metrics::pipeline_status_changed(&result.activation_status);
    tracing::info!(
        pipeline_id = result.id,
        crm_lead_id = %result.crm_lead_id,
        "Pipeline created"
    );
    Ok(result)
}

/// Get a pipeline by ID.
pub async fn get_pipeline(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
) -> anyhow::Result<Option<Pipeline>> {
    let result = act_pipelines::table
        .find(pipeline_id)
        .first::<Pipeline>(conn)
        .await
        .optional()?;
    Ok(result)
}

/// Find the pipeline linked to an external product user.
pub async fn find_by_jcc_user(
    conn: &mut AsyncPgConnection,
    jcc_user_id: &str,
) -> anyhow::Result<Option<Pipeline>> {
    let result = act_pipelines::table
        .filter(act_pipelines::jcc_user_id.eq(jcc_user_id))
        .filter(act_pipelines::active.eq(true))
        .first::<Pipeline>(conn)
        .await
        .optional()?;
    Ok(result)
}

/// Apply a guarded partial update. Returns false when the pipeline is
/// already terminal (zero rows matched the non-terminal predicate).
pub async fn apply_change(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
    mut change: PipelineChange,
) -> anyhow::Result<bool> {
    change.write_date = Some(Utc::now());
    let status = change.activation_status.clone();

    let updated = diesel::update(
        act_pipelines::table
            .find(pipeline_id)
            .filter(act_pipelines::activation_status.ne_all(TERMINAL_STATUSES)),
    )
    .set(&change)
    .execute(conn)
    .await?;

    if updated > 0 {
        if let Some(status) = status {
            crate::metrics::pipeline_status_changed(&status);
        }
    }
    Ok(updated > 0)
}

/// Atomically increment no_show_count and return the new value. The caller
/// decides the auto-kill threshold from the returned count, not from a
/// separate read.
pub async fn increment_no_show(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
) -> anyhow::Result<i32> {
    let count = diesel::update(act_pipelines::table.find(pipeline_id))
        .set((
            act_pipelines::no_show_count.eq(act_pipelines::no_show_count + 1),
            act_pipelines::write_date.eq(Utc::now()),
        ))
        .returning(act_pipelines::no_show_count)
        .get_result::<i32>(conn)
        .await?;
    Ok(count)
}

/// Atomically increment reschedule_count and return the new value.
pub async fn increment_reschedule(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
) -> anyhow::Result<i32> {
    let count = diesel::update(act_pipelines::table.find(pipeline_id))
        .set((
            act_pipelines::reschedule_count.eq(act_pipelines::reschedule_count + 1),
            act_pipelines::write_date.eq(Utc::now()),
        ))
        .returning(act_pipelines::reschedule_count)
        .get_result::<i32>(conn)
        .await?;
    Ok(count)
}

/// Set a milestone timestamp only when it is currently null, which makes
/// event replay a no-op on an already-set field.
pub async fn set_milestone(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
    milestone: Milestone,
    at: DateTime<Utc>,
) -> anyhow::Result<()> {
    use act_pipelines::dsl;

    let target = act_pipelines::table.find(pipeline_id);
    let touched = Utc::now();
    match milestone {
        Milestone::TrialStarted => {
            diesel::update(target.filter(dsl::trial_started_at.is_null()))
                .set((dsl::trial_started_at.eq(at), dsl::write_date.eq(touched)))
                .execute(conn)
                .await?;
        }
        Milestone::PasswordSet => {
            diesel::update(target.filter(dsl::password_set_at.is_null()))
                .set((dsl::password_set_at.eq(at), dsl::write_date.eq(touched)))
                .execute(conn)
                .await?;
        }
        Milestone::FirstLogin => {
            diesel::update(target.filter(dsl::first_login_at.is_null()))
                .set((dsl::first_login_at.eq(at), dsl::write_date.eq(touched)))
                .execute(conn)
                .await?;
        }
        Milestone::CalculatorModified => {
            diesel::update(target.filter(dsl::calculator_modified_at.is_null()))
                .set((dsl::calculator_modified_at.eq(at), dsl::write_date.eq(touched)))
                .execute(conn)
                .await?;
        }
        Milestone::EmbedSnippetCopied => {
            diesel::update(target.filter(dsl::embed_snippet_copied_at.is_null()))
                .set((dsl::embed_snippet_copied_at.eq(at), dsl::write_date.eq(touched)))
                .execute(conn)
                .await?;
        }
        Milestone::FirstLeadReceived => {
            diesel::update(target.filter(dsl::first_lead_received_at.is_null()))
                .set((dsl::first_lead_received_at.eq(at), dsl::write_date.eq(touched)))
                .execute(conn)
                .await?;
        }
        Milestone::Converted => {
            diesel::update(target.filter(dsl::converted_at.is_null()))
                .set((dsl::converted_at.eq(at), dsl::write_date.eq(touched)))
                .execute(conn)
                .await?;
        }
    }
    Ok(())
}

/// Re-check the activation invariant and set activated_at when both trigger
/// milestones are present. activated_at is the later of the two, written
/// exactly once (null-guarded). The instant is invariant-derived and not
/// part of the terminal freeze — a pipeline already active through a proven
/// install still gets it recorded — so only the status flip carries the
/// non-terminal guard.
pub async fn mark_activated_if_eligible(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
) -> anyhow::Result<Option<DateTime<Utc>>> {
    let pipeline = match get_pipeline(conn, pipeline_id).await? {
        Some(p) => p,
        None => return Ok(None),
    };
    let activated_at = match pipeline.pending_activation() {
        Some(t) => t,
        None => return Ok(None),
    };

    let updated = diesel::update(
        act_pipelines::table
            .find(pipeline_id)
            .filter(act_pipelines::activated_at.is_null()),
    )
    .set((
        act_pipelines::activated_at.eq(activated_at),
        act_pipelines::write_date.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;
    if updated == 0 {
        return Ok(None);
    }

    let flipped = diesel::update(
        act_pipelines::table
            .find(pipeline_id)
            .filter(act_pipelines::activation_status.ne_all(TERMINAL_STATUSES)),
    )
    .set((
        act_pipelines::activation_status.eq(ActivationStatus::Active.as_str()),
        act_pipelines::write_date.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;

    if flipped > 0 {
        crate::metrics::pipeline_status_changed("active");
    }
    tracing::info!(pipeline_id, %activated_at, "Pipeline activated");
    Ok(Some(activated_at))
}

/// Apply attribution codes: first-touch only when no prior value exists,
/// last-touch always.
pub async fn apply_attribution(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
    touch_code: &str,
) -> anyhow::Result<()> {
    diesel::update(
        act_pipelines::table
            .find(pipeline_id)
            .filter(act_pipelines::sdr_first_touch_code.is_null()),
    )
    .set(act_pipelines::sdr_first_touch_code.eq(touch_code))
    .execute(conn)
    .await?;

    diesel::update(act_pipelines::table.find(pipeline_id))
        .set(act_pipelines::sdr_last_touch_code.eq(touch_code))
        .execute(conn)
        .await?;
    Ok(())
}

/// Pipelines sitting in `blocked` with no write since `older_than`.
/// Consumed by the background sweep for time-based auto-kill.
pub async fn list_stale_blocked(
    conn: &mut AsyncPgConnection,
    older_than: DateTime<Utc>,
) -> anyhow::Result<Vec<i64>> {
    let ids = act_pipelines::table
        .filter(act_pipelines::activation_status.eq(ActivationStatus::Blocked.as_str()))
        .filter(act_pipelines::write_date.lt(older_than))
        .filter(act_pipelines::active.eq(true))
        .select(act_pipelines::id)
        .load::<i64>(conn)
        .await?;
    Ok(ids)
}
