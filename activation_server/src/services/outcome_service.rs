//! Meeting outcome processing: paired meeting + pipeline updates, reschedule
//! chaining, auto-kill thresholds, audit events, and downstream signals.
//!
//! Ordering matters: validation happens before any write, the meeting row is
//! claimed with a conditional update (serializing racing completions), and
//! only then is the pipeline mutated. Signal/notification side effects are
//! dispatched after the primary writes and never fail the request.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::config::ActivationConfig;
use crate::error::{ApiError, ALREADY_COMPLETED, TERMINAL_STATE};
use crate::models::meeting::NewMeeting;
use crate::models::outcome::{MeetingOutcome, OutcomeRequest};
use crate::models::pipeline::{ActivationStatus, PipelineChange};
use crate::schema::act_activation_events;
use crate::services::notify::Notifier;
use crate::services::{meeting_service, pipeline_service, signal_service};
use crate::timeutil;

pub const KILL_EXCESSIVE_RESCHEDULES: &str = "excessive_reschedules";
pub const KILL_REPEATED_NO_SHOW: &str = "repeated_no_show";
pub const KILL_BLOCKED_STALE: &str = "blocked_stale";

/// Decision after a counter increment. `Kill` carries the kill reason and
/// means no rebooking or follow-up happens for this pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdAction {
    Kill(&'static str),
    Continue,
}

/// Post-increment decision for a no-show outcome.
pub fn no_show_action(count: i32, threshold: i32) -> ThresholdAction {
    if count >= threshold {
        ThresholdAction::Kill(KILL_REPEATED_NO_SHOW)
    } else {
        ThresholdAction::Continue
    }
}

/// Post-increment decision for a reschedule outcome.
pub fn reschedule_action(count: i32, threshold: i32) -> ThresholdAction {
    if count >= threshold {
        ThresholdAction::Kill(KILL_EXCESSIVE_RESCHEDULES)
    } else {
        ThresholdAction::Continue
    }
}

/// A guarded pipeline write that matched zero rows means the pipeline went
/// terminal under us; surface that as a conflict instead of reporting a
/// transition that never happened.
fn require_applied(applied: bool) -> Result<(), ApiError> {
    if applied {
        Ok(())
    } else {
        Err(ApiError::Conflict(TERMINAL_STATE))
    }
}

/// Result of a completed outcome.
#[derive(Debug, Serialize)]
pub struct OutcomeResult {
    pub outcome: &'static str,
    pub meeting_id: i64,
    pub pipeline_status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kill_reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_meeting_id: Option<i64>,
}

/// Process a structured outcome for a meeting.
pub async fn complete_meeting(
    conn: &mut AsyncPgConnection,
    config: &ActivationConfig,
    notifier: &dyn Notifier,
    meeting_id: i64,
    req: &OutcomeRequest,
    actor_user_id: Option<i64>,
) -> Result<OutcomeResult, ApiError> {
    // Validate before touching anything.
    let outcome = MeetingOutcome::from_request(req)?;

    let meeting = meeting_service::get_meeting(conn, meeting_id)
        .await?
        .ok_or(ApiError::NotFound("meeting"))?;
    let pipeline = pipeline_service::get_pipeline(conn, meeting.pipeline_id)
        .await?
        .ok_or(ApiError::NotFound("pipeline"))?;

    if pipeline.status().is_terminal() {
        return Err(ApiError::Conflict(TERMINAL_STATE));
    }

    // Claim the meeting row; a concurrent completion loses here.
    if !meeting_service::claim_for_outcome(conn, meeting_id, outcome.meeting_status()).await? {
        return Err(ApiError::Conflict(ALREADY_COMPLETED));
    }
    meeting_service::record_outcome_fields(conn, meeting_id, req).await?;

    let now = Utc::now();
    let pipeline_id = pipeline.id;
    let mut result = OutcomeResult {
        outcome: outcome.kind(),
        meeting_id,
        pipeline_status: ActivationStatus::Queued.as_str(),
        kill_reason: None,
        new_meeting_id: None,
    };

    match &outcome {
        MeetingOutcome::InstalledProven { install_url, .. } => {
            let change = PipelineChange {
                activation_status: Some(ActivationStatus::Active.as_str().to_string()),
                calculator_installed_at: Some(now),
                install_url: Some(install_url.clone()),
                ..Default::default()
            }
            .clear_followups();
            require_applied(pipeline_service::apply_change(conn, pipeline_id, change).await?)?;
            result.pipeline_status = ActivationStatus::Active.as_str();
        }

        MeetingOutcome::Blocked {
            block_reason,
            block_owner,
            next_step,
            followup_at,
        }
        | MeetingOutcome::Partial {
            block_reason,
            block_owner,
            next_step,
            followup_at,
        } => {
            let default_days = if matches!(&outcome, MeetingOutcome::Partial { .. }) {
                2
            } else {
                1
            };
            let due =
                (*followup_at).unwrap_or_else(|| timeutil::add_business_days(now, default_days));
            let change = PipelineChange {
                activation_status: Some(ActivationStatus::Blocked.as_str().to_string()),
                block_reason: Some(Some(block_reason.clone())),
                block_owner: Some(Some(block_owner.clone())),
                next_step: Some(Some(next_step.clone())),
                followup_owner_role: Some(Some("activator".to_string())),
                next_followup_at: Some(Some(due)),
                followup_reason: Some(Some(block_reason.clone())),
                ..Default::default()
            };
            require_applied(pipeline_service::apply_change(conn, pipeline_id, change).await?)?;
            result.pipeline_status = ActivationStatus::Blocked.as_str();

            notifier
                .notify(
                    "activator",
                    &format!("Pipeline {pipeline_id} blocked: {block_reason}; next step: {next_step}"),
                )
                .await;
        }

        MeetingOutcome::Rescheduled {
            new_start, new_end, ..
        } => {
            let count = pipeline_service::increment_reschedule(conn, pipeline_id).await?;
            match reschedule_action(count, config.reschedule_kill_threshold) {
                ThresholdAction::Kill(reason) => {
                    require_applied(kill(conn, pipeline_id, reason).await?)?;
                    result.pipeline_status = ActivationStatus::Killed.as_str();
                    result.kill_reason = Some(reason);
                }
                ThresholdAction::Continue => {
                    let change = PipelineChange {
                        activation_status: Some(ActivationStatus::Queued.as_str().to_string()),
                        ..Default::default()
                    };
                    require_applied(
                        pipeline_service::apply_change(conn, pipeline_id, change).await?,
                    )?;

                    // New attempt inherits the immutable scheduling fields.
                    let duration = meeting.scheduled_end_at - meeting.scheduled_start_at;
                    let new_meeting = meeting_service::create_meeting(
                        conn,
                        NewMeeting {
                            organization_id: meeting.organization_id,
                            pipeline_id,
                            parent_meeting_id: Some(meeting.id),
                            attempt_number: meeting.attempt_number + 1,
                            scheduled_start_at: *new_start,
                            scheduled_end_at: (*new_end).unwrap_or(*new_start + duration),
                            scheduled_timezone: meeting.scheduled_timezone.clone(),
                            activator_user_id: meeting.activator_user_id,
                            scheduled_by_sdr_user_id: meeting.scheduled_by_sdr_user_id,
                            status: crate::models::meeting::status::SCHEDULED.to_string(),
                        },
                    )
                    .await?;
                    result.pipeline_status = ActivationStatus::Queued.as_str();
                    result.new_meeting_id = Some(new_meeting.id);
                }
            }
        }

        MeetingOutcome::NoShow { .. } => {
            let count = pipeline_service::increment_no_show(conn, pipeline_id).await?;
            match no_show_action(count, config.no_show_kill_threshold) {
                ThresholdAction::Kill(reason) => {
                    require_applied(kill(conn, pipeline_id, reason).await?)?;
                    result.pipeline_status = ActivationStatus::Killed.as_str();
                    result.kill_reason = Some(reason);
                }
                ThresholdAction::Continue => {
                    let change = PipelineChange {
                        activation_status: Some(ActivationStatus::NoShow.as_str().to_string()),
                        no_show_at: Some(now),
                        followup_owner_role: Some(Some("sdr".to_string())),
                        next_followup_at: Some(Some(timeutil::add_business_days(now, 1))),
                        ..Default::default()
                    };
                    require_applied(
                        pipeline_service::apply_change(conn, pipeline_id, change).await?,
                    )?;
                    result.pipeline_status = ActivationStatus::NoShow.as_str();

                    notifier
                        .notify(
                            "sdr",
                            &format!("Pipeline {pipeline_id} no-show #{count}, follow up"),
                        )
                        .await;
                }
            }
        }

        MeetingOutcome::Canceled { .. } => {
            let change = PipelineChange {
                activation_status: Some(ActivationStatus::Queued.as_str().to_string()),
                followup_owner_role: Some(Some("sdr".to_string())),
                next_followup_at: Some(Some(timeutil::add_business_days(now, 1))),
                ..Default::default()
            };
            require_applied(pipeline_service::apply_change(conn, pipeline_id, change).await?)?;
            result.pipeline_status = ActivationStatus::Queued.as_str();
        }

        MeetingOutcome::Killed { kill_reason } => {
            let change = PipelineChange {
                activation_status: Some(ActivationStatus::Killed.as_str().to_string()),
                kill_reason: Some(Some(kill_reason.clone())),
                marked_lost_at: Some(now),
                ..Default::default()
            };
            require_applied(pipeline_service::apply_change(conn, pipeline_id, change).await?)?;
            result.pipeline_status = ActivationStatus::Killed.as_str();
        }
    }

    record_activation_event(
        conn,
        pipeline_id,
        Some(meeting_id),
        outcome.kind(),
        actor_user_id,
        serde_json::to_value(req).ok(),
    )
    .await?;

    // Performance signals are fire-and-forget when a campaign is resolvable.
    if let Some(campaign_id) = pipeline.campaign_id {
        let installed = matches!(&outcome, MeetingOutcome::InstalledProven { .. });
        signal_service::emit_outcome_signals(
            &config.signal_endpoint,
            campaign_id,
            pipeline_id,
            installed,
        );
    }

    crate::metrics::outcome_processed(outcome.kind());
    if let Some(reason) = result.kill_reason {
        crate::metrics::pipeline_auto_killed(reason);
    }
    tracing::info!(
        meeting_id,
        pipeline_id,
        outcome = outcome.kind(),
        pipeline_status = result.pipeline_status,
        "Meeting outcome processed"
    );

    Ok(result)
}

/// Force a terminal kill transition. Not an error path: auto-kills are
/// successful transitions distinguished by their kill_reason.
pub async fn kill(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
    reason: &str,
) -> anyhow::Result<bool> {
    let change = PipelineChange {
        activation_status: Some(ActivationStatus::Killed.as_str().to_string()),
        kill_reason: Some(Some(reason.to_string())),
        marked_lost_at: Some(Utc::now()),
        ..Default::default()
    };
    pipeline_service::apply_change(conn, pipeline_id, change).await
}

/// Append an immutable audit record for a pipeline transition.
pub async fn record_activation_event(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
    meeting_id: Option<i64>,
    event_type: &str,
    actor_user_id: Option<i64>,
    metadata: Option<serde_json::Value>,
) -> anyhow::Result<()> {
    diesel::insert_into(act_activation_events::table)
        .values((
            act_activation_events::pipeline_id.eq(pipeline_id),
            act_activation_events::meeting_id.eq(meeting_id),
            act_activation_events::event_type.eq(event_type),
            act_activation_events::actor_user_id.eq(actor_user_id),
            act_activation_events::metadata.eq(metadata),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_no_show_kills_with_repeated_no_show() {
        assert_eq!(no_show_action(1, 2), ThresholdAction::Continue);
        assert_eq!(no_show_action(2, 2), ThresholdAction::Kill(KILL_REPEATED_NO_SHOW));
        // Counts past the threshold (late concurrent increments) still kill.
        assert_eq!(no_show_action(3, 2), ThresholdAction::Kill(KILL_REPEATED_NO_SHOW));
    }

    #[test]
    fn third_reschedule_kills_without_rebooking() {
        assert_eq!(reschedule_action(1, 3), ThresholdAction::Continue);
        assert_eq!(reschedule_action(2, 3), ThresholdAction::Continue);
        // Kill carries the reason and means no new meeting row is created.
        assert_eq!(
            reschedule_action(3, 3),
            ThresholdAction::Kill(KILL_EXCESSIVE_RESCHEDULES)
        );
    }

    #[test]
    fn zero_row_pipeline_write_surfaces_terminal_conflict() {
        assert!(require_applied(true).is_ok());
        assert!(matches!(
            require_applied(false),
            Err(ApiError::Conflict(TERMINAL_STATE))
        ));
    }
}
