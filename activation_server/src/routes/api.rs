//! REST API types and operations for pipelines and meetings.

use chrono::{DateTime, Duration, Utc};
use diesel_async::AsyncPgConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, TERMINAL_STATE};
use crate::models::meeting::{status, Meeting, NewMeeting};
use crate::models::pipeline::{ActivationStatus, NewPipeline, Pipeline, PipelineChange};
use crate::services::{meeting_service, outcome_service, pipeline_service};

/// JSON response for a pipeline with its meeting chain.
#[derive(Debug, Serialize)]
pub struct PipelineJson {
    pub id: i64,
    pub crm_lead_id: String,
    pub jcc_user_id: Option<String>,
    pub activation_status: String,
    pub kill_reason: Option<String>,
    pub no_show_count: i32,
    pub reschedule_count: i32,
    pub activated_at: Option<DateTime<Utc>>,
    pub next_followup_at: Option<DateTime<Utc>>,
    pub followup_owner_role: Option<String>,
    pub meetings: Vec<MeetingJson>,
}

#[derive(Debug, Serialize)]
pub struct MeetingJson {
    pub id: i64,
    pub parent_meeting_id: Option<i64>,
    pub attempt_number: i32,
    pub scheduled_start_at: DateTime<Utc>,
    pub scheduled_end_at: DateTime<Utc>,
    pub activator_user_id: i64,
    pub status: String,
}

fn meeting_json(m: Meeting) -> MeetingJson {
    MeetingJson {
        id: m.id,
        parent_meeting_id: m.parent_meeting_id,
        attempt_number: m.attempt_number,
        scheduled_start_at: m.scheduled_start_at,
        scheduled_end_at: m.scheduled_end_at,
        activator_user_id: m.activator_user_id,
        status: m.status,
    }
}

/// Get a pipeline by ID with its meeting chain.
pub async fn get_pipeline(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
) -> Result<PipelineJson, ApiError> {
    let pipeline: Pipeline = pipeline_service::get_pipeline(conn, pipeline_id)
        .await?
        .ok_or(ApiError::NotFound("pipeline"))?;
    let meetings = meeting_service::chain_for_pipeline(conn, pipeline_id).await?;

    Ok(PipelineJson {
        id: pipeline.id,
        crm_lead_id: pipeline.crm_lead_id,
        jcc_user_id: pipeline.jcc_user_id,
        activation_status: pipeline.activation_status,
        kill_reason: pipeline.kill_reason,
        no_show_count: pipeline.no_show_count,
        reschedule_count: pipeline.reschedule_count,
        activated_at: pipeline.activated_at,
        next_followup_at: pipeline.next_followup_at,
        followup_owner_role: pipeline.followup_owner_role,
        meetings: meetings.into_iter().map(meeting_json).collect(),
    })
}

// ── Booking API ──

/// Request body for booking an activation meeting. Creates the pipeline on
/// first booking when only a CRM lead is known.
#[derive(Debug, Deserialize)]
pub struct BookMeetingRequest {
    pub pipeline_id: Option<i64>,
    pub crm_lead_id: Option<String>,
    pub jcc_user_id: Option<String>,
    pub organization_id: Option<Uuid>,
    pub activator_id: i64,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub timezone: String,
    pub sdr_user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BookMeetingResponse {
    pub meeting_id: i64,
    pub pipeline_id: i64,
    pub scheduled_start_at: DateTime<Utc>,
    pub scheduled_end_at: DateTime<Utc>,
}

/// Book a meeting. Re-validates activator availability at booking time;
/// slot output may be stale under concurrent bookings.
pub async fn book_meeting(
    conn: &mut AsyncPgConnection,
    req: BookMeetingRequest,
) -> Result<BookMeetingResponse, ApiError> {
    if crate::timeutil::parse_tz(&req.timezone).is_none() {
        return Err(ApiError::Validation(format!(
            "unknown timezone: {}",
            req.timezone
        )));
    }
    let end = req.end.unwrap_or(req.start + Duration::minutes(30));
    if end <= req.start {
        return Err(ApiError::Validation("end must be after start".to_string()));
    }

    let pipeline = match req.pipeline_id {
        Some(id) => pipeline_service::get_pipeline(conn, id)
            .await?
            .ok_or(ApiError::NotFound("pipeline"))?,
        None => {
            let crm_lead_id = req
                .crm_lead_id
                .clone()
                .ok_or_else(|| ApiError::missing_field("crm_lead_id"))?;
            pipeline_service::create_pipeline(
                conn,
                NewPipeline {
                    organization_id: req.organization_id.unwrap_or_default(),
                    crm_lead_id,
                    jcc_user_id: req.jcc_user_id.clone(),
                    campaign_id: None,
                    owner_sdr_id: req.sdr_user_id,
                    assigned_activator_id: Some(req.activator_id),
                    activation_status: ActivationStatus::Queued.as_str().to_string(),
                },
            )
            .await?
        }
    };

    if pipeline.status().is_terminal() {
        return Err(ApiError::Conflict(TERMINAL_STATE));
    }

    if meeting_service::has_conflict(conn, req.activator_id, req.start, end).await? {
        return Err(ApiError::Conflict("slot_taken"));
    }

    let attempt = meeting_service::chain_for_pipeline(conn, pipeline.id)
        .await?
        .len() as i32
        + 1;

    let meeting = meeting_service::create_meeting(
        conn,
        NewMeeting {
            organization_id: pipeline.organization_id,
            pipeline_id: pipeline.id,
            parent_meeting_id: None,
            attempt_number: attempt,
            scheduled_start_at: req.start,
            scheduled_end_at: end,
            scheduled_timezone: req.timezone,
            activator_user_id: req.activator_id,
            scheduled_by_sdr_user_id: req.sdr_user_id,
            status: status::SCHEDULED.to_string(),
        },
    )
    .await?;

    Ok(BookMeetingResponse {
        meeting_id: meeting.id,
        pipeline_id: pipeline.id,
        scheduled_start_at: meeting.scheduled_start_at,
        scheduled_end_at: meeting.scheduled_end_at,
    })
}

// ── Status API ──

/// Convenience status transition, mirroring a subset of the outcome table.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub pipeline_id: i64,
    pub activation_status: String,
}

pub async fn update_status(
    conn: &mut AsyncPgConnection,
    pipeline_id: i64,
    req: StatusUpdateRequest,
) -> Result<StatusUpdateResponse, ApiError> {
    let target = ActivationStatus::parse(&req.status)
        .ok_or_else(|| ApiError::Validation(format!("unknown status: {}", req.status)))?;
    // Activation only happens through outcome processing or webhook-driven
    // milestone detection, never through the convenience route.
    if target == ActivationStatus::Active {
        return Err(ApiError::Validation(
            "active is set by outcome processing, not direct update".to_string(),
        ));
    }

    let pipeline = pipeline_service::get_pipeline(conn, pipeline_id)
        .await?
        .ok_or(ApiError::NotFound("pipeline"))?;
    if pipeline.status().is_terminal() {
        return Err(ApiError::Conflict(TERMINAL_STATE));
    }

    let now = Utc::now();
    let change = match target {
        ActivationStatus::Killed => PipelineChange {
            activation_status: Some(target.as_str().to_string()),
            kill_reason: Some(Some(req.notes.clone().unwrap_or_else(|| "manual".to_string()))),
            marked_lost_at: Some(now),
            ..Default::default()
        },
        ActivationStatus::Blocked => PipelineChange {
            activation_status: Some(target.as_str().to_string()),
            block_reason: Some(req.notes.clone()),
            ..Default::default()
        },
        ActivationStatus::NoShow => PipelineChange {
            activation_status: Some(target.as_str().to_string()),
            no_show_at: Some(now),
            ..Default::default()
        },
        _ => PipelineChange {
            activation_status: Some(target.as_str().to_string()),
            ..Default::default()
        },
    };

    if !pipeline_service::apply_change(conn, pipeline_id, change).await? {
        return Err(ApiError::Conflict(TERMINAL_STATE));
    }

    outcome_service::record_activation_event(
        conn,
        pipeline_id,
        None,
        &format!("status_{}", target.as_str()),
        None,
        req.notes.map(|n| serde_json::json!({ "notes": n })),
    )
    .await?;

    Ok(StatusUpdateResponse {
        pipeline_id,
        activation_status: target.as_str().to_string(),
    })
}
