//! Activation server HTTP routes — slot query, booking, outcomes, webhook.

pub mod api;
pub mod webhook;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, patch, post};
use axum::Router;
use chrono::NaiveDate;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::AsyncPgConnection;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::config::ActivationConfig;
use crate::error::ApiError;
use crate::models::outcome::OutcomeRequest;
use crate::services::event_service::IngestResult;
use crate::services::notify::Notifier;
use crate::services::outcome_service::{self, OutcomeResult};
use crate::services::slot_service::{self, SlotsResponse};

pub type DbPool = Pool<AsyncPgConnection>;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: ActivationConfig,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    async fn conn(
        &self,
    ) -> Result<diesel_async::pooled_connection::deadpool::Object<AsyncPgConnection>, ApiError>
    {
        self.pool
            .get()
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("db pool: {e}")))
    }
}

/// Build the activation server's axum router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        // Availability
        .route("/api/slots", get(slots_handler))
        // Meetings
        .route("/api/meetings", post(book_meeting_handler))
        .route("/api/meetings/{meeting_id}/outcome", post(outcome_handler))
        // Pipelines
        .route("/api/pipelines/{pipeline_id}", get(get_pipeline_handler))
        .route(
            "/api/pipelines/{pipeline_id}/status",
            patch(status_handler),
        )
        .route("/api/pipelines/stale_blocked", get(stale_blocked_handler))
        // Lifecycle webhook
        .route("/webhook/lifecycle", post(webhook_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Availability ──

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub timezone: Option<String>,
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, ApiError> {
    let raw = value.ok_or_else(|| ApiError::missing_field(field))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("malformed {field}: {raw}")))
}

async fn slots_handler(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let start = parse_date(query.start_date.as_deref(), "startDate")?;
    let end = parse_date(query.end_date.as_deref(), "endDate")?;
    if end < start {
        return Err(ApiError::Validation("endDate before startDate".to_string()));
    }
    let tz_name = query.timezone.as_deref().unwrap_or("UTC");
    let viewer_tz = crate::timeutil::parse_tz(tz_name)
        .ok_or_else(|| ApiError::Validation(format!("unknown timezone: {tz_name}")))?;

    let mut conn = state.conn().await?;
    let response = slot_service::generate_slots(&mut conn, &state.config, start, end, viewer_tz)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(response))
}

// ── Meetings ──

async fn book_meeting_handler(
    State(state): State<AppState>,
    Json(req): Json<api::BookMeetingRequest>,
) -> Result<(StatusCode, Json<api::BookMeetingResponse>), ApiError> {
    let mut conn = state.conn().await?;
    let response = api::book_meeting(&mut conn, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn outcome_handler(
    State(state): State<AppState>,
    Path(meeting_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<OutcomeRequest>,
) -> Result<Json<OutcomeResult>, ApiError> {
    let actor_user_id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());

    let mut conn = state.conn().await?;
    let result = outcome_service::complete_meeting(
        &mut conn,
        &state.config,
        state.notifier.as_ref(),
        meeting_id,
        &req,
        actor_user_id,
    )
    .await?;
    Ok(Json(result))
}

// ── Pipelines ──

async fn get_pipeline_handler(
    State(state): State<AppState>,
    Path(pipeline_id): Path<i64>,
) -> Result<Json<api::PipelineJson>, ApiError> {
    let mut conn = state.conn().await?;
    let pipeline = api::get_pipeline(&mut conn, pipeline_id).await?;
    Ok(Json(pipeline))
}

async fn status_handler(
    State(state): State<AppState>,
    Path(pipeline_id): Path<i64>,
    Json(req): Json<api::StatusUpdateRequest>,
) -> Result<Json<api::StatusUpdateResponse>, ApiError> {
    let mut conn = state.conn().await?;
    let response = api::update_status(&mut conn, pipeline_id, req).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct StaleBlockedQuery {
    pub days: Option<i64>,
}

async fn stale_blocked_handler(
    State(state): State<AppState>,
    Query(query): Query<StaleBlockedQuery>,
) -> Result<Json<Vec<i64>>, ApiError> {
    let days = query.days.unwrap_or(state.config.blocked_stale_days);
    let older_than = chrono::Utc::now() - chrono::Duration::days(days);

    let mut conn = state.conn().await?;
    let ids = crate::services::pipeline_service::list_stale_blocked(&mut conn, older_than)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(ids))
}

// ── Webhook ──

async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<webhook::LifecycleWebhook>,
) -> Result<Json<IngestResult>, ApiError> {
    let mut conn = state.conn().await?;
    let result = webhook::handle_webhook(&state.config, &mut conn, &headers, body).await?;
    Ok(Json(result))
}
