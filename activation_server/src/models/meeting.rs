//! act.meeting — An activation meeting. Reschedules create a new row linked
//! via parent_meeting_id; a meeting instance is never mutated back to
//! `scheduled` once it reaches a terminal status.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::act_meetings;

/// Meeting status. `scheduled` is the only non-terminal state.
pub mod status {
    pub const SCHEDULED: &str = "scheduled";
    pub const COMPLETED: &str = "completed";
    pub const NO_SHOW: &str = "no_show";
    pub const CANCELED: &str = "canceled";
    pub const RESCHEDULED: &str = "rescheduled";
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = act_meetings)]
pub struct Meeting {
    pub id: i64,
    pub organization_id: Uuid,
    pub pipeline_id: i64,
    pub parent_meeting_id: Option<i64>,
    pub attempt_number: i32,
    pub scheduled_start_at: DateTime<Utc>,
    pub scheduled_end_at: DateTime<Utc>,
    pub scheduled_timezone: String,
    pub activator_user_id: i64,
    pub scheduled_by_sdr_user_id: Option<i64>,
    pub status: String,
    pub outcome_notes: Option<String>,
    pub proof_method: Option<String>,
    pub install_url: Option<String>,
    pub block_reason: Option<String>,
    pub cancel_reason: Option<String>,
    pub canceled_by: Option<String>,
    pub reschedule_reason: Option<String>,
    pub contact_attempted: Option<serde_json::Value>,
    pub lead_delivery_methods: Option<serde_json::Value>,
    pub kill_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = act_meetings)]
pub struct NewMeeting {
    pub organization_id: Uuid,
    pub pipeline_id: i64,
    pub parent_meeting_id: Option<i64>,
    pub attempt_number: i32,
    pub scheduled_start_at: DateTime<Utc>,
    pub scheduled_end_at: DateTime<Utc>,
    pub scheduled_timezone: String,
    pub activator_user_id: i64,
    pub scheduled_by_sdr_user_id: Option<i64>,
    pub status: String,
}
