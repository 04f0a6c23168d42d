//! act.shift — A weekly availability window owned by one activator.
//!
//! Local wall-clock times within a single calendar day; midnight-crossing
//! shifts are not representable and must be split in two.

use chrono::{DateTime, NaiveTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::act_shifts;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = act_shifts)]
pub struct Shift {
    pub id: i64,
    pub organization_id: Uuid,
    pub activator_id: i64,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub meeting_duration_minutes: i32,
    pub buffer_before_minutes: i32,
    pub buffer_after_minutes: i32,
    pub max_meetings_per_day: i32,
    pub min_notice_hours: i32,
    pub booking_window_days: i32,
    pub is_active: bool,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

impl Shift {
    /// Misconfigured shifts are never generated from: end at or before
    /// start, a non-positive meeting duration, or negative buffers. A zero
    /// step would stall the slot walk, so these rows are degenerate input.
    pub fn is_well_formed(&self) -> bool {
        self.end_time > self.start_time
            && self.meeting_duration_minutes > 0
            && self.buffer_before_minutes >= 0
            && self.buffer_after_minutes >= 0
    }
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = act_shifts)]
pub struct NewShift {
    pub organization_id: Uuid,
    pub activator_id: i64,
    pub day_of_week: i32,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub meeting_duration_minutes: i32,
    pub buffer_before_minutes: i32,
    pub buffer_after_minutes: i32,
    pub max_meetings_per_day: i32,
    pub min_notice_hours: i32,
    pub booking_window_days: i32,
    pub is_active: bool,
}
