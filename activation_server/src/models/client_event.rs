//! act.client.event — Append-only log of externally reported lifecycle
//! events. Rows are never mutated or deleted; `processed` flips false→true
//! exactly once.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::act_client_events;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = act_client_events)]
pub struct ClientEvent {
    pub id: i64,
    pub jcc_user_id: String,
    pub event_type: String,
    pub payload: Option<serde_json::Value>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = act_client_events)]
pub struct NewClientEvent {
    pub jcc_user_id: String,
    pub event_type: String,
    pub payload: Option<serde_json::Value>,
    pub processed: bool,
}
