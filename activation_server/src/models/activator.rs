//! act.activator — Narrow directory slice of the users who run activation
//! meetings. The wider user directory is owned elsewhere.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::act_activators;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = act_activators)]
pub struct Activator {
    pub id: i64,
    pub organization_id: Uuid,
    pub display_name: String,
    pub meeting_link: Option<String>,
    pub accepts_meetings: bool,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = act_activators)]
pub struct NewActivator {
    pub organization_id: Uuid,
    pub display_name: String,
    pub meeting_link: Option<String>,
    pub accepts_meetings: bool,
}
