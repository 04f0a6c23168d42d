//! act.credit + act.bonus.rule — Bonus payouts and the per-campaign rule
//! table that drives them. Payouts are idempotency-guarded by a unique
//! constraint on (campaign, member, event_type, external user).

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{act_bonus_rules, act_credits};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = act_credits)]
pub struct Credit {
    pub id: i64,
    pub organization_id: Uuid,
    pub campaign_id: i64,
    pub member_user_id: i64,
    pub member_role: String,
    pub event_type: String,
    pub jcc_user_id: String,
    pub amount_cents: i64,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = act_credits)]
pub struct NewCredit {
    pub organization_id: Uuid,
    pub campaign_id: i64,
    pub member_user_id: i64,
    pub member_role: String,
    pub event_type: String,
    pub jcc_user_id: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = act_bonus_rules)]
pub struct BonusRule {
    pub id: i64,
    pub organization_id: Uuid,
    pub campaign_id: i64,
    pub role: String,
    pub event_type: String,
    pub amount_cents: i64,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}
