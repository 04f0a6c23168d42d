//! act.pipeline — One trial customer's lifecycle from signup to activation or loss.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::act_pipelines;

/// Pipeline activation status. `Active` and `Killed` are terminal: no
/// transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    Queued,
    Blocked,
    NoShow,
    Active,
    Killed,
}

impl ActivationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationStatus::Queued => "queued",
            ActivationStatus::Blocked => "blocked",
            ActivationStatus::NoShow => "no_show",
            ActivationStatus::Active => "active",
            ActivationStatus::Killed => "killed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(ActivationStatus::Queued),
            "blocked" => Some(ActivationStatus::Blocked),
            "no_show" => Some(ActivationStatus::NoShow),
            "active" => Some(ActivationStatus::Active),
            "killed" => Some(ActivationStatus::Killed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActivationStatus::Active | ActivationStatus::Killed)
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = act_pipelines)]
pub struct Pipeline {
    pub id: i64,
    pub organization_id: Uuid,
    pub crm_lead_id: String,
    pub jcc_user_id: Option<String>,
    pub campaign_id: Option<i64>,
    pub owner_sdr_id: Option<i64>,
    pub assigned_activator_id: Option<i64>,
    pub activation_status: String,
    pub kill_reason: Option<String>,
    pub no_show_count: i32,
    pub reschedule_count: i32,
    pub trial_started_at: Option<DateTime<Utc>>,
    pub password_set_at: Option<DateTime<Utc>>,
    pub first_login_at: Option<DateTime<Utc>>,
    pub calculator_modified_at: Option<DateTime<Utc>>,
    pub embed_snippet_copied_at: Option<DateTime<Utc>>,
    pub first_lead_received_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub converted_at: Option<DateTime<Utc>>,
    pub no_show_at: Option<DateTime<Utc>>,
    pub marked_lost_at: Option<DateTime<Utc>>,
    pub calculator_installed_at: Option<DateTime<Utc>>,
    pub install_url: Option<String>,
    pub followup_owner_role: Option<String>,
    pub next_followup_at: Option<DateTime<Utc>>,
    pub next_action: Option<String>,
    pub followup_reason: Option<String>,
    pub block_reason: Option<String>,
    pub block_owner: Option<String>,
    pub next_step: Option<String>,
    pub sdr_first_touch_code: Option<String>,
    pub sdr_last_touch_code: Option<String>,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

impl Pipeline {
    pub fn status(&self) -> ActivationStatus {
        ActivationStatus::parse(&self.activation_status).unwrap_or(ActivationStatus::Queued)
    }

    /// The activation instant this pipeline is due: the later of the two
    /// trigger milestones, once both are set, written at most once.
    /// Independent of activation_status — a pipeline that went active
    /// through a proven install still gets its instant recorded when the
    /// second milestone arrives.
    pub fn pending_activation(&self) -> Option<DateTime<Utc>> {
        if self.activated_at.is_some() {
            return None;
        }
        match (self.calculator_modified_at, self.first_lead_received_at) {
            (Some(modified), Some(lead)) => Some(modified.max(lead)),
            _ => None,
        }
    }
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = act_pipelines)]
pub struct NewPipeline {
    pub organization_id: Uuid,
    pub crm_lead_id: String,
    pub jcc_user_id: Option<String>,
    pub campaign_id: Option<i64>,
    pub owner_sdr_id: Option<i64>,
    pub assigned_activator_id: Option<i64>,
    pub activation_status: String,
}

/// Partial pipeline update. `None` leaves a column untouched; `Some(None)`
/// clears a nullable column. Every write through this changeset goes through
/// the non-terminal guard in pipeline_service.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = act_pipelines)]
pub struct PipelineChange {
    pub activation_status: Option<String>,
    pub kill_reason: Option<Option<String>>,
    pub followup_owner_role: Option<Option<String>>,
    pub next_followup_at: Option<Option<DateTime<Utc>>>,
    pub next_action: Option<Option<String>>,
    pub followup_reason: Option<Option<String>>,
    pub block_reason: Option<Option<String>>,
    pub block_owner: Option<Option<String>>,
    pub next_step: Option<Option<String>>,
    pub calculator_installed_at: Option<DateTime<Utc>>,
    pub install_url: Option<String>,
    pub marked_lost_at: Option<DateTime<Utc>>,
    pub no_show_at: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

impl PipelineChange {
    /// Clear every follow-up field (used when a pipeline activates).
    pub fn clear_followups(mut self) -> Self {
        self.followup_owner_role = Some(None);
        self.next_followup_at = Some(None);
        self.next_action = Some(None);
        self.followup_reason = Some(None);
        self.block_reason = Some(None);
        self.block_owner = Some(None);
        self.next_step = Some(None);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(ActivationStatus::Active.is_terminal());
        assert!(ActivationStatus::Killed.is_terminal());
        assert!(!ActivationStatus::Queued.is_terminal());
        assert!(!ActivationStatus::Blocked.is_terminal());
        assert!(!ActivationStatus::NoShow.is_terminal());
    }

    fn pipeline() -> Pipeline {
        Pipeline {
            id: 1,
            organization_id: Uuid::nil(),
            crm_lead_id: "crm-1".to_string(),
            jcc_user_id: Some("jcc-1".to_string()),
            campaign_id: None,
            owner_sdr_id: None,
            assigned_activator_id: None,
            activation_status: "queued".to_string(),
            kill_reason: None,
            no_show_count: 0,
            reschedule_count: 0,
            trial_started_at: None,
            password_set_at: None,
            first_login_at: None,
            calculator_modified_at: None,
            embed_snippet_copied_at: None,
            first_lead_received_at: None,
            activated_at: None,
            converted_at: None,
            no_show_at: None,
            marked_lost_at: None,
            calculator_installed_at: None,
            install_url: None,
            followup_owner_role: None,
            next_followup_at: None,
            next_action: None,
            followup_reason: None,
            block_reason: None,
            block_owner: None,
            next_step: None,
            sdr_first_touch_code: None,
            sdr_last_touch_code: None,
            active: true,
            create_date: None,
            write_date: None,
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn activation_instant_is_later_milestone_in_either_order() {
        let earlier = ts("2024-06-01T09:00:00Z");
        let later = ts("2024-06-03T15:00:00Z");

        let mut p = pipeline();
        p.calculator_modified_at = Some(earlier);
        p.first_lead_received_at = Some(later);
        assert_eq!(p.pending_activation(), Some(later));

        p.calculator_modified_at = Some(later);
        p.first_lead_received_at = Some(earlier);
        assert_eq!(p.pending_activation(), Some(later));
    }

    #[test]
    fn activation_requires_both_milestones() {
        let mut p = pipeline();
        assert_eq!(p.pending_activation(), None);
        p.calculator_modified_at = Some(ts("2024-06-01T09:00:00Z"));
        assert_eq!(p.pending_activation(), None);
    }

    #[test]
    fn activation_instant_written_at_most_once() {
        let mut p = pipeline();
        p.calculator_modified_at = Some(ts("2024-06-01T09:00:00Z"));
        p.first_lead_received_at = Some(ts("2024-06-03T15:00:00Z"));
        p.activated_at = Some(ts("2024-06-03T15:00:00Z"));
        // A replayed milestone event finds activated_at already set.
        assert_eq!(p.pending_activation(), None);
    }

    #[test]
    fn activation_instant_due_on_already_active_pipeline() {
        // Going active through a proven install does not freeze activated_at;
        // the instant is still recorded once both milestones land.
        let mut p = pipeline();
        p.activation_status = "active".to_string();
        p.calculator_modified_at = Some(ts("2024-06-01T09:00:00Z"));
        p.first_lead_received_at = Some(ts("2024-06-03T15:00:00Z"));
        assert_eq!(p.pending_activation(), Some(ts("2024-06-03T15:00:00Z")));
    }

    #[test]
    fn status_round_trip() {
        for s in ["queued", "blocked", "no_show", "active", "killed"] {
            assert_eq!(ActivationStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(ActivationStatus::parse("paused").is_none());
    }
}
