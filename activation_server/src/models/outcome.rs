//! Structured meeting outcomes.
//!
//! The wire payload is a flat JSON object with an `outcome` discriminator and
//! outcome-specific fields. Validation turns it into a typed union so every
//! downstream branch has its required fields by construction; a missing field
//! is rejected up front, naming the field, before anything is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Raw outcome-completion request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeRequest {
    pub outcome: String,
    pub outcome_notes: Option<String>,
    // installed_proven
    pub install_url: Option<String>,
    pub proof_method: Option<String>,
    pub lead_delivery_methods: Option<Vec<String>>,
    // blocked / partial
    pub block_reason: Option<String>,
    pub block_owner: Option<String>,
    pub next_step: Option<String>,
    pub followup_at: Option<DateTime<Utc>>,
    // rescheduled
    pub new_datetime: Option<DateTime<Utc>>,
    pub new_end_datetime: Option<DateTime<Utc>>,
    pub reschedule_reason: Option<String>,
    // no_show
    pub contact_attempted: Option<Vec<String>>,
    // canceled
    pub canceled_by: Option<String>,
    pub cancel_reason: Option<String>,
    // killed
    pub kill_reason: Option<String>,
}

/// Validated meeting outcome, one variant per `outcome` value.
#[derive(Debug, Clone)]
pub enum MeetingOutcome {
    InstalledProven {
        install_url: String,
        proof_method: String,
        lead_delivery_methods: Vec<String>,
    },
    Blocked {
        block_reason: String,
        block_owner: String,
        next_step: String,
        followup_at: Option<DateTime<Utc>>,
    },
    Partial {
        block_reason: String,
        block_owner: String,
        next_step: String,
        followup_at: Option<DateTime<Utc>>,
    },
    Rescheduled {
        new_start: DateTime<Utc>,
        new_end: Option<DateTime<Utc>>,
        reschedule_reason: String,
    },
    NoShow {
        contact_attempted: Vec<String>,
    },
    Canceled {
        canceled_by: String,
        cancel_reason: String,
    },
    Killed {
        kill_reason: String,
    },
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::missing_field(field))
}

fn require_non_empty(value: Option<Vec<String>>, field: &str) -> Result<Vec<String>, ApiError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::missing_field(field)),
    }
}

fn require_str(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::missing_field(field)),
    }
}

impl MeetingOutcome {
    /// Validate a raw request into a typed outcome. Fails with a
    /// ValidationError naming the first missing field.
    pub fn from_request(req: &OutcomeRequest) -> Result<Self, ApiError> {
        let r = req.clone();
        match req.outcome.as_str() {
            "installed_proven" => Ok(MeetingOutcome::InstalledProven {
                install_url: require_str(r.install_url, "install_url")?,
                proof_method: require_str(r.proof_method, "proof_method")?,
                lead_delivery_methods: require_non_empty(
                    r.lead_delivery_methods,
                    "lead_delivery_methods",
                )?,
            }),
            "blocked" => Ok(MeetingOutcome::Blocked {
                block_reason: require_str(r.block_reason, "block_reason")?,
                block_owner: require_str(r.block_owner, "block_owner")?,
                next_step: require_str(r.next_step, "next_step")?,
                followup_at: r.followup_at,
            }),
            "partial" => Ok(MeetingOutcome::Partial {
                block_reason: require_str(r.block_reason, "block_reason")?,
                block_owner: require_str(r.block_owner, "block_owner")?,
                next_step: require_str(r.next_step, "next_step")?,
                followup_at: r.followup_at,
            }),
            "rescheduled" => Ok(MeetingOutcome::Rescheduled {
                new_start: require(r.new_datetime, "new_datetime")?,
                new_end: r.new_end_datetime,
                reschedule_reason: require_str(r.reschedule_reason, "reschedule_reason")?,
            }),
            "no_show" => Ok(MeetingOutcome::NoShow {
                contact_attempted: require_non_empty(r.contact_attempted, "contact_attempted")?,
            }),
            "canceled" => Ok(MeetingOutcome::Canceled {
                canceled_by: require_str(r.canceled_by, "canceled_by")?,
                cancel_reason: require_str(r.cancel_reason, "cancel_reason")?,
            }),
            "killed" => Ok(MeetingOutcome::Killed {
                kill_reason: require_str(r.kill_reason, "kill_reason")?,
            }),
            other => Err(ApiError::Validation(format!("unknown outcome: {other}"))),
        }
    }

    /// Wire name of the outcome, used for audit events and responses.
    pub fn kind(&self) -> &'static str {
        match self {
            MeetingOutcome::InstalledProven { .. } => "installed_proven",
            MeetingOutcome::Blocked { .. } => "blocked",
            MeetingOutcome::Partial { .. } => "partial",
            MeetingOutcome::Rescheduled { .. } => "rescheduled",
            MeetingOutcome::NoShow { .. } => "no_show",
            MeetingOutcome::Canceled { .. } => "canceled",
            MeetingOutcome::Killed { .. } => "killed",
        }
    }

    /// Terminal meeting status this outcome puts the meeting instance in.
    pub fn meeting_status(&self) -> &'static str {
        use crate::models::meeting::status;
        match self {
            MeetingOutcome::InstalledProven { .. }
            | MeetingOutcome::Blocked { .. }
            | MeetingOutcome::Partial { .. }
            | MeetingOutcome::Killed { .. } => status::COMPLETED,
            MeetingOutcome::Rescheduled { .. } => status::RESCHEDULED,
            MeetingOutcome::NoShow { .. } => status::NO_SHOW,
            MeetingOutcome::Canceled { .. } => status::CANCELED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(outcome: &str) -> OutcomeRequest {
        OutcomeRequest {
            outcome: outcome.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn installed_proven_requires_proof_method() {
        let req = OutcomeRequest {
            install_url: Some("https://example.com/calc".into()),
            lead_delivery_methods: Some(vec!["email".into()]),
            ..base("installed_proven")
        };
        let err = MeetingOutcome::from_request(&req).unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("proof_method")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn installed_proven_rejects_empty_delivery_methods() {
        let req = OutcomeRequest {
            install_url: Some("https://example.com/calc".into()),
            proof_method: Some("screenshot".into()),
            lead_delivery_methods: Some(vec![]),
            ..base("installed_proven")
        };
        let err = MeetingOutcome::from_request(&req).unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("lead_delivery_methods")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn installed_proven_valid() {
        let req = OutcomeRequest {
            install_url: Some("https://example.com/calc".into()),
            proof_method: Some("screenshot".into()),
            lead_delivery_methods: Some(vec!["email".into(), "webhook".into()]),
            ..base("installed_proven")
        };
        let outcome = MeetingOutcome::from_request(&req).unwrap();
        assert_eq!(outcome.kind(), "installed_proven");
        assert_eq!(outcome.meeting_status(), "completed");
    }

    #[test]
    fn rescheduled_requires_new_datetime() {
        let req = OutcomeRequest {
            reschedule_reason: Some("client asked".into()),
            ..base("rescheduled")
        };
        let err = MeetingOutcome::from_request(&req).unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("new_datetime")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn no_show_requires_contact_attempts() {
        let err = MeetingOutcome::from_request(&base("no_show")).unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("contact_attempted")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let req = OutcomeRequest {
            kill_reason: Some("   ".into()),
            ..base("killed")
        };
        assert!(MeetingOutcome::from_request(&req).is_err());
    }

    #[test]
    fn unknown_outcome_rejected() {
        assert!(MeetingOutcome::from_request(&base("ghosted")).is_err());
    }

    #[test]
    fn outcome_statuses() {
        let canceled = MeetingOutcome::Canceled {
            canceled_by: "client".into(),
            cancel_reason: "conflict".into(),
        };
        assert_eq!(canceled.meeting_status(), "canceled");

        let rescheduled = MeetingOutcome::Rescheduled {
            new_start: Utc::now(),
            new_end: None,
            reschedule_reason: "travel".into(),
        };
        assert_eq!(rescheduled.meeting_status(), "rescheduled");
    }
}
