//! Lifecycle event types and the pure event → field-update mapping.
//!
//! `derive_updates` is deterministic and side-effect free: it turns an event
//! type plus payload into the attribution and pipeline writes the ingestor
//! should apply. Milestone writes are null-guarded at the store, so replaying
//! an event is a no-op on fields that are already set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timeutil;

/// External product lifecycle events. Wire names are snake_case; two
/// deprecated aliases are still accepted from older senders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventType {
    TrialStarted,
    PasswordSet,
    FirstLogin,
    CalculatorViewed,
    CalculatorModified,
    EmbedSnippetCopied,
    FirstLeadReceived,
    TrialQualified,
    CreditsLow,
    CreditsFirstUsed,
    TrialExpiring,
    PaidSubscribed,
}

impl LifecycleEventType {
    pub fn parse(s: &str) -> Option<Self> {
        use LifecycleEventType::*;
        match s {
            "trial_started" => Some(TrialStarted),
            "password_set" => Some(PasswordSet),
            "first_login" => Some(FirstLogin),
            "calculator_viewed" => Some(CalculatorViewed),
            "calculator_modified" => Some(CalculatorModified),
            "embed_snippet_copied" => Some(EmbedSnippetCopied),
            "first_lead_received" => Some(FirstLeadReceived),
            "trial_qualified" => Some(TrialQualified),
            "credits_low" => Some(CreditsLow),
            "credits_first_used" => Some(CreditsFirstUsed),
            "trial_expiring" => Some(TrialExpiring),
            "paid_subscribed" => Some(PaidSubscribed),
            // Deprecated aliases still sent by older webhook versions.
            "trial_activated" => Some(CalculatorModified),
            "snippet_installed" => Some(EmbedSnippetCopied),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use LifecycleEventType::*;
        match self {
            TrialStarted => "trial_started",
            PasswordSet => "password_set",
            FirstLogin => "first_login",
            CalculatorViewed => "calculator_viewed",
            CalculatorModified => "calculator_modified",
            EmbedSnippetCopied => "embed_snippet_copied",
            FirstLeadReceived => "first_lead_received",
            TrialQualified => "trial_qualified",
            CreditsLow => "credits_low",
            CreditsFirstUsed => "credits_first_used",
            TrialExpiring => "trial_expiring",
            PaidSubscribed => "paid_subscribed",
        }
    }

    /// Events whose milestone participates in the activation invariant.
    pub fn is_activation_trigger(&self) -> bool {
        matches!(
            self,
            LifecycleEventType::CalculatorModified | LifecycleEventType::FirstLeadReceived
        )
    }

    /// Events that trigger bonus awarding.
    pub fn triggers_bonus(&self) -> bool {
        matches!(self, LifecycleEventType::CreditsFirstUsed)
    }
}

/// Which milestone timestamp column an event sets (first-write-wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    TrialStarted,
    PasswordSet,
    FirstLogin,
    CalculatorModified,
    EmbedSnippetCopied,
    FirstLeadReceived,
    Converted,
}

/// Follow-up scheduling derived from an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowupUpdate {
    pub owner_role: &'static str,
    pub next_action: &'static str,
    pub due_at: DateTime<Utc>,
}

/// Pipeline-side writes derived from one event.
#[derive(Debug, Clone, Default)]
pub struct PipelineUpdate {
    pub milestone: Option<Milestone>,
    pub followup: Option<FollowupUpdate>,
}

/// Attribution writes derived from one event. First-touch is applied only
/// when no prior value exists; last-touch always overwrites.
#[derive(Debug, Clone, Default)]
pub struct AttributionUpdate {
    pub touch_code: Option<String>,
}

/// Map an event to its field updates. Pure; the caller applies them.
pub fn derive_updates(
    event_type: LifecycleEventType,
    payload: Option<&serde_json::Value>,
    now: DateTime<Utc>,
) -> (AttributionUpdate, PipelineUpdate) {
    use LifecycleEventType::*;

    let touch_code = payload
        .and_then(|p| p.get("touch_code"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let milestone = match event_type {
        TrialStarted => Some(Milestone::TrialStarted),
        PasswordSet => Some(Milestone::PasswordSet),
        FirstLogin => Some(Milestone::FirstLogin),
        CalculatorModified => Some(Milestone::CalculatorModified),
        EmbedSnippetCopied => Some(Milestone::EmbedSnippetCopied),
        FirstLeadReceived => Some(Milestone::FirstLeadReceived),
        PaidSubscribed => Some(Milestone::Converted),
        CalculatorViewed | TrialQualified | CreditsLow | CreditsFirstUsed | TrialExpiring => None,
    };

    let followup = match event_type {
        CreditsLow => Some(FollowupUpdate {
            owner_role: "sdr",
            next_action: "credits_low_outreach",
            due_at: timeutil::add_business_days(now, 1),
        }),
        TrialExpiring => Some(FollowupUpdate {
            owner_role: "sdr",
            next_action: "trial_expiring_outreach",
            due_at: timeutil::add_business_days(now, 1),
        }),
        _ => None,
    };

    (
        AttributionUpdate { touch_code },
        PipelineUpdate { milestone, followup },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_wire_names() {
        for s in [
            "trial_started",
            "password_set",
            "first_login",
            "calculator_viewed",
            "calculator_modified",
            "embed_snippet_copied",
            "first_lead_received",
            "trial_qualified",
            "credits_low",
            "credits_first_used",
            "trial_expiring",
            "paid_subscribed",
        ] {
            let parsed = LifecycleEventType::parse(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn deprecated_aliases_map_to_canonical_types() {
        assert_eq!(
            LifecycleEventType::parse("trial_activated"),
            Some(LifecycleEventType::CalculatorModified)
        );
        assert_eq!(
            LifecycleEventType::parse("snippet_installed"),
            Some(LifecycleEventType::EmbedSnippetCopied)
        );
        assert!(LifecycleEventType::parse("made_coffee").is_none());
    }

    #[test]
    fn activation_triggers() {
        assert!(LifecycleEventType::CalculatorModified.is_activation_trigger());
        assert!(LifecycleEventType::FirstLeadReceived.is_activation_trigger());
        assert!(!LifecycleEventType::TrialStarted.is_activation_trigger());
    }

    #[test]
    fn milestone_mapping() {
        let now = Utc::now();
        let (_, update) = derive_updates(LifecycleEventType::PaidSubscribed, None, now);
        assert_eq!(update.milestone, Some(Milestone::Converted));
        assert!(update.followup.is_none());

        let (_, update) = derive_updates(LifecycleEventType::CalculatorViewed, None, now);
        assert!(update.milestone.is_none());
    }

    #[test]
    fn credits_low_schedules_sdr_followup() {
        let now = Utc::now();
        let (_, update) = derive_updates(LifecycleEventType::CreditsLow, None, now);
        let followup = update.followup.unwrap();
        assert_eq!(followup.owner_role, "sdr");
        assert_eq!(followup.next_action, "credits_low_outreach");
    }

    #[test]
    fn touch_code_extracted_from_payload() {
        let payload = serde_json::json!({ "touch_code": "SDR-42" });
        let (attribution, _) =
            derive_updates(LifecycleEventType::TrialStarted, Some(&payload), Utc::now());
        assert_eq!(attribution.touch_code.as_deref(), Some("SDR-42"));
    }
}
