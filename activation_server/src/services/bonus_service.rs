//! Bonus credit awarding, idempotency-guarded by the unique constraint on
//! (campaign, member, event_type, external user). A duplicate award from a
//! redelivered event inserts zero rows and is treated as success.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::credit::{BonusRule, NewCredit};
use crate::models::pipeline::Pipeline;
use crate::schema::{act_bonus_rules, act_credits};

/// Award bonuses for one triggering event per the campaign's rule table.
/// One credit per eligible team member; already-awarded members are skipped
/// by the conflict guard.
pub async fn award_bonuses(
    conn: &mut AsyncPgConnection,
    campaign_id: i64,
    event_type: &str,
    jcc_user_id: &str,
    pipeline: &Pipeline,
) -> anyhow::Result<usize> {
    let rules: Vec<BonusRule> = act_bonus_rules::table
        .filter(act_bonus_rules::campaign_id.eq(campaign_id))
        .filter(act_bonus_rules::event_type.eq(event_type))
        .filter(act_bonus_rules::active.eq(true))
        .load(conn)
        .await?;

    let mut awarded = 0;
    for rule in &rules {
        let member_user_id = match rule.role.as_str() {
            "sdr" => pipeline.owner_sdr_id,
            "activator" => pipeline.assigned_activator_id,
            other => {
                tracing::warn!(rule_id = rule.id, role = other, "Unknown bonus rule role");
                None
            }
        };
        let member_user_id = match member_user_id {
            Some(id) => id,
            None => continue,
        };

        let inserted = diesel::insert_into(act_credits::table)
            .values(&NewCredit {
                organization_id: pipeline.organization_id,
                campaign_id,
                member_user_id,
                member_role: rule.role.clone(),
                event_type: event_type.to_string(),
                jcc_user_id: jcc_user_id.to_string(),
                amount_cents: rule.amount_cents,
            })
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;

        if inserted > 0 {
            awarded += 1;
            crate::metrics::bonus_awarded(&rule.role);
            tracing::info!(
                campaign_id,
                member_user_id,
                role = %rule.role,
                amount_cents = rule.amount_cents,
                "Bonus credit awarded"
            );
        }
    }

    Ok(awarded)
}
