//! SQL migration for the activation pipeline tables.

use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};

/// Creates all activation pipeline tables with organization_id for tenancy.
pub const MIGRATION_SQL: &str = r#"
-- ================================================================
-- Activation Pipeline Tables
-- ================================================================

CREATE TABLE IF NOT EXISTS act_activators (
    id               BIGSERIAL PRIMARY KEY,
    organization_id  UUID NOT NULL DEFAULT '00000000-0000-0000-0000-000000000001',
    display_name     VARCHAR(255) NOT NULL,
    meeting_link     VARCHAR(512),
    accepts_meetings BOOLEAN NOT NULL DEFAULT TRUE,
    active           BOOLEAN NOT NULL DEFAULT TRUE,
    create_date      TIMESTAMPTZ DEFAULT NOW(),
    write_date       TIMESTAMPTZ DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS act_shifts (
    id                       BIGSERIAL PRIMARY KEY,
    organization_id          UUID NOT NULL DEFAULT '00000000-0000-0000-0000-000000000001',
    activator_id             BIGINT NOT NULL REFERENCES act_activators(id) ON DELETE CASCADE,
    day_of_week              INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
    start_time               TIME NOT NULL,
    end_time                 TIME NOT NULL,
    timezone                 VARCHAR(64) NOT NULL,
    meeting_duration_minutes INTEGER NOT NULL DEFAULT 30 CHECK (meeting_duration_minutes > 0),
    buffer_before_minutes    INTEGER NOT NULL DEFAULT 0 CHECK (buffer_before_minutes >= 0),
    buffer_after_minutes     INTEGER NOT NULL DEFAULT 0 CHECK (buffer_after_minutes >= 0),
    max_meetings_per_day     INTEGER NOT NULL DEFAULT 8,
    min_notice_hours         INTEGER NOT NULL DEFAULT 2,
    booking_window_days      INTEGER NOT NULL DEFAULT 14,
    is_active                BOOLEAN NOT NULL DEFAULT TRUE,
    active                   BOOLEAN NOT NULL DEFAULT TRUE,
    create_date              TIMESTAMPTZ DEFAULT NOW(),
    write_date               TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_act_shifts_activator ON act_shifts (activator_id);

CREATE TABLE IF NOT EXISTS act_pipelines (
    id                      BIGSERIAL PRIMARY KEY,
    organization_id         UUID NOT NULL DEFAULT '00000000-0000-0000-0000-000000000001',
    crm_lead_id             VARCHAR(64) NOT NULL,
    jcc_user_id             VARCHAR(64),
    campaign_id             BIGINT,
    owner_sdr_id            BIGINT,
    assigned_activator_id   BIGINT,
    activation_status       VARCHAR(32) NOT NULL DEFAULT 'queued',
    kill_reason             VARCHAR(64),
    no_show_count           INTEGER NOT NULL DEFAULT 0,
    reschedule_count        INTEGER NOT NULL DEFAULT 0,
    trial_started_at        TIMESTAMPTZ,
    password_set_at         TIMESTAMPTZ,
    first_login_at          TIMESTAMPTZ,
    calculator_modified_at  TIMESTAMPTZ,
    embed_snippet_copied_at TIMESTAMPTZ,
    first_lead_received_at  TIMESTAMPTZ,
    activated_at            TIMESTAMPTZ,
    converted_at            TIMESTAMPTZ,
    no_show_at              TIMESTAMPTZ,
    marked_lost_at          TIMESTAMPTZ,
    calculator_installed_at TIMESTAMPTZ,
    install_url             VARCHAR(512),
    followup_owner_role     VARCHAR(32),
    next_followup_at        TIMESTAMPTZ,
    next_action             VARCHAR(128),
    followup_reason         VARCHAR(255),
    block_reason            VARCHAR(255),
    block_owner             VARCHAR(64),
    next_step               VARCHAR(255),
    sdr_first_touch_code    VARCHAR(64),
    sdr_last_touch_code     VARCHAR(64),
    active                  BOOLEAN NOT NULL DEFAULT TRUE,
    create_date             TIMESTAMPTZ DEFAULT NOW(),
    write_date              TIMESTAMPTZ DEFAULT NOW()
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_act_pipelines_jcc_user
    ON act_pipelines (jcc_user_id) WHERE jcc_user_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_act_pipelines_status ON act_pipelines (activation_status);

CREATE TABLE IF NOT EXISTS act_meetings (
    id                      BIGSERIAL PRIMARY KEY,
    organization_id         UUID NOT NULL DEFAULT '00000000-0000-0000-0000-000000000001',
    pipeline_id             BIGINT NOT NULL REFERENCES act_pipelines(id) ON DELETE CASCADE,
    parent_meeting_id       BIGINT REFERENCES act_meetings(id),
    attempt_number          INTEGER NOT NULL DEFAULT 1,
    scheduled_start_at      TIMESTAMPTZ NOT NULL,
    scheduled_end_at        TIMESTAMPTZ NOT NULL,
    scheduled_timezone      VARCHAR(64) NOT NULL,
    activator_user_id       BIGINT NOT NULL REFERENCES act_activators(id),
    scheduled_by_sdr_user_id BIGINT,
    status                  VARCHAR(32) NOT NULL DEFAULT 'scheduled',
    outcome_notes           TEXT,
    proof_method            VARCHAR(64),
    install_url             VARCHAR(512),
    block_reason            VARCHAR(255),
    cancel_reason           VARCHAR(255),
    canceled_by             VARCHAR(64),
    reschedule_reason       VARCHAR(255),
    contact_attempted       JSONB,
    lead_delivery_methods   JSONB,
    kill_reason             VARCHAR(64),
    completed_at            TIMESTAMPTZ,
    active                  BOOLEAN NOT NULL DEFAULT TRUE,
    create_date             TIMESTAMPTZ DEFAULT NOW(),
    write_date              TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_act_meetings_pipeline ON act_meetings (pipeline_id);
CREATE INDEX IF NOT EXISTS idx_act_meetings_activator_start
    ON act_meetings (activator_user_id, scheduled_start_at) WHERE status = 'scheduled';

CREATE TABLE IF NOT EXISTS act_client_events (
    id           BIGSERIAL PRIMARY KEY,
    jcc_user_id  VARCHAR(64) NOT NULL,
    event_type   VARCHAR(64) NOT NULL,
    payload      JSONB,
    processed    BOOLEAN NOT NULL DEFAULT FALSE,
    processed_at TIMESTAMPTZ,
    active       BOOLEAN NOT NULL DEFAULT TRUE,
    create_date  TIMESTAMPTZ DEFAULT NOW(),
    write_date   TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_act_client_events_user ON act_client_events (jcc_user_id);
CREATE INDEX IF NOT EXISTS idx_act_client_events_unprocessed
    ON act_client_events (id) WHERE NOT processed;

CREATE TABLE IF NOT EXISTS act_activation_events (
    id              BIGSERIAL PRIMARY KEY,
    organization_id UUID NOT NULL DEFAULT '00000000-0000-0000-0000-000000000001',
    pipeline_id     BIGINT NOT NULL REFERENCES act_pipelines(id) ON DELETE CASCADE,
    meeting_id      BIGINT REFERENCES act_meetings(id),
    event_type      VARCHAR(64) NOT NULL,
    actor_user_id   BIGINT,
    metadata        JSONB,
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_act_activation_events_pipeline
    ON act_activation_events (pipeline_id);

CREATE TABLE IF NOT EXISTS act_credits (
    id              BIGSERIAL PRIMARY KEY,
    organization_id UUID NOT NULL DEFAULT '00000000-0000-0000-0000-000000000001',
    campaign_id     BIGINT NOT NULL,
    member_user_id  BIGINT NOT NULL,
    member_role     VARCHAR(32) NOT NULL,
    event_type      VARCHAR(64) NOT NULL,
    jcc_user_id     VARCHAR(64) NOT NULL,
    amount_cents    BIGINT NOT NULL,
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_date      TIMESTAMPTZ DEFAULT NOW(),
    CONSTRAINT uq_act_credits_award UNIQUE (campaign_id, member_user_id, event_type, jcc_user_id)
);

CREATE TABLE IF NOT EXISTS act_bonus_rules (
    id              BIGSERIAL PRIMARY KEY,
    organization_id UUID NOT NULL DEFAULT '00000000-0000-0000-0000-000000000001',
    campaign_id     BIGINT NOT NULL,
    role            VARCHAR(32) NOT NULL,
    event_type      VARCHAR(64) NOT NULL,
    amount_cents    BIGINT NOT NULL,
    active          BOOLEAN NOT NULL DEFAULT TRUE,
    create_date     TIMESTAMPTZ DEFAULT NOW(),
    write_date      TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_act_bonus_rules_campaign
    ON act_bonus_rules (campaign_id, event_type);
"#;

/// Run the activation pipeline migration.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL)
        .await
        .map_err(|e| anyhow::anyhow!("activation migration failed: {e}"))?;
    Ok(())
}
