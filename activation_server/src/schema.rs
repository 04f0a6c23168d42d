//! Diesel table definitions for the activation pipeline server.
//!
//! Tables: act_pipelines, act_meetings, act_client_events,
//! act_activation_events, act_credits, act_bonus_rules, act_activators,
//! act_shifts. All tables include organization_id for multi-tenancy.

diesel::table! {
    act_activators (id) {
        id -> Int8,
        organization_id -> Uuid,
        display_name -> Varchar,
        meeting_link -> Nullable<Varchar>,
        accepts_meetings -> Bool,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    act_shifts (id) {
        id -> Int8,
        organization_id -> Uuid,
        activator_id -> Int8,
        day_of_week -> Int4,
        start_time -> Time,
        end_time -> Time,
        timezone -> Varchar,
        meeting_duration_minutes -> Int4,
        buffer_before_minutes -> Int4,
        buffer_after_minutes -> Int4,
        max_meetings_per_day -> Int4,
        min_notice_hours -> Int4,
        booking_window_days -> Int4,
        is_active -> Bool,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    act_pipelines (id) {
        id -> Int8,
        organization_id -> Uuid,
        crm_lead_id -> Varchar,
        jcc_user_id -> Nullable<Varchar>,
        campaign_id -> Nullable<Int8>,
        owner_sdr_id -> Nullable<Int8>,
        assigned_activator_id -> Nullable<Int8>,
        activation_status -> Varchar,
        kill_reason -> Nullable<Varchar>,
        no_show_count -> Int4,
        reschedule_count -> Int4,
        trial_started_at -> Nullable<Timestamptz>,
        password_set_at -> Nullable<Timestamptz>,
        first_login_at -> Nullable<Timestamptz>,
        calculator_modified_at -> Nullable<Timestamptz>,
        embed_snippet_copied_at -> Nullable<Timestamptz>,
        first_lead_received_at -> Nullable<Timestamptz>,
        activated_at -> Nullable<Timestamptz>,
        converted_at -> Nullable<Timestamptz>,
        no_show_at -> Nullable<Timestamptz>,
        marked_lost_at -> Nullable<Timestamptz>,
        calculator_installed_at -> Nullable<Timestamptz>,
        install_url -> Nullable<Varchar>,
        followup_owner_role -> Nullable<Varchar>,
        next_followup_at -> Nullable<Timestamptz>,
        next_action -> Nullable<Varchar>,
        followup_reason -> Nullable<Varchar>,
        block_reason -> Nullable<Varchar>,
        block_owner -> Nullable<Varchar>,
        next_step -> Nullable<Varchar>,
        sdr_first_touch_code -> Nullable<Varchar>,
        sdr_last_touch_code -> Nullable<Varchar>,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    act_meetings (id) {
        id -> Int8,
        organization_id -> Uuid,
        pipeline_id -> Int8,
        parent_meeting_id -> Nullable<Int8>,
        attempt_number -> Int4,
        scheduled_start_at -> Timestamptz,
        scheduled_end_at -> Timestamptz,
        scheduled_timezone -> Varchar,
        activator_user_id -> Int8,
        scheduled_by_sdr_user_id -> Nullable<Int8>,
        status -> Varchar,
        outcome_notes -> Nullable<Text>,
        proof_method -> Nullable<Varchar>,
        install_url -> Nullable<Varchar>,
        block_reason -> Nullable<Varchar>,
        cancel_reason -> Nullable<Varchar>,
        canceled_by -> Nullable<Varchar>,
        reschedule_reason -> Nullable<Varchar>,
        contact_attempted -> Nullable<Jsonb>,
        lead_delivery_methods -> Nullable<Jsonb>,
        kill_reason -> Nullable<Varchar>,
        completed_at -> Nullable<Timestamptz>,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    act_client_events (id) {
        id -> Int8,
        jcc_user_id -> Varchar,
        event_type -> Varchar,
        payload -> Nullable<Jsonb>,
        processed -> Bool,
        processed_at -> Nullable<Timestamptz>,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    act_activation_events (id) {
        id -> Int8,
        organization_id -> Uuid,
        pipeline_id -> Int8,
        meeting_id -> Nullable<Int8>,
        event_type -> Varchar,
        actor_user_id -> Nullable<Int8>,
        metadata -> Nullable<Jsonb>,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    act_credits (id) {
        id -> Int8,
        organization_id -> Uuid,
        campaign_id -> Int8,
        member_user_id -> Int8,
        member_role -> Varchar,
        event_type -> Varchar,
        jcc_user_id -> Varchar,
        amount_cents -> Int8,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    act_bonus_rules (id) {
        id -> Int8,
        organization_id -> Uuid,
        campaign_id -> Int8,
        role -> Varchar,
        event_type -> Varchar,
        amount_cents -> Int8,
        active -> Bool,
        create_date -> Nullable<Timestamptz>,
        write_date -> Nullable<Timestamptz>,
    }
}

// Foreign key relationships
diesel::joinable!(act_shifts -> act_activators (activator_id));
diesel::joinable!(act_meetings -> act_pipelines (pipeline_id));
diesel::joinable!(act_meetings -> act_activators (activator_user_id));
diesel::joinable!(act_activation_events -> act_pipelines (pipeline_id));

diesel::allow_tables_to_appear_in_same_query!(
    act_activators,
    act_shifts,
    act_pipelines,
    act_meetings,
    act_client_events,
    act_activation_events,
    act_credits,
    act_bonus_rules,
);
