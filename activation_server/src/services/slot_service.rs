//! Bookable-slot generation across activators, shifts, and timezones.
//!
//! The day-walk itself is a pure function over already-loaded rows
//! (`compute_slots`), so the math is unit-testable without a database.
//! `generate_slots` is the thin loading wrapper the route calls. Generation
//! runs unsynchronized against concurrent bookings; booking re-validates
//! conflicts before inserting a meeting.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::config::ActivationConfig;
use crate::models::activator::Activator;
use crate::models::meeting::Meeting;
use crate::models::shift::Shift;
use crate::schema::{act_activators, act_shifts};
use crate::services::meeting_service;
use crate::timeutil;

/// One bookable meeting window. Wire names are camelCase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub activator_id: i64,
    pub activator_name: String,
    pub meeting_link: Option<String>,
    /// Calendar date of the slot in the viewer's timezone, for day grouping.
    pub viewer_date: NaiveDate,
}

/// Compute bookable slots for a date range. Pure over its inputs.
///
/// The requested end date is clamped to `now` plus the smallest
/// `booking_window_days` across active shifts (capped at `cap_days`) — the
/// most conservative configured window wins.
#[allow(clippy::too_many_arguments)]
pub fn compute_slots(
    range_start: NaiveDate,
    range_end: NaiveDate,
    viewer_tz: Tz,
    now: DateTime<Utc>,
    cap_days: i64,
    activators: &[Activator],
    shifts: &[Shift],
    scheduled: &[Meeting],
) -> Vec<Slot> {
    let usable: Vec<&Shift> = shifts
        .iter()
        .filter(|s| s.is_active && s.is_well_formed())
        .collect();
    if usable.is_empty() || activators.is_empty() {
        return Vec::new();
    }

    let window_days = usable
        .iter()
        .map(|s| s.booking_window_days as i64)
        .min()
        .unwrap_or(cap_days)
        .min(cap_days);
    let horizon_date = (now + Duration::days(window_days)).date_naive();
    let end = range_end.min(horizon_date);

    let mut slots = Vec::new();
    let mut day = range_start;
    while day <= end {
        for activator in activators {
            let day_shifts = usable
                .iter()
                .filter(|s| s.activator_id == activator.id)
                .filter(|s| s.day_of_week as u32 == day.weekday().num_days_from_sunday());

            for shift in day_shifts {
                let tz = match timeutil::parse_tz(&shift.timezone) {
                    Some(tz) => tz,
                    None => {
                        tracing::warn!(shift_id = shift.id, tz = %shift.timezone, "Unknown shift timezone");
                        continue;
                    }
                };

                // Skip the whole day when the activator is already at capacity.
                let booked_today = scheduled
                    .iter()
                    .filter(|m| m.activator_user_id == activator.id)
                    .filter(|m| timeutil::local_date_in(m.scheduled_start_at, tz) == day)
                    .count();
                if booked_today >= shift.max_meetings_per_day as usize {
                    continue;
                }

                let shift_start = match timeutil::local_to_utc(day, shift.start_time, tz) {
                    Some(t) => t,
                    None => continue,
                };
                let shift_end = match timeutil::local_to_utc(day, shift.end_time, tz) {
                    Some(t) => t,
                    None => continue,
                };

                let duration = Duration::minutes(shift.meeting_duration_minutes as i64);
                let buffer_before = Duration::minutes(shift.buffer_before_minutes as i64);
                let buffer_after = Duration::minutes(shift.buffer_after_minutes as i64);
                let step = duration + buffer_before + buffer_after;
                let earliest = now + Duration::hours(shift.min_notice_hours as i64);

                let mut slot_start = shift_start;
                while slot_start + duration <= shift_end {
                    let slot_end = slot_start + duration;
                    let buf_start = slot_start - buffer_before;
                    let buf_end = slot_end + buffer_after;

                    let conflicts = scheduled
                        .iter()
                        .filter(|m| m.activator_user_id == activator.id)
                        .any(|m| m.scheduled_start_at < buf_end && m.scheduled_end_at > buf_start);

                    if slot_start >= earliest && !conflicts {
                        slots.push(Slot {
                            start: slot_start,
                            end: slot_end,
                            activator_id: activator.id,
                            activator_name: activator.display_name.clone(),
                            meeting_link: activator.meeting_link.clone(),
                            viewer_date: timeutil::local_date_in(slot_start, viewer_tz),
                        });
                    }
                    slot_start += step;
                }
            }
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    slots.sort_by(|a, b| a.start.cmp(&b.start).then(a.activator_id.cmp(&b.activator_id)));
    slots
}

/// Slot query result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub slots: Vec<Slot>,
    pub activator_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Load availability data and compute slots for the requested range.
pub async fn generate_slots(
    conn: &mut AsyncPgConnection,
    config: &ActivationConfig,
    range_start: NaiveDate,
    range_end: NaiveDate,
    viewer_tz: Tz,
) -> anyhow::Result<SlotsResponse> {
    let activators: Vec<Activator> = act_activators::table
        .filter(act_activators::accepts_meetings.eq(true))
        .filter(act_activators::active.eq(true))
        .order(act_activators::id.asc())
        .load(conn)
        .await?;

    if activators.is_empty() {
        return Ok(SlotsResponse {
            slots: Vec::new(),
            activator_count: 0,
            status: Some("no_activators_accepting_meetings".to_string()),
        });
    }

    let activator_ids: Vec<i64> = activators.iter().map(|a| a.id).collect();

    let shifts: Vec<Shift> = act_shifts::table
        .filter(act_shifts::activator_id.eq_any(&activator_ids))
        .filter(act_shifts::is_active.eq(true))
        .filter(act_shifts::active.eq(true))
        .load(conn)
        .await?;

    // Pad the meeting scan by a day each way so timezone offsets cannot push
    // an overlapping meeting outside the loaded window.
    let scan_start = range_start
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc() - Duration::days(1))
        .unwrap_or_else(Utc::now);
    let scan_end = range_end
        .and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc() + Duration::days(1))
        .unwrap_or_else(Utc::now);

    let scheduled =
        meeting_service::scheduled_in_range(conn, &activator_ids, scan_start, scan_end).await?;

    let slots = compute_slots(
        range_start,
        range_end,
        viewer_tz,
        Utc::now(),
        config.booking_window_cap_days,
        &activators,
        &shifts,
        &scheduled,
    );

    crate::metrics::slots_generated(slots.len());
    let activator_count = activators.len();
    Ok(SlotsResponse {
        slots,
        activator_count,
        status: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, NaiveTime};
    use uuid::Uuid;

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn activator(id: i64) -> Activator {
        Activator {
            id,
            organization_id: Uuid::nil(),
            display_name: format!("Activator {id}"),
            meeting_link: Some(format!("https://meet.example.com/a{id}")),
            accepts_meetings: true,
            active: true,
            create_date: None,
            write_date: None,
        }
    }

    fn shift(activator_id: i64, day_of_week: i32, start: &str, end: &str, tz: &str) -> Shift {
        Shift {
            id: activator_id * 10 + day_of_week as i64,
            organization_id: Uuid::nil(),
            activator_id,
            day_of_week,
            start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
            timezone: tz.to_string(),
            meeting_duration_minutes: 30,
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
            max_meetings_per_day: 8,
            min_notice_hours: 0,
            booking_window_days: 14,
            is_active: true,
            active: true,
            create_date: None,
            write_date: None,
        }
    }

    fn meeting(activator_id: i64, start: &str, end: &str) -> Meeting {
        Meeting {
            id: 1,
            organization_id: Uuid::nil(),
            pipeline_id: 1,
            parent_meeting_id: None,
            attempt_number: 1,
            scheduled_start_at: utc(start),
            scheduled_end_at: utc(end),
            scheduled_timezone: "UTC".to_string(),
            activator_user_id: activator_id,
            scheduled_by_sdr_user_id: None,
            status: "scheduled".to_string(),
            outcome_notes: None,
            proof_method: None,
            install_url: None,
            block_reason: None,
            cancel_reason: None,
            canceled_by: None,
            reschedule_reason: None,
            contact_attempted: None,
            lead_delivery_methods: None,
            kill_reason: None,
            completed_at: None,
            active: true,
            create_date: None,
            write_date: None,
        }
    }

    fn la() -> Tz {
        timeutil::parse_tz("America/Los_Angeles").unwrap()
    }

    #[test]
    fn generates_slots_within_shift_window() {
        // 2024-06-12 is a Wednesday (day_of_week 3).
        let activators = vec![activator(1)];
        let shifts = vec![shift(1, 3, "09:00", "11:00", "UTC")];
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-10 00:00"),
            14,
            &activators,
            &shifts,
            &[],
        );
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        assert_eq!(
            starts,
            vec![
                utc("2024-06-12 09:00"),
                utc("2024-06-12 09:30"),
                utc("2024-06-12 10:00"),
                utc("2024-06-12 10:30"),
            ]
        );
        // End of the window is exclusive for slot starts.
        assert!(slots.iter().all(|s| s.end <= utc("2024-06-12 11:00")));
    }

    #[test]
    fn degenerate_shift_excluded() {
        let activators = vec![activator(1)];
        let mut zero = shift(1, 3, "09:00", "09:00", "UTC");
        zero.id = 99;
        let inverted = shift(1, 3, "17:00", "09:00", "UTC");
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-10 00:00"),
            14,
            &activators,
            &[zero, inverted],
            &[],
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn zero_duration_shift_excluded() {
        // A zero meeting duration (with zero buffers) would make the walk
        // step zero and never advance; the shift must be dropped up front.
        let activators = vec![activator(1)];
        let mut zero_duration = shift(1, 3, "09:00", "11:00", "UTC");
        zero_duration.meeting_duration_minutes = 0;
        let mut negative_buffer = shift(1, 3, "09:00", "11:00", "UTC");
        negative_buffer.buffer_before_minutes = -30;
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-10 00:00"),
            14,
            &activators,
            &[zero_duration, negative_buffer],
            &[],
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn booked_slot_does_not_reappear() {
        let activators = vec![activator(1)];
        let shifts = vec![shift(1, 3, "09:00", "11:00", "UTC")];
        let booked = meeting(1, "2024-06-12 09:30", "2024-06-12 10:00");
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-10 00:00"),
            14,
            &activators,
            &shifts,
            &[booked],
        );
        assert!(slots.iter().all(|s| s.start != utc("2024-06-12 09:30")));
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn buffers_expand_both_step_and_conflict_window() {
        let activators = vec![activator(1)];
        let mut s = shift(1, 3, "09:00", "11:00", "UTC");
        s.buffer_before_minutes = 5;
        s.buffer_after_minutes = 10;
        // A meeting ending at 09:03 intrudes into the 08:55 pre-buffer of the
        // 09:00 slot; step is 30+5+10 = 45, so the walk lands on 09:45, 10:30.
        let booked = meeting(1, "2024-06-12 08:40", "2024-06-12 09:03");
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-10 00:00"),
            14,
            &activators,
            &[s],
            &[booked],
        );
        // First step blocked by the buffer conflict; the rest survive.
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].start, utc("2024-06-12 09:45"));
        assert_eq!(slots[1].start, utc("2024-06-12 10:30"));
    }

    #[test]
    fn min_notice_rejects_near_slots() {
        let activators = vec![activator(1)];
        let mut s = shift(1, 3, "09:00", "11:00", "UTC");
        s.min_notice_hours = 1;
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-12 08:30"),
            14,
            &activators,
            &[s],
            &[],
        );
        // 09:00 is only 30 minutes out; 09:30 onward clears the notice bar.
        assert_eq!(slots[0].start, utc("2024-06-12 09:30"));
    }

    #[test]
    fn day_skipped_at_meeting_capacity() {
        let activators = vec![activator(1)];
        let mut s = shift(1, 3, "09:00", "17:00", "UTC");
        s.max_meetings_per_day = 2;
        let booked = vec![
            meeting(1, "2024-06-12 09:00", "2024-06-12 09:30"),
            meeting(1, "2024-06-12 10:00", "2024-06-12 10:30"),
        ];
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-10 00:00"),
            14,
            &activators,
            &[s],
            &booked,
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn smallest_booking_window_wins() {
        let activators = vec![activator(1), activator(2)];
        let mut short = shift(1, 3, "09:00", "10:00", "UTC");
        short.booking_window_days = 2;
        let long = shift(2, 3, "09:00", "10:00", "UTC");
        // Requested range ends well beyond activator 1's two-day window; the
        // clamp applies to the whole request, so neither activator emits
        // slots past now + 2 days.
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-26"),
            la(),
            utc("2024-06-11 00:00"),
            14,
            &activators,
            &[short, long],
            &[],
        );
        assert!(!slots.is_empty());
        assert!(slots.iter().all(|s| s.start < utc("2024-06-14 00:00")));
    }

    #[test]
    fn dst_transition_shifts_instants_not_wall_clock() {
        // Scenario: 09:00-17:00 America/New_York shift, viewer in Los
        // Angeles, across the 2024-03-10 spring-forward. 2024-03-08 and
        // 2024-03-15 are both Fridays (day_of_week 5).
        let activators = vec![activator(1)];
        let shifts = vec![shift(1, 5, "09:00", "17:00", "America/New_York")];

        let before = compute_slots(
            date("2024-03-08"),
            date("2024-03-08"),
            la(),
            utc("2024-03-07 00:00"),
            14,
            &activators,
            &shifts,
            &[],
        );
        let after = compute_slots(
            date("2024-03-15"),
            date("2024-03-15"),
            la(),
            utc("2024-03-14 00:00"),
            14,
            &activators,
            &shifts,
            &[],
        );

        assert_eq!(before.len(), after.len());
        // EST 09:00 = 14:00 UTC; EDT 09:00 = 13:00 UTC.
        assert_eq!(before[0].start, utc("2024-03-08 14:00"));
        assert_eq!(after[0].start, utc("2024-03-15 13:00"));
        let week = Duration::days(7);
        assert_eq!(before[0].start + week - after[0].start, Duration::hours(1));
    }

    #[test]
    fn viewer_date_uses_viewer_timezone() {
        // A 09:00 UTC Wednesday slot is still Wednesday in Los Angeles, but
        // a 02:00 UTC slot is Tuesday evening there.
        let activators = vec![activator(1)];
        let shifts = vec![shift(1, 3, "02:00", "03:00", "UTC")];
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-10 00:00"),
            14,
            &activators,
            &shifts,
            &[],
        );
        assert_eq!(slots[0].viewer_date, date("2024-06-11"));
    }

    #[test]
    fn output_sorted_across_activators() {
        let activators = vec![activator(2), activator(1)];
        let shifts = vec![
            shift(1, 3, "10:00", "11:00", "UTC"),
            shift(2, 3, "09:00", "10:00", "UTC"),
        ];
        let slots = compute_slots(
            date("2024-06-12"),
            date("2024-06-12"),
            la(),
            utc("2024-06-10 00:00"),
            14,
            &activators,
            &shifts,
            &[],
        );
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(slots[0].activator_id, 2);
    }
}
