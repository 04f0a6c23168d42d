//! Wall-clock / timezone conversion and business-day arithmetic.
//!
//! All timezone math goes through chrono-tz; shift definitions store local
//! wall-clock times and an IANA zone name, and DST is resolved per calendar
//! date at conversion time.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

/// Parse an IANA timezone name.
pub fn parse_tz(name: &str) -> Option<Tz> {
    name.parse::<Tz>().ok()
}

/// Convert a local wall-clock time in `tz` on `date` to an absolute instant.
///
/// Ambiguous local times (fall-back transition) resolve to the earlier
/// instant. Nonexistent local times (spring-forward gap) return None and the
/// caller skips that slot.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&date.and_time(time)) {
        chrono::LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        chrono::LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        chrono::LocalResult::None => None,
    }
}

/// The calendar date of `instant` as seen from `tz`.
pub fn local_date_in(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Add `days` business days, skipping Saturday and Sunday. A follow-up
/// computed on Friday for +1 lands on Monday.
pub fn add_business_days(from: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let mut result = from;
    for _ in 0..days {
        result += Duration::days(1);
        while is_weekend(result.weekday()) {
            result += Duration::days(1);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn utc(s: &str) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .unwrap()
            .and_utc()
    }

    #[test]
    fn converts_standard_and_daylight_offsets() {
        let tz = parse_tz("America/New_York").unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        // 2024-03-09 is EST (UTC-5); 2024-03-11 is EDT (UTC-4).
        let est = local_to_utc(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), nine, tz).unwrap();
        let edt = local_to_utc(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(), nine, tz).unwrap();
        assert_eq!(est, utc("2024-03-09 14:00"));
        assert_eq!(edt, utc("2024-03-11 13:00"));
        assert_eq!(est + Duration::days(2) - edt, Duration::hours(1));
    }

    #[test]
    fn spring_forward_gap_yields_none() {
        let tz = parse_tz("America/New_York").unwrap();
        let gap = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert!(local_to_utc(date, gap, tz).is_none());
    }

    #[test]
    fn fall_back_ambiguity_resolves_to_earlier_instant() {
        let tz = parse_tz("America/New_York").unwrap();
        let ambiguous = NaiveTime::from_hms_opt(1, 30, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        // Earlier occurrence is still EDT (UTC-4).
        let instant = local_to_utc(date, ambiguous, tz).unwrap();
        assert_eq!(instant, utc("2024-11-03 05:30"));
    }

    #[test]
    fn viewer_local_date_crosses_day_boundary() {
        let tz = parse_tz("America/Los_Angeles").unwrap();
        // 03:00 UTC is still the previous day in Los Angeles.
        let instant = utc("2024-06-12 03:00");
        assert_eq!(
            local_date_in(instant, tz),
            NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()
        );
    }

    #[test]
    fn friday_plus_one_business_day_is_monday() {
        // 2024-06-07 is a Friday.
        let friday = utc("2024-06-07 15:00");
        let due = add_business_days(friday, 1);
        assert_eq!(due, utc("2024-06-10 15:00"));
        assert_eq!(due.weekday(), Weekday::Mon);
    }

    #[test]
    fn two_business_days_over_a_weekend() {
        let thursday = utc("2024-06-06 10:00");
        assert_eq!(add_business_days(thursday, 2), utc("2024-06-10 10:00"));
    }

    #[test]
    fn unknown_timezone_rejected() {
        assert!(parse_tz("Mars/Olympus_Mons").is_none());
        assert!(parse_tz("America/New_York").is_some());
    }
}
