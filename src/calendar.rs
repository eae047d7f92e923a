//! Calendar arithmetic used by the planner.
//!
//! Week numbers count seven-day blocks from January 1st (`1..=53`), not ISO
//! weeks, and carry no year.

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};

/// Weeks reported for a todo that has never been completed.
pub const NEVER_COMPLETED_WEEKS: i64 = 999;

pub fn week_of_year<Tz: TimeZone>(at: &DateTime<Tz>) -> u32 {
    at.ordinal0() / 7 + 1
}

pub fn is_same_week(a: &DateTime<Local>, b: &DateTime<Local>) -> bool {
    a.year() == b.year() && week_of_year(a) == week_of_year(b)
}

pub fn is_same_month(a: &DateTime<Local>, b: &DateTime<Local>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Whole weeks between two instants, regardless of order.
pub fn weeks_between(a: &DateTime<Local>, b: &DateTime<Local>) -> i64 {
    (*b - *a).num_weeks().abs()
}

pub fn weeks_since_completed(completed_at: Option<&DateTime<Local>>, now: &DateTime<Local>) -> i64 {
    match completed_at {
        Some(completed_at) => weeks_between(completed_at, now),
        None => NEVER_COMPLETED_WEEKS,
    }
}

/// Start of the month containing `now` and start of the following month.
pub fn month_bounds(now: &DateTime<Local>) -> Option<(DateTime<Local>, DateTime<Local>)> {
    let (next_year, next_month) = match now.month() {
        12 => (now.year() + 1, 1),
        month => (now.year(), month + 1),
    };
    let start = start_of_day(NaiveDate::from_ymd_opt(now.year(), now.month(), 1)?, &Local)?;
    let end = start_of_day(NaiveDate::from_ymd_opt(next_year, next_month, 1)?, &Local)?;
    Some((start, end))
}

/// Start of the seven-day block `week_of_year(now)` and start of the next one.
/// The last block of a year ends on January 1st.
pub fn week_bounds(now: &DateTime<Local>) -> Option<(DateTime<Local>, DateTime<Local>)> {
    let first_day = (week_of_year(now) - 1) * 7 + 1;
    let start = NaiveDate::from_yo_opt(now.year(), first_day)?;
    let end = NaiveDate::from_yo_opt(now.year(), first_day + 7)
        .or_else(|| NaiveDate::from_ymd_opt(now.year() + 1, 1, 1))?;
    Some((start_of_day(start, &Local)?, start_of_day(end, &Local)?))
}

/// First instant of `date` in `tz`. When midnight falls in a DST gap the day
/// starts at the first whole hour that exists.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    (0..24).find_map(|hour| date.and_hms_opt(hour, 0, 0)?.and_local_timezone(tz.clone()).earliest())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, LocalResult, NaiveDateTime, Timelike};

    fn at(year: i32, month: u32, day: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn week_numbers_count_from_january_first() {
        assert_eq!(week_of_year(&at(2026, 1, 1)), 1);
        assert_eq!(week_of_year(&at(2026, 1, 7)), 1);
        assert_eq!(week_of_year(&at(2026, 1, 8)), 2);
        assert_eq!(week_of_year(&at(2026, 12, 31)), 53);
    }

    #[test]
    fn same_week_needs_same_year() {
        assert!(is_same_week(&at(2026, 10, 8), &at(2026, 10, 14)));
        assert!(!is_same_week(&at(2026, 10, 7), &at(2026, 10, 8)));
        assert!(!is_same_week(&at(2025, 10, 14), &at(2026, 10, 14)));
    }

    #[test]
    fn weeks_between_truncates_and_ignores_order() {
        let now = at(2026, 10, 14);
        assert_eq!(weeks_between(&(now - Duration::days(13)), &now), 1);
        assert_eq!(weeks_between(&(now - Duration::days(14)), &now), 2);
        assert_eq!(weeks_between(&(now + Duration::days(8)), &now), 1);
    }

    #[test]
    fn never_completed_is_far_in_the_past() {
        assert_eq!(weeks_since_completed(None, &at(2026, 10, 14)), NEVER_COMPLETED_WEEKS);
    }

    #[test]
    fn week_bounds_follow_week_numbers() {
        let (start, end) = week_bounds(&at(2026, 10, 14)).unwrap();
        assert_eq!((start.month(), start.day()), (10, 8));
        assert_eq!((end.month(), end.day()), (10, 15));
        assert_eq!(week_of_year(&start), 41);
        assert_eq!(week_of_year(&(end - Duration::seconds(1))), 41);

        let (start, end) = week_bounds(&at(2026, 12, 31)).unwrap();
        assert_eq!((start.month(), start.day()), (12, 31));
        assert_eq!((end.year(), end.month(), end.day()), (2027, 1, 1));
    }

    /// Offset +01:00 everywhere except the hour after every midnight, which
    /// does not exist.
    #[derive(Debug, Clone, Copy)]
    struct NoMidnight;

    impl TimeZone for NoMidnight {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            NoMidnight
        }

        fn offset_from_local_date(&self, _: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(plus_one())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if local.hour() == 0 {
                LocalResult::None
            } else {
                LocalResult::Single(plus_one())
            }
        }

        fn offset_from_utc_date(&self, _: &NaiveDate) -> FixedOffset {
            plus_one()
        }

        fn offset_from_utc_datetime(&self, _: &NaiveDateTime) -> FixedOffset {
            plus_one()
        }
    }

    fn plus_one() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn day_starting_in_a_gap_begins_after_it() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();
        let start = start_of_day(date, &NoMidnight).unwrap();
        assert_eq!(start.naive_local(), date.and_hms_opt(1, 0, 0).unwrap());
    }

    #[test]
    fn month_bounds_wrap_december() {
        let (start, end) = month_bounds(&at(2026, 12, 20)).unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (2026, 12, 1));
        assert_eq!((end.year(), end.month(), end.day()), (2027, 1, 1));
        assert!(is_same_month(&start, &at(2026, 12, 20)));
        assert!(!is_same_month(&end, &at(2026, 12, 20)));
    }
}
