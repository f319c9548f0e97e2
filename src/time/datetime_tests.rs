use super::*;
use crate::time::FixedClock;
use chrono::{Local, TimeZone};

fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: i64) -> i64 {
    Local.with_ymd_and_hms(y, mo, d, h, mi, s).earliest().unwrap().timestamp_millis() + ms
}

fn helper_at(millis: i64) -> DateTimeHelper {
    DateTimeHelper::new(Arc::new(FixedClock::new(millis)))
}

fn helper() -> DateTimeHelper {
    helper_at(local(2015, 4, 26, 18, 15, 14, 998))
}

#[test]
fn now_truncates_to_minute() {
    let v = helper().parse_date_time("now").expect("now");
    assert_eq!(v.time_for_start, local(2015, 4, 26, 18, 15, 0, 0));
    assert_eq!(v.time_for_end, local(2015, 4, 26, 18, 15, 59, 999));
    assert_eq!(v.relative_date_time.as_deref(), Some("now"));
    assert_eq!(v.fixed_date_time, "2015-04-26T18:15");
    assert_eq!(v.granularity, Granularity::Minute);
}

#[test]
fn now_minus_hours_and_minutes() {
    let h = helper();
    let v = h.parse_date_time("now-8H").expect("now-8H");
    assert_eq!(v.fixed_date_time, "2015-04-26T10:15");
    assert_eq!(v.relative_date_time.as_deref(), Some("now-8H"));

    let v = h.parse_date_time("now-480").expect("now-480");
    assert_eq!(v.fixed_date_time, "2015-04-26T10:15");

    let v = h.parse_date_time("now+15").expect("now+15");
    assert_eq!(v.fixed_date_time, "2015-04-26T18:30");
}

#[test]
fn time_only_is_relative_to_today() {
    let v = helper().parse_date_time("09:05").expect("time only");
    assert_eq!(v.fixed_date_time, "2015-04-26T09:05");
    assert_eq!(v.time_for_start, local(2015, 4, 26, 9, 5, 0, 0));
    assert!(v.is_relative());
}

#[test]
fn date_expands_to_whole_day() {
    let v = helper().parse_date_time("2015-02-28").expect("date");
    assert_eq!(v.fixed_date_time, "2015-02-28");
    assert!(!v.is_relative());
    assert_eq!(v.granularity, Granularity::Day);
    assert_eq!(v.time_for_start, local(2015, 2, 28, 0, 0, 0, 0));
    assert_eq!(v.time_for_end, local(2015, 2, 28, 23, 59, 59, 999));
}

#[test]
fn date_time_is_fixed() {
    let v = helper().parse_date_time("2017-09-01T00:00").expect("date time");
    assert!(v.relative_date_time.is_none());
    assert_eq!(v.time_for_start, local(2017, 9, 1, 0, 0, 0, 0));
    assert_eq!(v.time_for_end, local(2017, 9, 1, 0, 0, 59, 999));
}

#[test]
fn rejects_out_of_range_fields() {
    let h = helper();
    for bad in ["2015-02-29", "24:00", "00:60", "2015-13-01", "2015-04-31", "2015-04-26T25:00", "tomorrow", "now-", "now-8X"] {
        let err = h.parse_date_time(bad).expect_err(bad);
        assert!(matches!(err, AppError::InvalidDateTime(_)), "{bad}: {err:?}");
    }
    // leap year is fine
    assert!(h.parse_date_time("2016-02-29").is_ok());
}

#[test]
fn empty_input_is_missing_definition() {
    for blank in ["", "   "] {
        let err = helper().parse_date_time(blank).unwrap_err();
        assert!(matches!(err, AppError::EmptyOrMissingDefinition(_)));
    }
}

#[test]
fn truncate_to_minute_zeroes_seconds() {
    let t = local(2015, 4, 26, 18, 15, 14, 998);
    assert_eq!(DateTimeHelper::truncate_to_minute(t), local(2015, 4, 26, 18, 15, 0, 0));
}

#[test]
fn clock_override_moves_now() {
    let clock = Arc::new(FixedClock::new(local(2020, 1, 1, 0, 0, 0, 0)));
    let h = DateTimeHelper::new(clock.clone());
    assert_eq!(h.parse_date_time("now").unwrap().fixed_date_time, "2020-01-01T00:00");
    clock.set(local(2021, 6, 30, 12, 1, 30, 0));
    assert_eq!(h.parse_date_time("now").unwrap().fixed_date_time, "2021-06-30T12:01");
}

#[test]
fn parse_adjusted_applies_offset() {
    let h = helper();
    let v = h.parse_adjusted("2017-09-01T00:00{-2D}").expect("adjusted");
    assert_eq!(v.fixed_date_time, "2017-08-30T00:00");
    assert_eq!(v.time_for_start, local(2017, 8, 30, 0, 0, 0, 0));

    let v = h.parse_adjusted("now~ADJ-1W").expect("relative adjusted");
    assert_eq!(v.fixed_date_time, "2015-04-19T18:15");
    assert_eq!(v.relative_date_time.as_deref(), Some("now~ADJ-1W"));

    let v = h.parse_adjusted("2017-09-01{}").expect("no-op");
    assert_eq!(v.fixed_date_time, "2017-09-01");
}

#[test]
fn malformed_marker_fails_in_date_parser() {
    let err = helper().parse_adjusted("2017-09-01T00:00{-2X}").unwrap_err();
    assert!(matches!(err, AppError::InvalidDateTime(_)));
}
