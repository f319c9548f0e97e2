use super::*;
use chrono::{Local, TimeZone};

fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
    Local.with_ymd_and_hms(y, mo, d, h, mi, 0).earliest().unwrap().timestamp_millis()
}

#[test]
fn parses_brace_and_adj_markers() {
    assert_eq!(TimeAdjustmentValue::parse("now{-2D}"), Some(TimeAdjustmentValue::new(AdjustmentPeriod::Day, -2)));
    assert_eq!(TimeAdjustmentValue::parse("now{3}"), Some(TimeAdjustmentValue::new(AdjustmentPeriod::Day, 3)));
    assert_eq!(TimeAdjustmentValue::parse("now{+1W}"), Some(TimeAdjustmentValue::new(AdjustmentPeriod::Week, 1)));
    assert_eq!(TimeAdjustmentValue::parse("now~ADJ-6H"), Some(TimeAdjustmentValue::new(AdjustmentPeriod::Hour, -6)));
    assert_eq!(TimeAdjustmentValue::parse("2017-03-31~ADJ-1M"), Some(TimeAdjustmentValue::new(AdjustmentPeriod::Month, -1)));
}

#[test]
fn empty_marker_is_explicit_no_adjustment() {
    assert_eq!(TimeAdjustmentValue::parse("now{}"), Some(TimeAdjustmentValue::NOADJUSTMENT));
    assert!(TimeAdjustmentValue::parse("now{}").unwrap().is_no_adjustment());
    assert_eq!(TimeAdjustmentValue::parse("now"), None);
}

#[test]
fn strip_only_removes_valid_markers() {
    assert_eq!(TimeAdjustmentValue::strip_time_adjustment("2017-09-01T00:00{-2D}"), "2017-09-01T00:00");
    assert_eq!(TimeAdjustmentValue::strip_time_adjustment("now~ADJ+4H"), "now");
    assert_eq!(TimeAdjustmentValue::strip_time_adjustment("now{}"), "now");
    assert_eq!(TimeAdjustmentValue::strip_time_adjustment("now{-2X}"), "now{-2X}");
    assert_eq!(TimeAdjustmentValue::strip_time_adjustment("now~ADJx"), "now~ADJx");
    assert_eq!(TimeAdjustmentValue::strip_time_adjustment("now-8H"), "now-8H");
}

#[test]
fn day_offset_crosses_month_boundary() {
    let adj = TimeAdjustmentValue::parse("{-2D}").unwrap();
    let out = adj.adjust_date_time(local(2017, 9, 1, 0, 0)).unwrap();
    assert_eq!(out, local(2017, 8, 30, 0, 0));
}

#[test]
fn default_unit_is_day() {
    let adj = TimeAdjustmentValue::parse("{-1}").unwrap();
    assert_eq!(adj.adjust_date_time(local(2015, 3, 1, 10, 30)).unwrap(), local(2015, 2, 28, 10, 30));
}

#[test]
fn month_offset_clamps_day_of_month() {
    let adj = TimeAdjustmentValue::parse("{-1M}").unwrap();
    assert_eq!(adj.adjust_date_time(local(2015, 3, 31, 8, 0)).unwrap(), local(2015, 2, 28, 8, 0));
    assert_eq!(adj.adjust_date_time(local(2016, 3, 31, 8, 0)).unwrap(), local(2016, 2, 29, 8, 0));
}

#[test]
fn week_and_hour_offsets() {
    let week = TimeAdjustmentValue::new(AdjustmentPeriod::Week, 2);
    assert_eq!(week.adjust_date_time(local(2016, 12, 25, 0, 0)).unwrap(), local(2017, 1, 8, 0, 0));
    let hours = TimeAdjustmentValue::new(AdjustmentPeriod::Hour, -3);
    let t = local(2016, 12, 25, 12, 0);
    assert_eq!(hours.adjust_date_time(t).unwrap(), t - 3 * MILLIS_PER_HOUR);
}

#[test]
fn no_adjustment_is_identity() {
    let t = local(2016, 1, 1, 0, 0);
    assert_eq!(TimeAdjustmentValue::NOADJUSTMENT.adjust_date_time(t).unwrap(), t);
    assert_eq!(TimeAdjustmentValue::new(AdjustmentPeriod::Month, 0).adjust_date_time(t).unwrap(), t);
}

#[test]
fn display_round_trips_marker() {
    assert_eq!(TimeAdjustmentValue::new(AdjustmentPeriod::Day, -2).to_string(), "{-2D}");
    assert_eq!(TimeAdjustmentValue::NOADJUSTMENT.to_string(), "{}");
}
