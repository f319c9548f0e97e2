use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{truncate_to_minute, Clock, SystemClock, TimeAdjustmentValue, MILLIS_PER_HOUR, MILLIS_PER_MINUTE};
use crate::error::{AppError, AppResult};

static NOW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?i)now(?:([+-])(\d+)(h)?)?$").unwrap());
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T(\d{1,2}):(\d{2})$").unwrap());

pub const FIXED_DATE_FORMAT: &str = "%Y-%m-%d";
pub const FIXED_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Unit a single parsed point expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Minute,
    Day,
}

/// A resolved point in time, widened to the minute (or day) it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeValue {
    /// Original expression, present only for `now`-based and time-only input.
    pub relative_date_time: Option<String>,
    /// Canonical `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM` rendering.
    pub fixed_date_time: String,
    pub time_for_start: i64,
    pub time_for_end: i64,
    pub granularity: Granularity,
}

impl DateTimeValue {
    fn minute(start: i64, relative: Option<String>) -> AppResult<Self> {
        let fixed = format_local(start, FIXED_DATE_TIME_FORMAT)?;
        Ok(Self {
            relative_date_time: relative,
            fixed_date_time: fixed,
            time_for_start: start,
            time_for_end: start + MILLIS_PER_MINUTE - 1,
            granularity: Granularity::Minute,
        })
    }

    fn day(date: NaiveDate) -> AppResult<Self> {
        let start = local_millis(date.and_time(NaiveTime::MIN))?;
        let next = date
            .succ_opt()
            .ok_or_else(|| AppError::invalid_date_time(&date.to_string()))?;
        let end = local_millis(next.and_time(NaiveTime::MIN))? - 1;
        Ok(Self {
            relative_date_time: None,
            fixed_date_time: date.format(FIXED_DATE_FORMAT).to_string(),
            time_for_start: start,
            time_for_end: end,
            granularity: Granularity::Day,
        })
    }

    pub fn is_relative(&self) -> bool {
        self.relative_date_time.is_some()
    }

    /// Shift both boundaries by `adjustment`, keeping the granularity.
    pub fn adjusted(&self, adjustment: &TimeAdjustmentValue) -> AppResult<Self> {
        let start = adjustment.adjust_date_time(self.time_for_start)?;
        let end = adjustment.adjust_date_time(self.time_for_end)?;
        let fmt = match self.granularity {
            Granularity::Minute => FIXED_DATE_TIME_FORMAT,
            Granularity::Day => FIXED_DATE_FORMAT,
        };
        Ok(Self {
            relative_date_time: self.relative_date_time.clone(),
            fixed_date_time: format_local(start, fmt)?,
            time_for_start: start,
            time_for_end: end,
            granularity: self.granularity,
        })
    }
}

/// Resolve a naive local date-time to epoch millis. A wall time inside a DST
/// gap is read with the pre-transition offset (02:30 becomes 03:30).
pub(crate) fn local_millis(ndt: NaiveDateTime) -> AppResult<i64> {
    if let Some(dt) = Local.from_local_datetime(&ndt).earliest() {
        return Ok(dt.timestamp_millis());
    }
    let bumped = ndt + chrono::Duration::hours(1);
    Local
        .from_local_datetime(&bumped)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| AppError::invalid_date_time(&ndt.to_string()))
}

pub(crate) fn naive_local(millis: i64) -> AppResult<NaiveDateTime> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.naive_local())
        .ok_or_else(|| AppError::invalid_date_time(&millis.to_string()))
}

fn format_local(millis: i64, fmt: &str) -> AppResult<String> {
    Ok(naive_local(millis)?.format(fmt).to_string())
}

fn field(caps: &regex::Captures<'_>, idx: usize, text: &str) -> AppResult<u32> {
    caps.get(idx)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| AppError::invalid_date_time(text))
}

fn checked_time(hour: u32, minute: u32, text: &str) -> AppResult<NaiveTime> {
    if hour > 23 || minute > 59 {
        return Err(AppError::invalid_date_time(text));
    }
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| AppError::invalid_date_time(text))
}

fn checked_date(year: u32, month: u32, day: u32, text: &str) -> AppResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| AppError::invalid_date_time(text))
}

/// Parses request date/time text against an injectable clock.
#[derive(Clone)]
pub struct DateTimeHelper {
    clock: Arc<dyn Clock>,
}

impl Default for DateTimeHelper {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for DateTimeHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateTimeHelper").field("now", &self.now_millis()).finish()
    }
}

impl DateTimeHelper {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// The only place "now" is read from.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn truncate_to_minute(millis: i64) -> i64 {
        truncate_to_minute(millis)
    }

    pub fn parse_date_time(&self, text: &str) -> AppResult<DateTimeValue> {
        let s = text.trim();
        if s.is_empty() {
            return Err(AppError::empty_date_time());
        }

        if let Some(caps) = NOW_RE.captures(s) {
            let now = truncate_to_minute(self.now_millis());
            let offset = match (caps.get(1), caps.get(2)) {
                (Some(sign), Some(_)) => {
                    let amount = field(&caps, 2, s)? as i64;
                    let unit = if caps.get(3).is_some() { MILLIS_PER_HOUR } else { MILLIS_PER_MINUTE };
                    let magnitude = amount.checked_mul(unit).ok_or_else(|| AppError::invalid_date_time(s))?;
                    if sign.as_str() == "-" { -magnitude } else { magnitude }
                }
                _ => 0,
            };
            let start = now.checked_add(offset).ok_or_else(|| AppError::invalid_date_time(s))?;
            debug!(target: "perfseries::time", "resolved relative '{}' to {}", s, start);
            return DateTimeValue::minute(start, Some(s.to_string()));
        }

        if let Some(caps) = TIME_RE.captures(s) {
            let time = checked_time(field(&caps, 1, s)?, field(&caps, 2, s)?, s)?;
            let today = naive_local(self.now_millis())?.date();
            let start = local_millis(today.and_time(time))?;
            return DateTimeValue::minute(start, Some(s.to_string()));
        }

        if let Some(caps) = DATE_RE.captures(s) {
            let date = checked_date(field(&caps, 1, s)?, field(&caps, 2, s)?, field(&caps, 3, s)?, s)?;
            return DateTimeValue::day(date);
        }

        if let Some(caps) = DATE_TIME_RE.captures(s) {
            let date = checked_date(field(&caps, 1, s)?, field(&caps, 2, s)?, field(&caps, 3, s)?, s)?;
            let time = checked_time(field(&caps, 4, s)?, field(&caps, 5, s)?, s)?;
            let start = local_millis(date.and_time(time))?;
            return DateTimeValue::minute(start, None);
        }

        Err(AppError::invalid_date_time(s))
    }

    /// Parse text that may carry a trailing `{±N[HDWM]}` / `~ADJ±N[HDWM]` marker
    /// and shift the resolved value by it.
    pub fn parse_adjusted(&self, text: &str) -> AppResult<DateTimeValue> {
        let adjustment = TimeAdjustmentValue::parse(text);
        let base = self.parse_date_time(&TimeAdjustmentValue::strip_time_adjustment(text))?;
        match adjustment {
            Some(adj) if !adj.is_no_adjustment() => {
                let mut value = base.adjusted(&adj)?;
                if value.relative_date_time.is_some() {
                    value.relative_date_time = Some(text.trim().to_string());
                }
                Ok(value)
            }
            _ => Ok(base),
        }
    }
}

#[cfg(test)]
#[path = "datetime_tests.rs"]
mod tests;
