use chrono::{Days, Months, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::datetime::{local_millis, naive_local};
use super::MILLIS_PER_HOUR;
use crate::error::{AppError, AppResult};

// Trailing `{-2D}` / `{}` or `~ADJ-2D` / `~ADJ`
static ADJUSTMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\{(?:([+-]?\d+)([HDWM])?)?\}|~ADJ(?:([+-]?\d+)([HDWM])?)?)\s*$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentPeriod {
    Hour,
    Day,
    Week,
    Month,
}

impl AdjustmentPeriod {
    fn from_suffix(s: Option<&str>) -> Self {
        match s {
            Some("H") => AdjustmentPeriod::Hour,
            Some("W") => AdjustmentPeriod::Week,
            Some("M") => AdjustmentPeriod::Month,
            _ => AdjustmentPeriod::Day,
        }
    }

    pub fn suffix(&self) -> char {
        match self {
            AdjustmentPeriod::Hour => 'H',
            AdjustmentPeriod::Day => 'D',
            AdjustmentPeriod::Week => 'W',
            AdjustmentPeriod::Month => 'M',
        }
    }
}

/// Offset applied to a resolved time. `NoAdjustment` is the explicit `{}`
/// marker; a missing marker is `None` at the parse site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeAdjustmentValue {
    NoAdjustment,
    Offset { period: AdjustmentPeriod, amount: i64 },
}

impl TimeAdjustmentValue {
    pub const NOADJUSTMENT: TimeAdjustmentValue = TimeAdjustmentValue::NoAdjustment;

    pub fn new(period: AdjustmentPeriod, amount: i64) -> Self {
        TimeAdjustmentValue::Offset { period, amount }
    }

    pub fn is_no_adjustment(&self) -> bool {
        matches!(self, TimeAdjustmentValue::NoAdjustment)
    }

    /// Parse the trailing marker of `text`, if any.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = ADJUSTMENT_RE.captures(text)?;
        let (amount, unit) = match (caps.get(1), caps.get(3)) {
            (Some(a), _) => (a.as_str(), caps.get(2).map(|m| m.as_str())),
            (None, Some(a)) => (a.as_str(), caps.get(4).map(|m| m.as_str())),
            (None, None) => return Some(TimeAdjustmentValue::NoAdjustment),
        };
        // Out-of-range amounts make the marker invalid, which leaves it in place
        let amount = amount.trim_start_matches('+').parse::<i64>().ok()?;
        Some(TimeAdjustmentValue::new(AdjustmentPeriod::from_suffix(unit), amount))
    }

    /// Remove a well-formed trailing marker; anything else is returned as-is.
    pub fn strip_time_adjustment(text: &str) -> String {
        match ADJUSTMENT_RE.find(text) {
            Some(m) if Self::parse(text).is_some() => text[..m.start()].trim_end().to_string(),
            _ => text.to_string(),
        }
    }

    pub fn adjust_date_time(&self, millis: i64) -> AppResult<i64> {
        let (period, amount) = match *self {
            TimeAdjustmentValue::NoAdjustment => return Ok(millis),
            TimeAdjustmentValue::Offset { period, amount } => (period, amount),
        };
        if amount == 0 {
            return Ok(millis);
        }
        let overflow = || AppError::invalid_date_time(&self.to_string());
        let shifted: Option<NaiveDateTime> = match period {
            // Hours are absolute time, everything else is calendar arithmetic on local fields
            AdjustmentPeriod::Hour => {
                return amount
                    .checked_mul(MILLIS_PER_HOUR)
                    .and_then(|d| millis.checked_add(d))
                    .ok_or_else(overflow);
            }
            AdjustmentPeriod::Day => shift_days(naive_local(millis)?, amount),
            AdjustmentPeriod::Week => {
                let local = naive_local(millis)?;
                amount.checked_mul(7).and_then(|d| shift_days(local, d))
            }
            AdjustmentPeriod::Month => shift_months(naive_local(millis)?, amount),
        };
        local_millis(shifted.ok_or_else(overflow)?)
    }
}

fn shift_months(local: NaiveDateTime, amount: i64) -> Option<NaiveDateTime> {
    // chrono clamps the day-of-month into the target month (Mar 31 - 1M = Feb 28)
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount < 0 { local.checked_sub_months(months) } else { local.checked_add_months(months) }
}

fn shift_days(local: NaiveDateTime, amount: i64) -> Option<NaiveDateTime> {
    let days = Days::new(amount.unsigned_abs());
    if amount < 0 { local.checked_sub_days(days) } else { local.checked_add_days(days) }
}

impl std::fmt::Display for TimeAdjustmentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeAdjustmentValue::NoAdjustment => write!(f, "{{}}"),
            TimeAdjustmentValue::Offset { period, amount } => write!(f, "{{{:+}{}}}", amount, period.suffix()),
        }
    }
}

#[cfg(test)]
#[path = "adjustment_tests.rs"]
mod tests;
