//! Relative and fixed date/time resolution.
//! ----------------------------------------
//! `DateTimeHelper` turns request text (`now-8H`, `18:15`, `2017-09-01`, ...)
//! into a `DateTimeValue` with millisecond start/end boundaries, and
//! `TimeAdjustmentValue` applies calendar-safe `{-2D}` style offsets.

pub mod adjustment;
pub mod clock;
pub mod datetime;

pub use adjustment::*;
pub use clock::*;
pub use datetime::*;

pub const MILLIS_PER_MINUTE: i64 = 60_000;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

/// Zero the seconds and milliseconds of an epoch-millis timestamp.
#[inline]
pub fn truncate_to_minute(millis: i64) -> i64 {
    millis - millis.rem_euclid(MILLIS_PER_MINUTE)
}
