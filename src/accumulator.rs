//! Result accumulation
//! -------------------
//! Owns one `Aggregator` per (output series, time bucket), routes rows from
//! the row source into the right one, and renders the ordered output series.
//! The query window is cut into whole-minute buckets, widened so that no
//! series carries more than `max_points` points.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::{Aggregator, Number, Row};
use crate::error::{AppError, AppResult};
use crate::ident::SystemId;
use crate::registry::{AggregationMethod, SeriesField};
use crate::time::datetime::naive_local;
use crate::time::{DateTimeValue, FIXED_DATE_TIME_FORMAT, MILLIS_PER_MINUTE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: i64,
    pub value: Option<Number>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    pub name: String,
    pub category: String,
    pub field: String,
    pub aggregation_method: AggregationMethod,
    pub systems: Vec<String>,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Bucket start of every point, `YYYY-MM-DDTHH:MM` in local time.
    pub date_times: Vec<String>,
    pub series: Vec<SeriesResult>,
}

struct SeriesSlot {
    name: String,
    field: SeriesField,
    systems: Vec<SystemId>,
    buckets: Vec<Option<Aggregator>>,
}

pub struct ResultAccumulator {
    start: i64,
    end: i64,
    bucket_millis: i64,
    bucket_count: usize,
    time_column: String,
    series: Vec<SeriesSlot>,
}

impl ResultAccumulator {
    pub fn new(start: &DateTimeValue, end: &DateTimeValue, max_points: usize) -> AppResult<Self> {
        let (from, to) = (start.time_for_start, end.time_for_end);
        if to < from {
            return Err(AppError::InvalidDateTime(format!(
                "end \"{}\" is before start \"{}\"",
                end.fixed_date_time, start.fixed_date_time
            )));
        }
        let total_minutes = ((to - from) / MILLIS_PER_MINUTE) + 1;
        let per_bucket = ((total_minutes + max_points.max(1) as i64 - 1) / max_points.max(1) as i64).max(1);
        let bucket_count = ((total_minutes + per_bucket - 1) / per_bucket) as usize;
        debug!(target: "perfseries::accumulator", "{} minutes in {} buckets of {} minutes", total_minutes, bucket_count, per_bucket);
        Ok(Self {
            start: from,
            end: to,
            bucket_millis: per_bucket * MILLIS_PER_MINUTE,
            bucket_count,
            time_column: "EndTime".to_string(),
            series: Vec::new(),
        })
    }

    pub fn with_time_column(mut self, column: &str) -> Self {
        self.time_column = column.to_string();
        self
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn bucket_starts(&self) -> Vec<i64> {
        (0..self.bucket_count).map(|i| self.start + i as i64 * self.bucket_millis).collect()
    }

    /// Register an output series; returns its index for `accumulate`.
    pub fn add_series(&mut self, name: impl Into<String>, field: SeriesField, systems: Vec<SystemId>) -> usize {
        self.series.push(SeriesSlot {
            name: name.into(),
            field,
            systems,
            buckets: (0..self.bucket_count).map(|_| None).collect(),
        });
        self.series.len() - 1
    }

    fn bucket_for(&self, timestamp: i64) -> Option<usize> {
        if timestamp < self.start || timestamp > self.end {
            return None;
        }
        let idx = ((timestamp - self.start) / self.bucket_millis) as usize;
        (idx < self.bucket_count).then_some(idx)
    }

    /// Feed one row into `series`. Returns `false` when the row falls outside
    /// the window or carries no timestamp.
    pub fn accumulate(&mut self, series: usize, row: &dyn Row) -> AppResult<bool> {
        let timestamp = row.long(&self.time_column)?;
        let bucket = match timestamp.and_then(|t| self.bucket_for(t)) {
            Some(b) => b,
            None => {
                debug!(target: "perfseries::accumulator", "dropping row at {:?} outside window", timestamp);
                return Ok(false);
            }
        };
        let slot = self
            .series
            .get_mut(series)
            .ok_or_else(|| AppError::Internal(format!("no output series #{}", series)))?;
        let factory = slot.field.factory();
        slot.buckets[bucket]
            .get_or_insert_with(|| factory.new_aggregator())
            .aggregate(row)?;
        Ok(true)
    }

    pub fn render(self, precision: u32) -> AppResult<QueryResult> {
        let starts = self.bucket_starts();
        let date_times = starts
            .iter()
            .map(|t| naive_local(*t).map(|d| d.format(FIXED_DATE_TIME_FORMAT).to_string()))
            .collect::<AppResult<Vec<String>>>()?;
        let series = self
            .series
            .into_iter()
            .map(|slot| SeriesResult {
                name: slot.name,
                category: slot.field.category.name.clone(),
                field: slot.field.field.name.clone(),
                aggregation_method: slot.field.aggregation_method,
                systems: slot.systems.iter().map(|s| s.to_string()).collect(),
                points: slot
                    .buckets
                    .iter()
                    .zip(&starts)
                    .map(|(agg, t)| SeriesPoint {
                        timestamp: *t,
                        value: agg.as_ref().and_then(|a| a.result()).map(|n| n.rounded(precision)),
                    })
                    .collect(),
            })
            .collect();
        Ok(QueryResult { date_times, series })
    }
}

#[cfg(test)]
#[path = "accumulator_tests.rs"]
mod tests;
