use serde::{Deserialize, Serialize};

use super::Aggregator;

/// Row bookkeeping columns a per-minute rate reads unless configured otherwise.
pub const DEFAULT_START_TIME_COLUMN: &str = "StartTime";
pub const DEFAULT_END_TIME_COLUMN: &str = "EndTime";
pub const DEFAULT_SYSTEM_COLUMN: &str = "SystemID";

/// Whether a column is accumulated as fixed-point or floating values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericKind {
    #[default]
    Integer,
    Float,
}

/// Closed set of aggregation strategies, each bound to the columns it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregatorFactory {
    Sum {
        column: String,
        #[serde(default)]
        numeric: NumericKind,
    },
    /// Row average: sum / row count.
    Average { column: String },
    /// Sum of numerator / sum of denominator.
    NaturalAverage { numerator: String, denominator: String },
    /// Per-system counter normalised by the elapsed minutes of that system's rows,
    /// then summed across systems.
    NaturalPerMinute {
        counter: String,
        start_time: String,
        end_time: String,
        system: String,
    },
    /// (sum of numerator / sum of denominator) * 100, undefined on a zero denominator.
    Percent { numerator: String, denominator: String },
    Min {
        column: String,
        #[serde(default)]
        numeric: NumericKind,
    },
    Max {
        column: String,
        #[serde(default)]
        numeric: NumericKind,
    },
}

impl AggregatorFactory {
    pub fn sum(column: &str, numeric: NumericKind) -> Self {
        AggregatorFactory::Sum { column: column.into(), numeric }
    }

    pub fn average(column: &str) -> Self {
        AggregatorFactory::Average { column: column.into() }
    }

    pub fn natural_average(numerator: &str, denominator: &str) -> Self {
        AggregatorFactory::NaturalAverage { numerator: numerator.into(), denominator: denominator.into() }
    }

    pub fn natural_per_minute(counter: &str) -> Self {
        AggregatorFactory::NaturalPerMinute {
            counter: counter.into(),
            start_time: DEFAULT_START_TIME_COLUMN.into(),
            end_time: DEFAULT_END_TIME_COLUMN.into(),
            system: DEFAULT_SYSTEM_COLUMN.into(),
        }
    }

    pub fn percent(numerator: &str, denominator: &str) -> Self {
        AggregatorFactory::Percent { numerator: numerator.into(), denominator: denominator.into() }
    }

    pub fn min(column: &str, numeric: NumericKind) -> Self {
        AggregatorFactory::Min { column: column.into(), numeric }
    }

    pub fn max(column: &str, numeric: NumericKind) -> Self {
        AggregatorFactory::Max { column: column.into(), numeric }
    }

    /// Point a per-minute rate at the data source's window and system
    /// columns. The other kinds read value columns only and come back as is.
    pub fn with_row_columns(self, start_time: &str, end_time: &str, system: &str) -> Self {
        match self {
            AggregatorFactory::NaturalPerMinute { counter, .. } => AggregatorFactory::NaturalPerMinute {
                counter,
                start_time: start_time.into(),
                end_time: end_time.into(),
                system: system.into(),
            },
            other => other,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AggregatorFactory::Sum { .. } => "sum",
            AggregatorFactory::Average { .. } => "average",
            AggregatorFactory::NaturalAverage { .. } => "natural_average",
            AggregatorFactory::NaturalPerMinute { .. } => "natural_per_minute",
            AggregatorFactory::Percent { .. } => "percent",
            AggregatorFactory::Min { .. } => "min",
            AggregatorFactory::Max { .. } => "max",
        }
    }

    /// Every column this factory reads, in a stable order.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            AggregatorFactory::Sum { column, .. }
            | AggregatorFactory::Average { column }
            | AggregatorFactory::Min { column, .. }
            | AggregatorFactory::Max { column, .. } => vec![column.as_str()],
            AggregatorFactory::NaturalAverage { numerator, denominator }
            | AggregatorFactory::Percent { numerator, denominator } => vec![numerator.as_str(), denominator.as_str()],
            AggregatorFactory::NaturalPerMinute { counter, start_time, end_time, system } => {
                vec![counter.as_str(), start_time.as_str(), end_time.as_str(), system.as_str()]
            }
        }
    }

    pub fn new_aggregator(&self) -> Aggregator {
        Aggregator::new(self.clone())
    }
}
