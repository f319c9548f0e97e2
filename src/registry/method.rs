use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How values from contributing rows and systems are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregationMethod {
    Sum,
    Max,
    Min,
    Average,
    /// Numerator/denominator or per-minute combination bound by the field.
    Natural,
}

impl AggregationMethod {
    pub const ALL: [AggregationMethod; 5] = [
        AggregationMethod::Sum,
        AggregationMethod::Max,
        AggregationMethod::Min,
        AggregationMethod::Average,
        AggregationMethod::Natural,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationMethod::Sum => "SUM",
            AggregationMethod::Max => "MAX",
            AggregationMethod::Min => "MIN",
            AggregationMethod::Average => "AVERAGE",
            AggregationMethod::Natural => "NATURAL",
        }
    }
}

impl fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationMethod {
    type Err = AppError;

    /// Case-sensitive: `MAX` parses, `max` does not.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationMethod::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| AppError::invalid_method(s))
    }
}
