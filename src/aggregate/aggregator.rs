use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AggregatorFactory, NumericKind, Row, RowValue};
use crate::error::AppResult;
use crate::time::MILLIS_PER_MINUTE;

/// Aggregated value. `None` at the call site means "no data" or "undefined".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Integer(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// Rounded, saturating integer view.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Number::Integer(v) => v,
            Number::Float(v) => v.round() as i64,
        }
    }

    /// Round floats to `places` decimals; integers pass through.
    pub fn rounded(self, places: u32) -> Number {
        match self {
            Number::Integer(_) => self,
            Number::Float(v) => {
                let scale = 10f64.powi(places as i32);
                let r = (v * scale).round() / scale;
                // Values beyond the scaled range cannot gain precision from rounding
                Number::Float(if r.is_finite() { r } else { v })
            }
        }
    }
}

/// Sum that cannot overflow for i64 inputs: integers accumulate in i128 and
/// the first floating value promotes the total to f64.
#[derive(Debug, Clone, Copy, PartialEq)]
enum WideSum {
    Integer(i128),
    Float(f64),
}

impl Default for WideSum {
    fn default() -> Self { WideSum::Integer(0) }
}

impl WideSum {
    fn add(&mut self, value: RowValue) {
        *self = match (*self, value) {
            (WideSum::Integer(total), RowValue::Integer(v)) => match total.checked_add(v as i128) {
                Some(t) => WideSum::Integer(t),
                None => WideSum::Float(total as f64 + v as f64),
            },
            (WideSum::Integer(total), RowValue::Float(v)) => WideSum::Float(total as f64 + v),
            (WideSum::Float(total), v) => WideSum::Float(total + v.as_f64()),
        };
    }

    fn as_f64(&self) -> f64 {
        match *self {
            WideSum::Integer(v) => v as f64,
            WideSum::Float(v) => v,
        }
    }

    fn is_zero(&self) -> bool {
        match *self {
            WideSum::Integer(v) => v == 0,
            WideSum::Float(v) => v == 0.0,
        }
    }

    fn to_number(self, numeric: NumericKind) -> Number {
        match (self, numeric) {
            (WideSum::Integer(v), NumericKind::Integer) => match i64::try_from(v) {
                Ok(n) => Number::Integer(n),
                Err(_) => Number::Float(v as f64),
            },
            (other, _) => Number::Float(other.as_f64()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Extremum {
    Integer(i64),
    Float(f64),
}

#[derive(Debug, Clone, Default)]
struct SystemWindow {
    counter: WideSum,
    elapsed_millis: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Keep {
    Smallest,
    Largest,
}

impl Keep {
    fn prefers<T: PartialOrd>(self, candidate: T, current: T) -> bool {
        match self {
            Keep::Smallest => candidate < current,
            Keep::Largest => candidate > current,
        }
    }
}

/// Running state, carrying the columns it reads so each kind is matched once.
#[derive(Debug, Clone)]
enum State {
    Sum {
        column: String,
        numeric: NumericKind,
        total: Option<WideSum>,
    },
    Average {
        column: String,
        sum: WideSum,
        rows: u64,
    },
    /// Summed numerator over summed denominator, times `scale`.
    Ratio {
        numerator_column: String,
        denominator_column: String,
        scale: f64,
        numerator: WideSum,
        denominator: WideSum,
        rows: u64,
    },
    PerMinute {
        counter: String,
        start_time: String,
        end_time: String,
        system: String,
        windows: BTreeMap<i64, SystemWindow>,
    },
    Extremum {
        column: String,
        numeric: NumericKind,
        keep: Keep,
        current: Option<Extremum>,
    },
}

impl State {
    fn ratio(numerator: &str, denominator: &str, scale: f64) -> Self {
        State::Ratio {
            numerator_column: numerator.to_string(),
            denominator_column: denominator.to_string(),
            scale,
            numerator: WideSum::default(),
            denominator: WideSum::default(),
            rows: 0,
        }
    }
}

/// Single-use, row-at-a-time accumulator produced by an `AggregatorFactory`.
#[derive(Debug, Clone)]
pub struct Aggregator {
    factory: AggregatorFactory,
    state: State,
}

impl Aggregator {
    pub(crate) fn new(factory: AggregatorFactory) -> Self {
        let state = match &factory {
            AggregatorFactory::Sum { column, numeric } => {
                State::Sum { column: column.clone(), numeric: *numeric, total: None }
            }
            AggregatorFactory::Average { column } => {
                State::Average { column: column.clone(), sum: WideSum::default(), rows: 0 }
            }
            AggregatorFactory::NaturalAverage { numerator, denominator } => State::ratio(numerator, denominator, 1.0),
            AggregatorFactory::Percent { numerator, denominator } => State::ratio(numerator, denominator, 100.0),
            AggregatorFactory::NaturalPerMinute { counter, start_time, end_time, system } => State::PerMinute {
                counter: counter.clone(),
                start_time: start_time.clone(),
                end_time: end_time.clone(),
                system: system.clone(),
                windows: BTreeMap::new(),
            },
            AggregatorFactory::Min { column, numeric } => {
                State::Extremum { column: column.clone(), numeric: *numeric, keep: Keep::Smallest, current: None }
            }
            AggregatorFactory::Max { column, numeric } => {
                State::Extremum { column: column.clone(), numeric: *numeric, keep: Keep::Largest, current: None }
            }
        };
        Self { factory, state }
    }

    pub fn factory(&self) -> &AggregatorFactory {
        &self.factory
    }

    /// Feed one row. Rows with a NULL in any bound column contribute nothing.
    pub fn aggregate(&mut self, row: &dyn Row) -> AppResult<()> {
        match &mut self.state {
            State::Sum { column, numeric, total } => {
                if let Some(v) = row.value(column)? {
                    total.get_or_insert_with(WideSum::default).add(coerce(v, *numeric));
                }
            }
            State::Average { column, sum, rows } => {
                if let Some(v) = row.value(column)? {
                    sum.add(v);
                    *rows += 1;
                }
            }
            State::Ratio { numerator_column, denominator_column, numerator, denominator, rows, .. } => {
                if let (Some(n), Some(d)) = (row.value(numerator_column)?, row.value(denominator_column)?) {
                    numerator.add(n);
                    denominator.add(d);
                    *rows += 1;
                }
            }
            State::PerMinute { counter, start_time, end_time, system, windows } => {
                let values = (row.value(counter)?, row.long(start_time)?, row.long(end_time)?, row.long(system)?);
                if let (Some(count), Some(start), Some(end), Some(system_id)) = values {
                    let window = windows.entry(system_id).or_default();
                    window.counter.add(count);
                    window.elapsed_millis = window.elapsed_millis.saturating_add(end.saturating_sub(start).max(0));
                }
            }
            State::Extremum { column, numeric, keep, current } => {
                if let Some(v) = row.value(column)? {
                    *current = Some(pick(*current, coerce(v, *numeric), *keep));
                }
            }
        }
        Ok(())
    }

    pub fn result(&self) -> Option<Number> {
        match &self.state {
            State::Sum { numeric, total, .. } => total.map(|t| t.to_number(*numeric)),
            State::Average { sum, rows, .. } => (*rows > 0).then(|| Number::Float(sum.as_f64() / *rows as f64)),
            State::Ratio { scale, numerator, denominator, rows, .. } => {
                if *rows == 0 || denominator.is_zero() {
                    return None;
                }
                Some(Number::Float(numerator.as_f64() / denominator.as_f64() * scale))
            }
            State::PerMinute { windows, .. } => {
                let mut rate: Option<f64> = None;
                for w in windows.values().filter(|w| w.elapsed_millis > 0) {
                    let minutes = w.elapsed_millis as f64 / MILLIS_PER_MINUTE as f64;
                    *rate.get_or_insert(0.0) += w.counter.as_f64() / minutes;
                }
                rate.map(Number::Float)
            }
            State::Extremum { current, .. } => current.map(|e| match e {
                Extremum::Integer(v) => Number::Integer(v),
                Extremum::Float(v) => Number::Float(v),
            }),
        }
    }
}

/// Convert a cell to the column's declared kind before it is accumulated.
fn coerce(value: RowValue, numeric: NumericKind) -> RowValue {
    match numeric {
        NumericKind::Integer => RowValue::Integer(value.as_i64()),
        NumericKind::Float => RowValue::Float(value.as_f64()),
    }
}

fn pick(current: Option<Extremum>, value: RowValue, keep: Keep) -> Extremum {
    match (value, current) {
        (RowValue::Integer(v), Some(Extremum::Integer(c))) => Extremum::Integer(if keep.prefers(v, c) { v } else { c }),
        (RowValue::Float(v), Some(Extremum::Float(c))) => Extremum::Float(if keep.prefers(v, c) { v } else { c }),
        (RowValue::Integer(v), _) => Extremum::Integer(v),
        (RowValue::Float(v), _) => Extremum::Float(v),
    }
}
