//! Aggregation framework.
//! An `AggregatorFactory` is an immutable description of which columns to read
//! and how to combine them; `new_aggregator` hands out a fresh single-use
//! `Aggregator` for each (series, time bucket) evaluated by a query.

pub mod aggregator;
pub mod factory;
pub mod row;

pub use aggregator::*;
pub use factory::*;
pub use row::*;

#[cfg(test)]
#[path = "aggregate/aggregate_tests.rs"]
mod tests;
