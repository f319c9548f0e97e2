//! Templates for the monitor categories every perfmon database carries.

use super::{AggregationMethod::*, CategoryTemplate, Field};
use crate::aggregate::{AggregatorFactory as F, NumericKind};

/// Changeset that added the SQL timing columns to interval data.
pub const SQL_DURATION_CHANGESET: &str = "0002.0";
/// Changeset that added CPU load columns to JVM snapshots.
pub const CPU_LOAD_CHANGESET: &str = "0003.0";

const INT: NumericKind = NumericKind::Integer;
const FLOAT: NumericKind = NumericKind::Float;

// Point-in-time reading: averaged by default, extremes and totals on request.
fn gauge(name: &str, column: &str, numeric: NumericKind) -> Field {
    Field::new(name, column, Average)
        .with(Average, F::average(column))
        .with(Max, F::max(column, numeric))
        .with(Min, F::min(column, numeric))
        .with(Sum, F::sum(column, numeric))
}

fn counter(name: &str, column: &str) -> Field {
    Field::new(name, column, Sum)
        .with(Sum, F::sum(column, INT))
        .with(Max, F::max(column, INT))
        .with(Min, F::min(column, INT))
}

fn per_minute(name: &str, column: &str, counter_column: &str) -> Field {
    Field::new(name, column, Natural)
        .with(Natural, F::natural_per_minute(counter_column))
        .with(Max, F::max(column, FLOAT))
        .with(Min, F::min(column, FLOAT))
}

pub fn interval_template() -> CategoryTemplate {
    CategoryTemplate::new(
        "Interval",
        vec![
            Field::new("maxActiveThreads", "MaxActiveThreads", Max)
                .with(Max, F::max("MaxActiveThreads", INT))
                .with(Min, F::min("MaxActiveThreads", INT))
                .with(Average, F::average("MaxActiveThreads"))
                .with(Sum, F::sum("MaxActiveThreads", INT)),
            Field::new("maxDuration", "MaxDuration", Max)
                .with(Max, F::max("MaxDuration", INT))
                .with(Min, F::min("MaxDuration", INT)),
            Field::new("minDuration", "MinDuration", Min)
                .with(Min, F::min("MinDuration", INT))
                .with(Max, F::max("MinDuration", INT)),
            Field::new("avgDuration", "AverageDuration", Natural)
                .with(Natural, F::natural_average("DurationSum", "TotalCompletions"))
                .with(Average, F::average("AverageDuration"))
                .with(Max, F::max("AverageDuration", FLOAT))
                .with(Min, F::min("AverageDuration", FLOAT)),
            per_minute("throughputPerMinute", "NormalizedThroughputPerMinute", "TotalCompletions"),
            counter("totalHits", "TotalHits"),
            counter("totalCompletions", "TotalCompletions"),
            counter("durationSum", "DurationSum").internal(),
            Field::new("maxSQLDuration", "MaxSQLDuration", Max)
                .with(Max, F::max("MaxSQLDuration", INT))
                .with(Min, F::min("MaxSQLDuration", INT))
                .requires_changeset(SQL_DURATION_CHANGESET),
            Field::new("avgSQLDuration", "AverageSQLDuration", Natural)
                .with(Natural, F::natural_average("SQLDurationSum", "TotalCompletions"))
                .with(Average, F::average("AverageSQLDuration"))
                .with(Max, F::max("AverageSQLDuration", FLOAT))
                .requires_changeset(SQL_DURATION_CHANGESET),
            counter("sqlDurationSum", "SQLDurationSum").internal().requires_changeset(SQL_DURATION_CHANGESET),
        ],
    )
}

pub fn jvm_template() -> CategoryTemplate {
    CategoryTemplate::new(
        "JVM",
        vec![
            gauge("currentClassLoadCount", "CurrentClassLoadCount", INT),
            gauge("pendingClassFinalizationCount", "PendingClassFinalizationCount", INT),
            gauge("currentThreadCount", "CurrentThreadCount", INT),
            gauge("heapMemUsedMB", "HeapMemUsedMB", FLOAT),
            gauge("heapMemMaxMB", "HeapMemMaxMB", FLOAT).internal(),
            Field::new("heapMemUsedPercent", "HeapMemUsedMB", Natural)
                .with(Natural, F::percent("HeapMemUsedMB", "HeapMemMaxMB")),
            gauge("nonHeapMemUsedMB", "NonHeapMemUsedMB", FLOAT),
            per_minute("classesLoadedPerMinute", "ClassesLoadedPerMinute", "ClassLoadCountInPeriod"),
            gauge("systemCpuLoad", "SystemCpuLoad", FLOAT).requires_changeset(CPU_LOAD_CHANGESET),
            gauge("processCpuLoad", "ProcessCpuLoad", FLOAT).requires_changeset(CPU_LOAD_CHANGESET),
        ],
    )
}

pub fn garbage_collection_template() -> CategoryTemplate {
    CategoryTemplate::new(
        "GarbageCollection",
        vec![
            counter("numCollections", "NumCollections"),
            counter("collectionMillis", "CollectionMillis"),
            per_minute("numCollectionsPerMinute", "NumCollectionsPerMinute", "NumCollections"),
            per_minute("collectionMillisPerMinute", "CollectionMillisPerMinute", "CollectionMillis"),
        ],
    )
}

pub fn builtin_templates() -> Vec<CategoryTemplate> {
    vec![interval_template(), jvm_template(), garbage_collection_template()]
}
