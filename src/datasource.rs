//! End-to-end series query
//! -----------------------
//! Drives one request: parse the definition text, expand groups, resolve each
//! clause to a `SeriesField`, pull rows from the provider that owns the
//! category template and fold them into a `ResultAccumulator`.
//!
//! A `SeriesQuery` borrows everything it needs and holds no state between
//! evaluations, so independent queries can run on separate threads against
//! the same registries.

use serde::Serialize;
use tracing::debug;

use crate::accumulator::{QueryResult, ResultAccumulator};
use crate::config::DataSourceConfig;
use crate::error::AppResult;
use crate::groups::{GroupMembership, SystemToGroupMapper};
use crate::ident::Database;
use crate::registry::{DataProviderRegistry, FetchRequest, SeriesField};
use crate::series::{ParsedSeriesDefinition, SeriesDefinitionParser, SERIES_SEPARATOR};
use crate::time::{DateTimeHelper, DateTimeValue};

/// One resolved output series, before any rows are read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPlan {
    pub name: String,
    pub definition: ParsedSeriesDefinition,
    pub series: SeriesField,
    /// Columns the provider has to return for this series.
    pub columns: Vec<String>,
}

/// Query window resolved from the start/end text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryWindow {
    pub start: DateTimeValue,
    pub end: DateTimeValue,
}

pub struct SeriesQuery<'a> {
    providers: &'a DataProviderRegistry,
    database: &'a Database,
    membership: &'a dyn GroupMembership,
    config: &'a DataSourceConfig,
    dates: DateTimeHelper,
}

impl<'a> SeriesQuery<'a> {
    pub fn new(
        providers: &'a DataProviderRegistry,
        database: &'a Database,
        membership: &'a dyn GroupMembership,
        config: &'a DataSourceConfig,
    ) -> Self {
        Self { providers, database, membership, config, dates: DateTimeHelper::new(database.clock()) }
    }

    pub fn database(&self) -> &Database {
        self.database
    }

    /// Parse and resolve `text` without touching any provider.
    ///
    /// `aliases` is `_`-separated and positional: the n-th alias names the
    /// n-th non-blank clause. Missing or blank aliases fall back to the
    /// canonical clause text.
    pub fn plan(&self, text: &str, aliases: Option<&str>) -> AppResult<Vec<SeriesPlan>> {
        let mapper = SystemToGroupMapper::new(self.database, self.membership);
        let definitions = SeriesDefinitionParser::new(&mapper).parse(text)?;
        let names: Vec<&str> = aliases
            .map(|a| a.split(SERIES_SEPARATOR).map(str::trim).collect())
            .unwrap_or_default();

        definitions
            .into_iter()
            .enumerate()
            .map(|(i, definition)| -> AppResult<SeriesPlan> {
                let series = self.providers.resolve_field(&definition, self.database)?.with_row_columns(
                    &self.config.start_time_column,
                    &self.config.time_column,
                    &self.config.system_column,
                );
                let name = match names.get(i) {
                    Some(alias) if !alias.is_empty() => alias.to_string(),
                    _ => definition.to_string(),
                };
                let columns = series.select_columns().into_iter().map(str::to_string).collect();
                Ok(SeriesPlan { name, definition, series, columns })
            })
            .collect()
    }

    /// Resolve the start and end text, each with its optional adjustment marker.
    pub fn window(&self, start: &str, end: &str) -> AppResult<QueryWindow> {
        Ok(QueryWindow { start: self.dates.parse_adjusted(start)?, end: self.dates.parse_adjusted(end)? })
    }

    pub fn evaluate(&self, text: &str, start: &str, end: &str, aliases: Option<&str>) -> AppResult<QueryResult> {
        let plans = self.plan(text, aliases)?;
        let window = self.window(start, end)?;
        debug!(
            target: "perfseries::datasource",
            "evaluating {} series on {} from {} to {}",
            plans.len(),
            self.database.id(),
            window.start.fixed_date_time,
            window.end.fixed_date_time
        );

        let mut acc = ResultAccumulator::new(&window.start, &window.end, self.config.max_points_per_series)?
            .with_time_column(&self.config.time_column);
        for plan in &plans {
            let provider = self.providers.provider_for(&plan.series.category.template_name)?;
            let idx = acc.add_series(plan.name.clone(), plan.series.clone(), plan.definition.systems.clone());
            let request = FetchRequest {
                series: &plan.series,
                systems: &plan.definition.systems,
                start: window.start.time_for_start,
                end: window.end.time_for_end,
                time_column: &self.config.time_column,
                system_column: &self.config.system_column,
            };
            let mut fed = 0usize;
            for row in provider.fetch(self.database, &request)? {
                let row = row?;
                if acc.accumulate(idx, &*row)? {
                    fed += 1;
                }
            }
            debug!(target: "perfseries::datasource", "series '{}' aggregated {} rows", plan.name, fed);
        }
        acc.render(self.config.precision)
    }
}
