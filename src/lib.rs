//! Performance time-series query core: the series-definition language,
//! category templates, group expansion, aggregation and result bucketing.

pub mod accumulator;
pub mod aggregate;
pub mod config;
pub mod datasource;
pub mod error;
pub mod groups;
pub mod ident;
pub mod registry;
pub mod series;
pub mod time;

pub use accumulator::{QueryResult, ResultAccumulator, SeriesPoint, SeriesResult};
pub use config::DataSourceConfig;
pub use datasource::{QueryWindow, SeriesPlan, SeriesQuery};
pub use error::{AppError, AppResult};
