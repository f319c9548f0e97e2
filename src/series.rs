//! Series-definition mini-language
//! -------------------------------
//! `[METHOD~]SYSTEM[~SYSTEM...]~CATEGORY~FIELD`, with several series joined by
//! `_`. Systems are `DBID.n` or `DBID.GROUP.n`; groups are expanded through
//! the `SystemToGroupMapper` of the target database.
//!
//! ```text
//! MAX~ABCD-EFGH.1~Person.student~shoeSize
//! GRSK-VRTS.1~GRSK-VRTS.2~Interval.WebRequest.search~avgDuration
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::groups::SystemToGroupMapper;
use crate::ident::{Id, SystemId};
use crate::registry::AggregationMethod;

pub const SERIES_SEPARATOR: char = '_';
pub const TOKEN_SEPARATOR: char = '~';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSeriesDefinition {
    /// Explicit override; `None` means "use the field's default".
    pub aggregation_method: Option<AggregationMethod>,
    /// Distinct systems after group expansion, never empty.
    pub systems: Vec<SystemId>,
    pub category_name: String,
    pub field_name: String,
}

impl fmt::Display for ParsedSeriesDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(m) = self.aggregation_method {
            write!(f, "{}{}", m, TOKEN_SEPARATOR)?;
        }
        for s in &self.systems {
            write!(f, "{}{}", s, TOKEN_SEPARATOR)?;
        }
        write!(f, "{}{}{}", self.category_name, TOKEN_SEPARATOR, self.field_name)
    }
}

/// A leading token with neither `-` nor `.` can only be a method override.
fn is_method_token(token: &str) -> bool {
    !token.contains('-') && !token.contains('.')
}

pub struct SeriesDefinitionParser<'a> {
    mapper: &'a SystemToGroupMapper<'a>,
}

impl<'a> SeriesDefinitionParser<'a> {
    pub fn new(mapper: &'a SystemToGroupMapper<'a>) -> Self {
        Self { mapper }
    }

    /// Parse every `_`-separated clause of `text`, in order.
    pub fn parse(&self, text: &str) -> AppResult<Vec<ParsedSeriesDefinition>> {
        let clauses: Vec<&str> = text
            .split(SERIES_SEPARATOR)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        if clauses.is_empty() {
            return Err(AppError::empty_definition());
        }
        clauses.into_iter().map(|c| self.parse_clause(c)).collect()
    }

    /// Same as `parse` for input that may be absent.
    pub fn parse_opt(&self, text: Option<&str>) -> AppResult<Vec<ParsedSeriesDefinition>> {
        self.parse(text.ok_or_else(AppError::empty_definition)?)
    }

    fn parse_clause(&self, clause: &str) -> AppResult<ParsedSeriesDefinition> {
        let mut tokens: Vec<&str> = clause.split(TOKEN_SEPARATOR).map(str::trim).collect();

        let aggregation_method = match tokens.first() {
            Some(first) if is_method_token(first) => {
                let m = first.parse::<AggregationMethod>()?;
                tokens.remove(0);
                Some(m)
            }
            _ => None,
        };

        if tokens.len() < 3 {
            return Err(AppError::insufficient_fields(clause));
        }
        let field_name = tokens.pop().unwrap_or_default();
        let category_name = tokens.pop().unwrap_or_default();
        if field_name.is_empty() || category_name.is_empty() {
            return Err(AppError::insufficient_fields(clause));
        }

        let ids = tokens.iter().map(|t| Id::parse(t)).collect::<AppResult<Vec<Id>>>()?;
        let systems = self.mapper.resolve_groups_to_systems(&ids)?;
        if systems.is_empty() {
            return Err(AppError::MalformedDefinition(format!(
                "series definition \"{}\" does not resolve to any system",
                clause
            )));
        }

        let def = ParsedSeriesDefinition {
            aggregation_method,
            systems,
            category_name: category_name.to_string(),
            field_name: field_name.to_string(),
        };
        debug!(target: "perfseries::series", "parsed '{}' as {}", clause, def);
        Ok(def)
    }
}

#[cfg(test)]
#[path = "series_tests.rs"]
mod tests;
