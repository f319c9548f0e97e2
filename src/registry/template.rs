use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::AggregationMethod;
use crate::aggregate::AggregatorFactory;
use crate::error::{AppError, AppResult};
use crate::ident::Database;

fn default_true() -> bool { true }

/// A selectable (or internal) metric of a category template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Provider key: the column that backs this field when read directly.
    pub column: String,
    pub default_method: AggregationMethod,
    /// Supported methods and the factory each one uses.
    pub aggregators: BTreeMap<AggregationMethod, AggregatorFactory>,
    #[serde(default = "default_true")]
    pub primary: bool,
    /// Changeset the database must have applied for the field to exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_changeset: Option<String>,
}

impl Field {
    /// New primary field; register methods with `with` then pick a default.
    pub fn new(name: &str, column: &str, default_method: AggregationMethod) -> Self {
        Self {
            name: name.to_string(),
            column: column.to_string(),
            default_method,
            aggregators: BTreeMap::new(),
            primary: true,
            required_changeset: None,
        }
    }

    pub fn with(mut self, method: AggregationMethod, factory: AggregatorFactory) -> Self {
        self.aggregators.insert(method, factory);
        self
    }

    pub fn internal(mut self) -> Self {
        self.primary = false;
        self
    }

    pub fn requires_changeset(mut self, changeset: &str) -> Self {
        self.required_changeset = Some(changeset.to_string());
        self
    }

    pub fn is_supported(&self, method: AggregationMethod) -> bool {
        self.aggregators.contains_key(&method)
    }

    pub fn supported_methods(&self) -> Vec<AggregationMethod> {
        self.aggregators.keys().copied().collect()
    }

    pub fn factory(&self, method: AggregationMethod) -> Option<&AggregatorFactory> {
        self.aggregators.get(&method)
    }

    /// Gate check: is this field visible in `database`?
    pub fn is_available(&self, database: &Database) -> bool {
        self.required_changeset.as_deref().map(|c| database.has_changeset(c)).unwrap_or(true)
    }

    pub(crate) fn validate(&self, template: &str) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Config(format!("template \"{}\" has a field without a name", template)));
        }
        if self.aggregators.is_empty() {
            return Err(AppError::Config(format!(
                "field \"{}\" of template \"{}\" supports no aggregation method",
                self.name, template
            )));
        }
        if !self.is_supported(self.default_method) {
            return Err(AppError::Config(format!(
                "default aggregation method {} of field \"{}\" is not in its supported set",
                self.default_method, self.name
            )));
        }
        Ok(())
    }
}

/// Named catalog of fields shared by every category instance of the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTemplate {
    pub name: String,
    pub fields: Vec<Field>,
}

impl CategoryTemplate {
    pub fn new(name: &str, fields: Vec<Field>) -> Self {
        Self { name: name.to_string(), fields }
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields visible in `database`, in declaration order.
    pub fn visible_fields<'a>(&'a self, database: &'a Database, include_internal: bool) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields
            .iter()
            .filter(move |f| (include_internal || f.primary) && f.is_available(database))
    }

    pub(crate) fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() || self.name.contains('.') {
            return Err(AppError::Config(format!("invalid category template name \"{}\"", self.name)));
        }
        let mut seen = std::collections::HashSet::new();
        for f in &self.fields {
            f.validate(&self.name)?;
            if !seen.insert(f.name.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate field \"{}\" in template \"{}\"",
                    f.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// A category instance (`Interval.WebRequest.search`) and the template it instantiates (`Interval`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub template_name: String,
    pub name: String,
}

impl Category {
    /// The template name is the text before the first `.`; a name without a
    /// dot is its own template.
    pub fn parse(name: &str) -> AppResult<Category> {
        let name = name.trim();
        if name.is_empty() || name.split('.').any(|seg| seg.trim().is_empty()) {
            return Err(AppError::MalformedDefinition(format!("invalid category name \"{}\"", name)));
        }
        let template_name = name.split('.').next().unwrap_or(name).to_string();
        Ok(Category { template_name, name: name.to_string() })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Fully resolved unit of work: method, category and field, with the
/// factory the method selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesField {
    pub aggregation_method: AggregationMethod,
    pub category: Category,
    pub field: Field,
    #[serde(skip)]
    factory: AggregatorFactory,
}

impl SeriesField {
    /// Fails with `UnsupportedAggregationMethod` if `method` is not in the field's set.
    pub fn new(aggregation_method: AggregationMethod, category: Category, field: Field) -> AppResult<Self> {
        let factory = field
            .factory(aggregation_method)
            .cloned()
            .ok_or_else(|| AppError::unsupported_method(aggregation_method, &field.name))?;
        Ok(Self { aggregation_method, category, field, factory })
    }

    pub fn factory(&self) -> &AggregatorFactory {
        &self.factory
    }

    /// Rebind the factory to the row columns a data source is configured with.
    pub fn with_row_columns(mut self, start_time: &str, end_time: &str, system: &str) -> Self {
        self.factory = self.factory.with_row_columns(start_time, end_time, system);
        self
    }

    /// Columns the row source must supply for this series.
    pub fn select_columns(&self) -> Vec<&str> {
        let mut cols = self.factory.columns();
        if !cols.contains(&self.field.column.as_str()) {
            cols.insert(0, self.field.column.as_str());
        }
        cols
    }
}
