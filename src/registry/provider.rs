use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{SeriesField, SharedTemplateRegistry};
use crate::aggregate::{MapRow, Row};
use crate::error::{AppError, AppResult};
use crate::ident::{Database, SystemId};
use crate::series::ParsedSeriesDefinition;

/// What a provider is asked to read for one output series.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub series: &'a SeriesField,
    pub systems: &'a [SystemId],
    /// Inclusive epoch-millis window.
    pub start: i64,
    pub end: i64,
    /// Row timestamp column the window applies to.
    pub time_column: &'a str,
    pub system_column: &'a str,
}

/// Forward-only row stream handed back by a provider.
pub type RowIter<'a> = Box<dyn Iterator<Item = AppResult<Box<dyn Row + 'a>>> + 'a>;

/// Owner of one category template's storage. Query building and the SQL
/// dialect live behind this trait.
pub trait DataProvider: Send + Sync {
    fn template_name(&self) -> &str;

    fn fetch<'a>(&'a self, database: &Database, request: &FetchRequest<'_>) -> AppResult<RowIter<'a>>;
}

/// Template registry plus the provider that owns each template.
#[derive(Clone, Default)]
pub struct DataProviderRegistry {
    templates: SharedTemplateRegistry,
    providers: BTreeMap<String, Arc<dyn DataProvider>>,
}

impl fmt::Debug for DataProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProviderRegistry")
            .field("templates", &self.templates.snapshot().template_names())
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DataProviderRegistry {
    pub fn new(templates: SharedTemplateRegistry) -> Self {
        Self { templates, providers: BTreeMap::new() }
    }

    pub fn templates(&self) -> &SharedTemplateRegistry {
        &self.templates
    }

    /// A provider can only be attached to a registered template.
    pub fn register_provider(&mut self, provider: Arc<dyn DataProvider>) -> AppResult<()> {
        let name = provider.template_name().to_string();
        self.templates.snapshot().lookup_template(&name)?;
        debug!(target: "perfseries::registry", "provider attached to template '{}'", name);
        self.providers.insert(name, provider);
        Ok(())
    }

    pub fn provider_for(&self, template_name: &str) -> AppResult<Arc<dyn DataProvider>> {
        self.providers
            .get(template_name)
            .cloned()
            .ok_or_else(|| AppError::template_not_found(template_name))
    }

    pub fn resolve_field(&self, def: &ParsedSeriesDefinition, database: &Database) -> AppResult<SeriesField> {
        self.templates.snapshot().resolve_field(def, database)
    }
}

#[derive(Debug, Clone)]
struct MemoryRecord {
    category: String,
    row: MapRow,
}

/// Provider over rows held in memory. Rows carry the system and time columns
/// named by the request; they are returned in insertion order.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    template_name: String,
    records: Vec<MemoryRecord>,
}

impl MemoryProvider {
    pub fn new(template_name: &str) -> Self {
        Self { template_name: template_name.to_string(), records: Vec::new() }
    }

    pub fn push(&mut self, category: &str, row: MapRow) {
        self.records.push(MemoryRecord { category: category.to_string(), row });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matches(&self, record: &MemoryRecord, request: &FetchRequest<'_>) -> AppResult<bool> {
        if record.category != request.series.category.name {
            return Ok(false);
        }
        let system = record.row.long(request.system_column)?;
        if !request.systems.iter().any(|s| Some(s.id) == system) {
            return Ok(false);
        }
        Ok(matches!(record.row.long(request.time_column)?, Some(t) if t >= request.start && t <= request.end))
    }
}

impl DataProvider for MemoryProvider {
    fn template_name(&self) -> &str {
        &self.template_name
    }

    fn fetch<'a>(&'a self, _database: &Database, request: &FetchRequest<'_>) -> AppResult<RowIter<'a>> {
        let mut rows: Vec<&'a MapRow> = Vec::new();
        for record in &self.records {
            if self.matches(record, request)? {
                rows.push(&record.row);
            }
        }
        Ok(Box::new(rows.into_iter().map(|r| Ok(Box::new(r) as Box<dyn Row + 'a>))))
    }
}
