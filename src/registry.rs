//! Category template registry
//! --------------------------
//! Maps template names to their field catalogs and resolves a parsed series
//! definition into a `SeriesField`. A `TemplateRegistry` is built once and then
//! read concurrently; `SharedTemplateRegistry` swaps whole snapshots on the rare
//! late registration.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::RwLock;
use tracing::{debug, info};

pub mod builtin;
pub mod method;
pub mod provider;
pub mod template;

pub use method::*;
pub use provider::*;
pub use template::*;

use crate::error::{AppError, AppResult};
use crate::ident::Database;
use crate::series::ParsedSeriesDefinition;

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Arc<CategoryTemplate>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the Interval, JVM and GarbageCollection templates.
    pub fn with_builtin_templates() -> AppResult<Self> {
        let mut reg = Self::new();
        for t in builtin::builtin_templates() {
            reg.register(t)?;
        }
        Ok(reg)
    }

    /// Validate and add a template, replacing any template of the same name.
    pub fn register(&mut self, template: CategoryTemplate) -> AppResult<()> {
        template.validate()?;
        info!(target: "perfseries::registry", "registered category template '{}' ({} fields)", template.name, template.fields.len());
        self.templates.insert(template.name.clone(), Arc::new(template));
        Ok(())
    }

    /// Register every template in a JSON array of templates.
    pub fn load_json(&mut self, json: &str) -> AppResult<usize> {
        let templates: Vec<CategoryTemplate> =
            serde_json::from_str(json).map_err(|e| AppError::Config(format!("invalid template catalog: {}", e)))?;
        let n = templates.len();
        for t in templates {
            self.register(t)?;
        }
        Ok(n)
    }

    pub fn load_json_file(&mut self, path: &Path) -> AppResult<usize> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading template catalog {}", path.display()))?;
        self.load_json(&text)
    }

    pub fn template_names(&self) -> Vec<&str> {
        self.templates.keys().map(|k| k.as_str()).collect()
    }

    pub fn lookup_template(&self, name: &str) -> AppResult<Arc<CategoryTemplate>> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::template_not_found(name))
    }

    /// Fields of `template` that `database` can serve. Gated fields whose
    /// changeset is missing are left out rather than reported.
    pub fn list_fields(&self, template: &str, database: &Database, include_internal: bool) -> AppResult<Vec<Field>> {
        let t = self.lookup_template(template)?;
        Ok(t.visible_fields(database, include_internal).cloned().collect())
    }

    pub fn resolve_field(&self, def: &ParsedSeriesDefinition, database: &Database) -> AppResult<SeriesField> {
        let category = Category::parse(&def.category_name)?;
        let template = self.lookup_template(&category.template_name)?;
        let field = template
            .get_field(&def.field_name)
            .filter(|f| {
                let available = f.is_available(database);
                if !available {
                    debug!(target: "perfseries::registry", "field '{}' hidden: database {} lacks changeset {:?}", f.name, database.id(), f.required_changeset);
                }
                available
            })
            .ok_or_else(|| AppError::field_not_found(&def.field_name, &template.name))?;
        let method = def.aggregation_method.unwrap_or(field.default_method);
        SeriesField::new(method, category, field.clone())
    }
}

/// Process-wide handle: readers take a cheap snapshot, writers replace it.
#[derive(Debug, Clone, Default)]
pub struct SharedTemplateRegistry {
    inner: Arc<RwLock<Arc<TemplateRegistry>>>,
}

impl SharedTemplateRegistry {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(registry))) }
    }

    pub fn snapshot(&self) -> Arc<TemplateRegistry> {
        Arc::clone(&self.inner.read())
    }

    pub fn register(&self, template: CategoryTemplate) -> AppResult<()> {
        let mut guard = self.inner.write();
        let mut next = TemplateRegistry::clone(&guard);
        next.register(template)?;
        *guard = Arc::new(next);
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry/registry_tests.rs"]
mod tests;
