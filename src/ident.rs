//! System and group identifiers
//! ----------------------------
//! Tokens in a series definition name systems as `DBID.<n>` and groups as
//! `DBID.GROUP.<n>`, where `DBID` is the `XXXX-XXXX` identity of the
//! database they live in. Every identifier is scoped to exactly one database.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::time::{Clock, SystemClock};

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z0-9]{4}-[A-Z0-9]{4})\.(?:(GROUP)\.)?(\d+)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SystemId {
    pub database_id: String,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId {
    pub database_id: String,
    pub id: i64,
}

impl SystemId {
    pub fn new(database_id: impl Into<String>, id: i64) -> Self {
        Self { database_id: database_id.into(), id }
    }
}

impl GroupId {
    pub fn new(database_id: impl Into<String>, id: i64) -> Self {
        Self { database_id: database_id.into(), id }
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database_id, self.id)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.GROUP.{}", self.database_id, self.id)
    }
}

/// Either a single system or a group of systems.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Id {
    System(SystemId),
    Group(GroupId),
}

impl Id {
    pub fn parse(token: &str) -> AppResult<Id> {
        let t = token.trim();
        let caps = ID_RE.captures(t).ok_or_else(|| AppError::invalid_identifier(t))?;
        let database_id = caps[1].to_string();
        let id = caps[3].parse::<i64>().map_err(|_| AppError::invalid_identifier(t))?;
        Ok(if caps.get(2).is_some() {
            Id::Group(GroupId { database_id, id })
        } else {
            Id::System(SystemId { database_id, id })
        })
    }

    pub fn database_id(&self) -> &str {
        match self {
            Id::System(s) => &s.database_id,
            Id::Group(g) => &g.database_id,
        }
    }

    /// Fails with `ScopeMismatch` unless this id lives in `database`.
    pub fn ensure_scope(&self, database: &Database) -> AppResult<()> {
        if self.database_id() == database.id() {
            Ok(())
        } else {
            Err(AppError::scope_mismatch(self, database.id()))
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::System(s) => fmt::Display::fmt(s, f),
            Id::Group(g) => fmt::Display::fmt(g, f),
        }
    }
}

/// Handle on the monitoring database a request targets.
#[derive(Clone)]
pub struct Database {
    id: String,
    schema: Option<String>,
    changesets: BTreeSet<String>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("id", &self.id)
            .field("schema", &self.schema)
            .field("changesets", &self.changesets)
            .finish()
    }
}

impl Database {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), schema: None, changesets: BTreeSet::new(), clock: Arc::new(SystemClock) }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        let s = schema.into();
        self.schema = if s.trim().is_empty() { None } else { Some(s.trim().to_string()) };
        self
    }

    pub fn with_changesets<I, S>(mut self, changesets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changesets.extend(changesets.into_iter().map(Into::into));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// `"<schema>."` when a schema is configured, otherwise empty.
    pub fn schema_prefix(&self) -> String {
        self.schema.as_ref().map(|s| format!("{}.", s)).unwrap_or_default()
    }

    pub fn has_changeset(&self, changeset: &str) -> bool {
        self.changesets.contains(changeset)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }
}
