//! Group expansion: turns a mix of system and group identifiers into the
//! distinct systems they name, scoped to one database.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::AppResult;
use crate::ident::{Database, GroupId, Id, SystemId};

/// Membership lookup backed by the monitoring database.
pub trait GroupMembership: Send + Sync {
    fn systems_for_group(&self, database: &Database, group: &GroupId) -> AppResult<Vec<SystemId>>;
}

/// Fixed membership table, used for tests and for databases without group tables.
#[derive(Debug, Clone, Default)]
pub struct StaticGroupMembership {
    groups: HashMap<GroupId, Vec<SystemId>>,
}

impl StaticGroupMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: GroupId, systems: Vec<SystemId>) -> Self {
        self.groups.insert(group, systems);
        self
    }
}

impl GroupMembership for StaticGroupMembership {
    fn systems_for_group(&self, _database: &Database, group: &GroupId) -> AppResult<Vec<SystemId>> {
        match self.groups.get(group) {
            Some(systems) => Ok(systems.clone()),
            None => {
                warn!(target: "perfseries::groups", "group {} has no members", group);
                Ok(Vec::new())
            }
        }
    }
}

pub struct SystemToGroupMapper<'a> {
    database: &'a Database,
    membership: &'a dyn GroupMembership,
}

impl<'a> SystemToGroupMapper<'a> {
    pub fn new(database: &'a Database, membership: &'a dyn GroupMembership) -> Self {
        Self { database, membership }
    }

    pub fn database(&self) -> &Database {
        self.database
    }

    /// Expand groups and drop duplicates. Output keeps first-seen order so the
    /// same input always yields the same query plan.
    pub fn resolve_groups_to_systems(&self, ids: &[Id]) -> AppResult<Vec<SystemId>> {
        // Validate every scope before touching the membership lookup
        for id in ids {
            id.ensure_scope(self.database)?;
        }
        let mut seen: HashSet<SystemId> = HashSet::new();
        let mut out: Vec<SystemId> = Vec::new();
        let mut push = |s: SystemId| {
            if seen.insert(s.clone()) {
                out.push(s);
            }
        };
        for id in ids {
            match id {
                Id::System(s) => push(s.clone()),
                Id::Group(g) => {
                    let members = self.membership.systems_for_group(self.database, g)?;
                    debug!(target: "perfseries::groups", "group {} expands to {} systems", g, members.len());
                    for m in members {
                        Id::System(m.clone()).ensure_scope(self.database)?;
                        push(m);
                    }
                }
            }
        }
        Ok(out)
    }
}
