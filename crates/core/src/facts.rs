//! Path-addressed configuration facts
//!
//! Host resolution only needs three kinds of lookups, addressed by slash
//! separated paths. Task and role names may themselves contain slashes, so
//! paths are matched by prefix and suffix rather than split:
//!
//! - `tasks/<name>/options/hosts`
//! - `tasks/<name>/options/roles`
//! - `roles/<role>`
//!
//! [`FactSource`] keeps the resolver independent of where those values come
//! from. [`VolleyConfig`] is the production source; a plain `HashMap` works
//! for embedding and tests.

use std::collections::HashMap;

use crate::configs::{OneOrMany, VolleyConfig};

/// A configured value: either a single scalar or a list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fact {
    Scalar(String),
    List(Vec<String>),
}

impl Fact {
    pub fn into_list(self) -> Vec<String> {
        match self {
            Fact::Scalar(value) => vec![value],
            Fact::List(values) => values,
        }
    }
}

impl From<&OneOrMany> for Fact {
    fn from(value: &OneOrMany) -> Self {
        match value {
            OneOrMany::One(v) => Fact::Scalar(v.clone()),
            OneOrMany::Many(vs) => Fact::List(vs.clone()),
        }
    }
}

/// Read-only access to configuration facts.
///
/// `None` means the path is not configured at all, which is distinct from a
/// configured empty list.
pub trait FactSource {
    fn get(&self, path: &str) -> Option<Fact>;
}

pub fn task_hosts_path(task_name: &str) -> String {
    format!("tasks/{}/options/hosts", task_name)
}

pub fn task_roles_path(task_name: &str) -> String {
    format!("tasks/{}/options/roles", task_name)
}

pub fn role_path(role: &str) -> String {
    format!("roles/{}", role)
}

impl FactSource for VolleyConfig {
    fn get(&self, path: &str) -> Option<Fact> {
        if let Some(rest) = path.strip_prefix("tasks/") {
            if let Some(task) = rest.strip_suffix("/options/hosts") {
                return self.tasks.get(task)?.options.hosts.as_ref().map(Fact::from);
            }
            if let Some(task) = rest.strip_suffix("/options/roles") {
                return self.tasks.get(task)?.options.roles.as_ref().map(Fact::from);
            }
            return None;
        }
        let role = path.strip_prefix("roles/")?;
        self.roles.get(role).map(Fact::from)
    }
}

impl FactSource for HashMap<String, Fact> {
    fn get(&self, path: &str) -> Option<Fact> {
        HashMap::get(self, path).cloned()
    }
}
