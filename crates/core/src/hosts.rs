//! Target host resolution
//!
//! A task reaches hosts in two ways: an explicit `hosts` option and a `roles`
//! option whose members are looked up in the top level `roles` map. The
//! resolver merges both into a [`HostSet`], keeping the first occurrence of
//! every host.
//!
//! When a task configures neither option it is a *local run*: it resolves to
//! the [`LOCAL_HOST`] pseudo-host and the task body is told not to use the
//! remote shell.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::facts::{role_path, task_hosts_path, task_roles_path, Fact, FactSource};

/// Pseudo-host used for tasks without any configured targets
pub const LOCAL_HOST: &str = "127.0.0.1";

/// How a `hosts` or `roles` option was configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSpec {
    Unset,
    Empty,
    Populated(Vec<String>),
}

impl HostSpec {
    pub fn from_fact(fact: Option<Fact>) -> Self {
        match fact.map(Fact::into_list) {
            None => HostSpec::Unset,
            Some(values) if values.is_empty() => HostSpec::Empty,
            Some(values) => HostSpec::Populated(values),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, HostSpec::Unset)
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            HostSpec::Populated(values) => values,
            HostSpec::Unset | HostSpec::Empty => Vec::new(),
        }
    }
}

/// Ordered set of unique hosts, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HostSet(Vec<String>);

impl HostSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set holding only the local pseudo-host
    pub fn local() -> Self {
        Self(vec![LOCAL_HOST.to_string()])
    }

    /// Append `host` unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, host: String) -> bool {
        if self.contains(&host) {
            return false;
        }
        self.0.push(host);
        true
    }

    pub fn contains(&self, host: &str) -> bool {
        self.0.iter().any(|h| h == host)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl FromIterator<String> for HostSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = HostSet::new();
        for host in iter {
            set.insert(host);
        }
        set
    }
}

impl<'a> IntoIterator for &'a HostSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for HostSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// Result of resolving the targets of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub hosts: HostSet,
    /// No remote targets are configured; the task body must not use the remote shell.
    pub local_run: bool,
}

/// Turns task names into target host sets
pub struct HostResolver<'a, F: FactSource + ?Sized> {
    facts: &'a F,
}

impl<'a, F: FactSource + ?Sized> HostResolver<'a, F> {
    pub fn new(facts: &'a F) -> Self {
        Self { facts }
    }

    /// Resolve the target hosts of `task_name`. Never fails: unknown roles
    /// contribute nothing and a task without targets becomes a local run.
    pub fn resolve(&self, task_name: &str) -> Resolution {
        let direct = HostSpec::from_fact(self.facts.get(&task_hosts_path(task_name)));
        let roles = HostSpec::from_fact(self.facts.get(&task_roles_path(task_name)));

        if direct.is_unset() && roles.is_unset() {
            debug!(task = task_name, "no hosts or roles configured, running locally");
            return Resolution {
                hosts: HostSet::local(),
                local_run: true,
            };
        }

        let mut hosts: HostSet = direct.into_vec().into_iter().collect();
        for role in roles.into_vec() {
            match self.facts.get(&role_path(&role)) {
                Some(members) => {
                    for host in members.into_list() {
                        hosts.insert(host);
                    }
                }
                None => warn!(task = task_name, role = %role, "role is not defined, skipping"),
            }
        }

        debug!(task = task_name, hosts = %hosts, "resolved target hosts");
        Resolution {
            hosts,
            local_run: false,
        }
    }
}
