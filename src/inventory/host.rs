//! Host definition for the composite inventory.
//!
//! A host owns a variable mapping and its group memberships. The optional port
//! comes from a `host:port` pattern suffix in the source inventory.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// A managed host in the inventory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Host {
    /// Host name (can be hostname, IP, or alias)
    pub name: String,

    /// Connection port, when the source pattern carried a `:port` suffix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Host-specific variables
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub vars: IndexMap<String, serde_yaml::Value>,

    /// Groups this host belongs to
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub groups: IndexSet<String>,
}

impl Host {
    /// Create a new host with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: None,
            vars: IndexMap::new(),
            groups: IndexSet::new(),
        }
    }

    /// Set a variable on this host, overwriting any previous value
    pub fn set_var(&mut self, key: impl Into<String>, value: serde_yaml::Value) {
        self.vars.insert(key.into(), value);
    }

    /// Get a variable from this host
    pub fn get_var(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.vars.get(key)
    }

    /// Check if host has a specific variable
    pub fn has_var(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Add this host to a group
    pub fn add_to_group(&mut self, group: impl Into<String>) {
        self.groups.insert(group.into());
    }

    /// Check if host belongs to a specific group
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Merge variables from another mapping (other takes precedence)
    pub fn merge_vars(&mut self, other: &IndexMap<String, serde_yaml::Value>) {
        for (key, value) in other {
            self.vars.insert(key.clone(), value.clone());
        }
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.name, port),
            None => write!(f, "{}", self.name),
        }
    }
}
