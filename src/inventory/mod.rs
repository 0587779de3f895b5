//! Composite inventory management.
//!
//! This module provides the inventory data model and the composite parser:
//! - [`Inventory`]: the container holding all hosts and groups
//! - [`InventorySink`]: the write-only capability interface the parser mutates
//! - [`composite`]: the composite inventory plugin (`verify_file`/`parse`)
//! - [`pattern`]: host pattern expansion (`host[01:03]`, `host:port`)
//! - [`vars`]: `group_vars`/`host_vars` directory loading

pub mod composite;
pub mod group;
pub mod host;
pub mod pattern;
pub mod vars;

pub use composite::CompositeInventory;
pub use group::Group;
pub use host::Host;

use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse inventory '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid inventory structure: {0}")]
    Structure(String),

    #[error("invalid host pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("group name '{group}' conflicts with prefix '{prefix}'")]
    PrefixConflict { group: String, prefix: String },

    #[error("circular group dependency detected: {0}")]
    CircularGroup(String),

    #[error("vars entry '{}' is neither a file nor a directory", .0.display())]
    VarsEntry(PathBuf),
}

/// Result type for inventory operations
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Write-only interface the composite parser mutates.
///
/// The parser never reads registered state back through this interface; all
/// bookkeeping needed during a parse lives in the parser's own context.
pub trait InventorySink {
    /// Register a group, a no-op if it already exists.
    fn add_group(&mut self, name: &str);

    /// Link `child` under `parent`, registering either side as needed.
    fn add_child(&mut self, parent: &str, child: &str);

    /// Register a host as a member of `group`.
    fn add_host(&mut self, name: &str, group: &str);

    /// Set a group variable, overwriting any previous value for the key.
    fn set_group_variable(&mut self, group: &str, key: &str, value: serde_yaml::Value);

    /// Set a host variable, overwriting any previous value for the key.
    fn set_host_variable(&mut self, host: &str, key: &str, value: serde_yaml::Value);

    /// Record the connection port parsed from a host pattern suffix.
    fn set_host_port(&mut self, host: &str, port: u16);
}

/// The main inventory structure holding all hosts and groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inventory {
    /// All groups indexed by name
    groups: IndexMap<String, Group>,

    /// All hosts indexed by name
    hosts: IndexMap<String, Host>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    /// Create a new empty inventory with default groups
    pub fn new() -> Self {
        let mut inventory = Self {
            groups: IndexMap::new(),
            hosts: IndexMap::new(),
        };

        inventory.groups.insert("all".to_string(), Group::all());
        inventory
            .groups
            .insert("ungrouped".to_string(), Group::ungrouped());

        inventory
    }

    fn ensure_group(&mut self, name: &str) -> &mut Group {
        self.groups
            .entry(name.to_string())
            .or_insert_with(|| Group::new(name))
    }

    fn ensure_host(&mut self, name: &str) -> &mut Host {
        self.hosts
            .entry(name.to_string())
            .or_insert_with(|| Host::new(name))
    }

    /// Get a group by name
    pub fn get_group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Get a host by name
    pub fn get_host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    /// Get all groups
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Get all hosts
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    /// Get all group names
    pub fn group_names(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    /// Get all host names
    pub fn host_names(&self) -> impl Iterator<Item = &String> {
        self.hosts.keys()
    }

    /// Count total groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Count total hosts
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Get all hosts in a group, including hosts from child groups
    pub fn hosts_in_group(&self, name: &str) -> Vec<&Host> {
        let mut seen = indexmap::IndexSet::new();
        self.collect_group_hosts(name, &mut seen, &mut indexmap::IndexSet::new());
        seen.into_iter().filter_map(|n| self.hosts.get(n)).collect()
    }

    fn collect_group_hosts<'a>(
        &'a self,
        name: &str,
        out: &mut indexmap::IndexSet<&'a str>,
        visited: &mut indexmap::IndexSet<String>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        if let Some(group) = self.groups.get(name) {
            for host in &group.hosts {
                out.insert(host.as_str());
            }
            for child in &group.children {
                self.collect_group_hosts(child, out, visited);
            }
        }
    }
}

impl InventorySink for Inventory {
    fn add_group(&mut self, name: &str) {
        self.ensure_group(name);
    }

    fn add_child(&mut self, parent: &str, child: &str) {
        self.ensure_group(child);
        self.ensure_group(parent).add_child(child);
    }

    fn add_host(&mut self, name: &str, group: &str) {
        self.ensure_group(group).add_host(name);
        let host = self.ensure_host(name);
        host.add_to_group(group);
        if group != "all" {
            host.add_to_group("all");
            self.ensure_group("all").add_host(name);
        }
    }

    fn set_group_variable(&mut self, group: &str, key: &str, value: serde_yaml::Value) {
        self.ensure_group(group).set_var(key, value);
    }

    fn set_host_variable(&mut self, host: &str, key: &str, value: serde_yaml::Value) {
        self.ensure_host(host).set_var(key, value);
    }

    fn set_host_port(&mut self, host: &str, port: u16) {
        self.ensure_host(host).port = Some(port);
    }
}

impl std::fmt::Display for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Inventory ({} hosts, {} groups)",
            self.hosts.len(),
            self.groups.len()
        )?;

        for group in self.groups.values() {
            if group.is_empty() {
                continue;
            }
            writeln!(f, "  [{}]", group.name)?;
            for host_name in &group.hosts {
                if let Some(host) = self.hosts.get(host_name) {
                    writeln!(f, "    {}", host)?;
                }
            }
        }

        Ok(())
    }
}
