//! Recursive group tree construction for one inventory source.
//!
//! [`GroupTreeBuilder`] walks a parsed YAML inventory document and registers
//! groups, children, hosts, and variables into the sink, remapping group names
//! under the source prefix. All per-parse state (the recursion ancestor stack,
//! the registered-name sets) lives here; nothing survives a parse call.

use indexmap::IndexSet;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

use super::prefixed_name;
use crate::inventory::{pattern, InventoryError, InventoryResult, InventorySink};

/// Builds the group/host graph for a single inventory source.
pub(crate) struct GroupTreeBuilder<'a> {
    sink: &'a mut dyn InventorySink,
    prefix: String,
    top_group: String,
    source: PathBuf,
    /// Ancestor chain of the current recursion, keyed by resolved name.
    stack: Vec<String>,
    groups_seen: IndexSet<String>,
    hosts_seen: IndexSet<String>,
}

impl<'a> GroupTreeBuilder<'a> {
    pub fn new(sink: &'a mut dyn InventorySink, prefix: &str, source: &Path) -> Self {
        let top_group = if prefix.is_empty() {
            "all".to_string()
        } else {
            prefix.to_string()
        };
        Self {
            sink,
            prefix: prefix.to_string(),
            top_group,
            source: source.to_path_buf(),
            stack: Vec::new(),
            groups_seen: IndexSet::new(),
            hosts_seen: IndexSet::new(),
        }
    }

    /// Consume the builder, returning the group and host names it registered.
    pub fn finish(self) -> (IndexSet<String>, IndexSet<String>) {
        (self.groups_seen, self.hosts_seen)
    }

    /// Map an original group name to its registered name under the prefix.
    ///
    /// The source's own `all` group maps to the prefix itself; any other name
    /// equal to the prefix is an ambiguous conflict.
    fn resolved_name(&self, name: &str) -> InventoryResult<String> {
        if name == "all" {
            return Ok(self.top_group.clone());
        }
        if !self.prefix.is_empty() && name == self.prefix {
            return Err(InventoryError::PrefixConflict {
                group: name.to_string(),
                prefix: self.prefix.clone(),
            });
        }
        Ok(prefixed_name(name, &self.prefix))
    }

    /// Parse one group node, registering the group and everything below it.
    ///
    /// Returns the resolved group name so callers can link parent and child
    /// after the recursion comes back.
    pub fn parse_group(&mut self, name: &str, node: &Value) -> InventoryResult<String> {
        let resolved = self.resolved_name(name)?;
        if self.stack.contains(&resolved) {
            return Err(InventoryError::CircularGroup(format!(
                "{} -> {} in {}",
                self.stack.join(" -> "),
                resolved,
                self.source.display()
            )));
        }

        self.sink.add_group(&resolved);
        self.groups_seen.insert(resolved.clone());

        let mapping = match node {
            Value::Null => return Ok(resolved),
            Value::Mapping(mapping) => mapping,
            other => {
                warn!(
                    "Skipping malformed content for group ({name}) in {}: expected a dictionary, got {}",
                    self.source.display(),
                    type_name(other)
                );
                return Ok(resolved);
            }
        };

        self.stack.push(resolved.clone());
        for (key, section) in mapping {
            let Some(section_name) = key.as_str() else {
                warn!(
                    "Skipping unexpected non-string key in group ({name}) in {}",
                    self.source.display()
                );
                continue;
            };
            match section_name {
                "vars" => self.parse_vars(&resolved, name, section)?,
                "children" => self.parse_children(&resolved, name, section)?,
                "hosts" => self.parse_hosts(&resolved, name, section)?,
                other => {
                    warn!("Skipping unexpected key ({other}) in group ({name})");
                }
            }
        }
        self.stack.pop();

        Ok(resolved)
    }

    fn parse_vars(&mut self, resolved: &str, name: &str, section: &Value) -> InventoryResult<()> {
        let Some(entries) = self.section_entries("vars", name, section)? else {
            return Ok(());
        };
        for (key, value) in entries {
            let var_name = scalar_key(&key).ok_or_else(|| {
                InventoryError::Structure(format!(
                    "invalid variable name in group '{}' in {}: names must be scalar",
                    name,
                    self.source.display()
                ))
            })?;
            trace!("Registered var {var_name} for group {resolved}");
            self.sink.set_group_variable(resolved, &var_name, value);
        }
        Ok(())
    }

    fn parse_children(&mut self, resolved: &str, name: &str, section: &Value) -> InventoryResult<()> {
        let Some(entries) = self.section_entries("children", name, section)? else {
            return Ok(());
        };
        for (key, node) in entries {
            let child = scalar_key(&key).ok_or_else(|| {
                InventoryError::Structure(format!(
                    "invalid child group name in group '{}' in {}: names must be scalar",
                    name,
                    self.source.display()
                ))
            })?;
            if child == "ungrouped" {
                trace!("Skipping ungrouped child of group ({name})");
                continue;
            }
            let child_resolved = self.parse_group(&child, &node)?;
            self.sink.add_child(resolved, &child_resolved);
        }
        Ok(())
    }

    fn parse_hosts(&mut self, resolved: &str, name: &str, section: &Value) -> InventoryResult<()> {
        let Some(entries) = self.section_entries("hosts", name, section)? else {
            return Ok(());
        };
        for (key, node) in entries {
            let Value::String(host_pattern) = &key else {
                return Err(InventoryError::InvalidPattern {
                    pattern: scalar_key(&key).unwrap_or_else(|| format!("{key:?}")),
                    message: format!(
                        "host identifiers must be strings; quote numeric-looking host names in {}",
                        self.source.display()
                    ),
                });
            };

            let host_vars = match &node {
                Value::Null => Vec::new(),
                Value::String(single) => vec![(Value::String(single.clone()), Value::Null)],
                Value::Mapping(mapping) => mapping.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                _ => {
                    return Err(InventoryError::Structure(format!(
                        "Invalid data for host '{}' in group '{}' in {}: requires a dictionary",
                        host_pattern,
                        name,
                        self.source.display()
                    )));
                }
            };

            let (hosts, port) = pattern::expand(host_pattern)?;
            for host in hosts {
                trace!("Registered host {host} for group {resolved}");
                self.sink.add_host(&host, resolved);
                if resolved != self.top_group {
                    self.sink.add_host(&host, &self.top_group);
                }
                if let Some(port) = port {
                    self.sink.set_host_port(&host, port);
                }
                for (key, value) in &host_vars {
                    let var_name = scalar_key(key).ok_or_else(|| {
                        InventoryError::Structure(format!(
                            "invalid variable name for host '{}' in {}: names must be scalar",
                            host,
                            self.source.display()
                        ))
                    })?;
                    self.sink.set_host_variable(&host, &var_name, value.clone());
                }
                self.hosts_seen.insert(host);
            }
        }
        Ok(())
    }

    /// Coerce a section value into its entry list.
    ///
    /// A null section is skipped with a trace note; a bare string is shorthand
    /// for a single entry with no data; anything else that is not a mapping is
    /// a fatal structural error.
    fn section_entries(
        &self,
        section: &str,
        group: &str,
        value: &Value,
    ) -> InventoryResult<Option<Vec<(Value, Value)>>> {
        match value {
            Value::Null => {
                trace!("Skipping empty key ({section}) in group ({group})");
                Ok(None)
            }
            Value::String(single) => Ok(Some(vec![(Value::String(single.clone()), Value::Null)])),
            Value::Mapping(mapping) => {
                Ok(Some(mapping.iter().map(|(k, v)| (k.clone(), v.clone())).collect()))
            }
            _ => Err(InventoryError::Structure(format!(
                "Invalid \"{}\" entry for group '{}' in {}: requires a dictionary",
                section,
                group,
                self.source.display()
            ))),
        }
    }
}

/// Render a scalar mapping key as a name.
fn scalar_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Human-readable YAML node type for error and warning messages.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a dictionary",
        Value::Tagged(_) => "a tagged value",
    }
}
