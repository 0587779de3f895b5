//! Composite inventory plugin.
//!
//! Builds one composite inventory from the union of multiple independently
//! authored YAML inventories, each merged under its own namespace prefix. The
//! composite file declares its sources:
//!
//! ```yaml
//! inventories:
//!   - file: site-a/inventory.yml
//!     prefix: a
//!   - file: site-b/inventory.yml
//!     prefix: b
//! ```
//!
//! Each source's `all` group becomes a group named after the prefix; every
//! other group `g` is remapped to `{prefix}_{g}`, with the unprefixed name
//! registered alongside it and linked as its parent (dual registration), so
//! un-prefixed references keep resolving across merged sources. The literal
//! `ungrouped` group is never merged.
//!
//! All failures are fatal and immediate: no partial composite is ever
//! returned for a document that fails validation part-way.

mod tree;

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use self::tree::GroupTreeBuilder;
use super::vars::{load_directory_vars, VarsKind};
use super::{InventoryError, InventoryResult, InventorySink};

/// Compute the namespaced form of a group name.
///
/// An empty prefix is the identity, used for the unprefixed shadow
/// registration.
pub fn prefixed_name(group: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        group.to_string()
    } else {
        format!("{prefix}_{group}")
    }
}

/// One declared sub-inventory of a composite file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubInventorySpec {
    /// Path to the source inventory, relative to the composite file
    pub file: PathBuf,
    /// Namespace prefix for this source's groups
    pub prefix: String,
}

/// The composite inventory plugin.
///
/// Exposes the `verify_file`/`parse` entry points the host runtime invokes,
/// writing results into an [`InventorySink`].
#[derive(Debug, Default)]
pub struct CompositeInventory;

impl CompositeInventory {
    pub fn new() -> Self {
        Self
    }

    /// Check whether a path looks like a composite inventory file.
    pub fn verify_file(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        matches!(
            path.extension().and_then(|e| e.to_str()),
            None | Some("yml") | Some("yaml")
        )
    }

    /// Parse a composite inventory file into the sink.
    ///
    /// Any fatal error aborts the whole parse immediately; no recovery or
    /// continuation to the next sub-inventory is attempted.
    pub fn parse(&self, sink: &mut dyn InventorySink, path: &Path) -> InventoryResult<()> {
        let document = load_yaml_document(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        // Vars directories belong to child inventories; beside the composite
        // file itself their precedence would be ambiguous.
        for kind in [VarsKind::GroupVars, VarsKind::HostVars] {
            let dir = base.join(kind.dir_name());
            if dir.exists() {
                return Err(InventoryError::Parse {
                    path: path.to_path_buf(),
                    message: format!(
                        "directory {} exists, {} should be defined in child inventories",
                        dir.display(),
                        kind.dir_name()
                    ),
                });
            }
        }

        let specs = subinventory_specs(&document, path)?;

        // Document variant: a composite file may carry its own `all` mapping,
        // parsed without a prefix.
        if let Some(all) = document.get(&Value::String("all".to_string())) {
            let mut builder = GroupTreeBuilder::new(&mut *sink, "", path);
            builder.parse_group("all", all)?;
        }

        for spec in &specs {
            self.parse_source(&mut *sink, spec, base)?;
        }

        Ok(())
    }

    /// Merge one declared sub-inventory under its prefix.
    fn parse_source(
        &self,
        sink: &mut dyn InventorySink,
        spec: &SubInventorySpec,
        base: &Path,
    ) -> InventoryResult<()> {
        let file = if spec.file.is_absolute() {
            spec.file.clone()
        } else {
            base.join(&spec.file)
        };

        let extension = file.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !matches!(extension, "yml" | "yaml") {
            return Err(InventoryError::Parse {
                path: file.clone(),
                message: "inventory file must have a .yml or .yaml extension".to_string(),
            });
        }
        if !file.exists() {
            return Err(InventoryError::Parse {
                path: file.clone(),
                message: "file does not exist".to_string(),
            });
        }

        debug!("Merging inventory {} under prefix {}", file.display(), spec.prefix);
        let document = load_yaml_document(&file)?;

        let mut builder = GroupTreeBuilder::new(&mut *sink, &spec.prefix, &file);

        // The source's own top-level `all` node parses directly under the
        // prefix; a source without one still gets its prefix group.
        match document.get(&Value::String("all".to_string())) {
            Some(all) => builder.parse_group("all", all)?,
            None => builder.parse_group("all", &Value::Null)?,
        };

        // Every other top-level group is dual-registered: the plain name
        // stays resolvable, with the prefixed form as its child.
        let mut links = Vec::new();
        for (key, node) in &document {
            let Some(name) = key.as_str() else {
                warn!(
                    "Skipping non-string top-level key in {}",
                    file.display()
                );
                continue;
            };
            if name == "all" || name == "ungrouped" {
                continue;
            }
            let resolved = builder.parse_group(name, node)?;
            links.push((name.to_string(), resolved));
        }

        let (groups_seen, hosts_seen) = builder.finish();

        // The source's top group hangs off `all`, like any top-level group.
        sink.add_child("all", &spec.prefix);
        for (name, resolved) in links {
            sink.add_group(&name);
            sink.add_child(&name, &resolved);
            sink.add_child("all", &name);
        }

        // Directory vars layer on top of inline vars, overwriting on key
        // collision. `all` remaps to the prefix, other names to their
        // prefixed form; entries naming nothing this source registered are
        // skipped.
        let sub_base = file.parent().unwrap_or_else(|| Path::new("."));
        for (name, vars) in load_directory_vars(sub_base, VarsKind::GroupVars)? {
            let target = if name == "all" {
                spec.prefix.clone()
            } else {
                prefixed_name(&name, &spec.prefix)
            };
            if !groups_seen.contains(&target) {
                warn!(
                    "Skipping group_vars entry ({name}) with no matching group in {}",
                    file.display()
                );
                continue;
            }
            for (key, value) in vars {
                debug!("Registered var {key} for group {target}");
                sink.set_group_variable(&target, &key, value);
            }
        }
        for (name, vars) in load_directory_vars(sub_base, VarsKind::HostVars)? {
            if !hosts_seen.contains(&name) {
                warn!(
                    "Skipping host_vars entry ({name}) with no matching host in {}",
                    file.display()
                );
                continue;
            }
            for (key, value) in vars {
                debug!("Registered var {key} for host {name}");
                sink.set_host_variable(&name, &key, value);
            }
        }

        Ok(())
    }
}

/// Load a YAML file that must contain a non-empty mapping.
fn load_yaml_document(path: &Path) -> InventoryResult<serde_yaml::Mapping> {
    let content = std::fs::read_to_string(path).map_err(|e| InventoryError::Parse {
        path: path.to_path_buf(),
        message: format!("unable to read file: {e}"),
    })?;
    let value: Value = serde_yaml::from_str(&content).map_err(|e| InventoryError::Parse {
        path: path.to_path_buf(),
        message: format!("invalid YAML: {e}"),
    })?;
    match value {
        Value::Null => Err(InventoryError::Parse {
            path: path.to_path_buf(),
            message: "parsed empty YAML file".to_string(),
        }),
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(InventoryError::Parse {
            path: path.to_path_buf(),
            message: "YAML inventory has invalid structure, it should be a dictionary".to_string(),
        }),
    }
}

/// Extract and validate the declared sub-inventories of a composite document.
fn subinventory_specs(
    document: &serde_yaml::Mapping,
    path: &Path,
) -> InventoryResult<Vec<SubInventorySpec>> {
    let parse_err = |message: String| InventoryError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let inventories = match document.get(&Value::String("inventories".to_string())) {
        None | Some(Value::Null) => {
            return Err(parse_err("does not contain \"inventories\" key".to_string()));
        }
        Some(Value::Sequence(seq)) => seq,
        Some(_) => {
            return Err(parse_err("\"inventories\" must be a list".to_string()));
        }
    };
    if inventories.is_empty() {
        return Err(parse_err("does not contain any inventories".to_string()));
    }

    let mut specs = Vec::with_capacity(inventories.len());
    for entry in inventories {
        let Value::Mapping(mapping) = entry else {
            return Err(parse_err(format!(
                "inventory entry must be a dictionary, got: {entry:?}"
            )));
        };
        let field = |name: &str| -> Option<String> {
            mapping
                .get(&Value::String(name.to_string()))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let file = field("file")
            .ok_or_else(|| parse_err(format!("inventory entry {mapping:?} does not contain \"file\" key")))?;
        let prefix = field("prefix")
            .ok_or_else(|| parse_err(format!("inventory entry {mapping:?} does not contain \"prefix\" key")))?;
        if prefix == "all" || prefix == "ungrouped" {
            return Err(parse_err(format!("prefix \"{prefix}\" is reserved")));
        }
        specs.push(SubInventorySpec {
            file: PathBuf::from(file),
            prefix,
        });
    }

    Ok(specs)
}
