//! `group_vars`/`host_vars` directory loading.
//!
//! Directory-sourced variables are layered on top of inline `vars:` data for
//! the same group or host, overwriting same-named keys (last-write-wins, no
//! deep merge).

use indexmap::IndexMap;
use std::path::Path;
use tracing::trace;

use super::{InventoryError, InventoryResult};

/// Variable data for one group or host.
pub type VarsMap = IndexMap<String, serde_yaml::Value>;

/// Which vars directory to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarsKind {
    GroupVars,
    HostVars,
}

impl VarsKind {
    /// Directory name under the inventory base path.
    pub fn dir_name(self) -> &'static str {
        match self {
            VarsKind::GroupVars => "group_vars",
            VarsKind::HostVars => "host_vars",
        }
    }
}

/// Load variables from `base/{group_vars,host_vars}/`.
///
/// Each entry's basename (stripped of extension) is the group or host name.
/// A file entry is loaded directly; a directory entry combines all YAML files
/// within it in sorted order, later files overwriting earlier keys. An entry
/// that is neither a file nor a directory (dangling symlink, special file) is
/// a fatal error.
pub fn load_directory_vars(base: &Path, kind: VarsKind) -> InventoryResult<IndexMap<String, VarsMap>> {
    let dir = base.join(kind.dir_name());
    let mut out = IndexMap::new();
    if !dir.exists() {
        return Ok(out);
    }

    let mut entries: Vec<_> = std::fs::read_dir(&dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        let name = stem_name(&path);
        if name.is_empty() {
            continue;
        }

        if path.is_file() {
            out.insert(name, load_vars_file(&path)?);
        } else if path.is_dir() {
            out.insert(name, load_vars_subdir(&path)?);
        } else {
            return Err(InventoryError::VarsEntry(path));
        }
    }

    Ok(out)
}

/// Entry basename with the extension stripped.
fn stem_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

/// Load one vars file; its document must be a mapping or null.
fn load_vars_file(path: &Path) -> InventoryResult<VarsMap> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_yaml::Value = serde_yaml::from_str(&content)?;
    match value {
        serde_yaml::Value::Null => Ok(VarsMap::new()),
        serde_yaml::Value::Mapping(map) => {
            let mut vars = VarsMap::new();
            for (key, val) in map {
                if let serde_yaml::Value::String(key) = key {
                    vars.insert(key, val);
                }
            }
            Ok(vars)
        }
        _ => Err(InventoryError::Structure(format!(
            "vars file '{}' must contain a dictionary",
            path.display()
        ))),
    }
}

/// Combine all YAML files inside a per-name vars directory.
fn load_vars_subdir(dir: &Path) -> InventoryResult<VarsMap> {
    let mut merged = VarsMap::new();

    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !path.is_file() || !matches!(ext, "yml" | "yaml") {
            trace!("Skipping non-YAML vars entry {}", path.display());
            continue;
        }
        let vars = load_vars_file(&path)?;
        merged.extend(vars);
    }

    Ok(merged)
}
