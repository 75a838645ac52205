//! Package metadata and export-map resolution.
//!
//! Turns the public surface a `package.json` declares (`exports`, or the
//! legacy `module`/`main` fields) into concrete entrypoint files. The same
//! condition walk is used by the resolver when it steps into a dependency
//! under `node_modules`.

use glob::{Pattern, glob};
use log::{debug, trace, warn};
use path_clean::clean;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    constants::{FALLBACK_CONDITIONS, PREFERRED_CONDITIONS},
    resolver::resolve_file,
};

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("{} does not declare an \"exports\", \"module\" or \"main\" field", path.display())]
    MissingExportsField { path: PathBuf },

    #[error("\"exports\" in {} must be a string, an array or an object", path.display())]
    InvalidExportsField { path: PathBuf },

    #[error("Failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The subset of `package.json` that declares a package's public surface.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageJson {
    pub name: Option<String>,
    #[serde(default)]
    pub exports: Option<Value>,
    pub main: Option<String>,
    pub module: Option<String>,
    #[serde(skip)]
    pub path: PathBuf,
}

/// One public entrypoint: the subpath key it is exported under and the file
/// it maps to. Every file matched by a wildcard key shares that key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub key: String,
    pub file_path: PathBuf,
}

impl PackageJson {
    pub fn from_dir(dir: &Path) -> Result<Self, PackageError> {
        Self::from_path(&dir.join("package.json"))
    }

    pub fn from_path(path: &Path) -> Result<Self, PackageError> {
        debug!("Reading package metadata from {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|source| PackageError::Read { path: path.to_path_buf(), source })?;
        let mut pkg: PackageJson = serde_json::from_str(&content)
            .map_err(|source| PackageError::Parse { path: path.to_path_buf(), source })?;
        pkg.path = path.to_path_buf();
        Ok(pkg)
    }

    /// Derives the package's entrypoints, preferring `exports` over the legacy
    /// `module` and `main` fields.
    ///
    /// An `exports` field that yields no entrypoint (`{}`, or every subpath
    /// `null`) falls through to the legacy fields as well.
    pub fn entrypoints(&self, cwd: &Path) -> Result<Vec<ExportEntry>, PackageError> {
        if let Some(exports) = self.exports.as_ref().filter(|e| !e.is_null()) {
            let entries = resolve_exports(exports, cwd).map_err(|e| match e {
                PackageError::InvalidExportsField { .. } => {
                    PackageError::InvalidExportsField { path: self.path.clone() }
                }
                other => other,
            })?;
            if !entries.is_empty() {
                return Ok(entries);
            }
            debug!("\"exports\" in {} yields no entrypoints", self.path.display());
        }

        let legacy = self.module.as_deref().or(self.main.as_deref());
        match legacy {
            Some(target) => {
                debug!("Using legacy entrypoint '{}'", target);
                let joined = clean(cwd.join(target));
                let file_path = resolve_file(&joined).unwrap_or(joined);
                Ok(vec![ExportEntry { key: ".".to_string(), file_path }])
            }
            None => Err(PackageError::MissingExportsField { path: self.path.clone() }),
        }
    }
}

/// Resolves an `exports` field into entrypoints relative to `cwd`.
///
/// Fails with [`PackageError::InvalidExportsField`] when the field has a shape
/// no package manager accepts (a number or a boolean).
pub fn resolve_exports(exports: &Value, cwd: &Path) -> Result<Vec<ExportEntry>, PackageError> {
    let map = match exports {
        // "exports": "./index.js" or "exports": ["./index.js"]
        Value::String(_) | Value::Array(_) => {
            return Ok(resolve_subpath(".", exports, cwd).into_iter().collect());
        }
        Value::Object(map) => map,
        _ => return Err(PackageError::InvalidExportsField { path: cwd.join("package.json") }),
    };

    // "exports": { "import": "./index.js", "default": "./index.cjs" }
    if map.keys().all(|key| !key.starts_with('.')) {
        trace!("Treating \"exports\" as a condition map for '.'");
        return Ok(resolve_subpath(".", exports, cwd).into_iter().collect());
    }

    let mut entries = Vec::new();
    for (key, value) in map {
        if value.is_null() {
            trace!("Skipping private subpath '{}'", key);
            continue;
        }

        if key.contains('*') {
            entries.extend(expand_wildcard(key, value, cwd));
        } else if let Some(entry) = resolve_subpath(key, value, cwd) {
            entries.push(entry);
        }
    }

    debug!("Resolved {} entrypoints from \"exports\"", entries.len());
    Ok(entries)
}

/// Walks a conditional export value and collects every target it selects.
///
/// Strings select themselves, arrays select each element in order, and
/// objects select the first key, in declaration order, that is an allowed
/// condition. `null` selects nothing.
pub fn resolve_conditions<'v>(value: &'v Value, conditions: &[&str]) -> Vec<&'v str> {
    let mut targets = Vec::new();
    collect_targets(value, conditions, &mut targets);
    targets
}

fn collect_targets<'v>(value: &'v Value, conditions: &[&str], out: &mut Vec<&'v str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => {
            for item in items {
                collect_targets(item, conditions, out);
            }
        }
        Value::Object(map) => {
            if let Some((key, nested)) = map.iter().find(|(key, _)| conditions.contains(&key.as_str()))
            {
                trace!("Condition '{}' selected", key);
                collect_targets(nested, conditions, out);
            }
        }
        _ => {}
    }
}

/// Resolves with the preferred conditions, then with the fallback set.
fn targets_for<'v>(value: &'v Value) -> Vec<&'v str> {
    let targets = resolve_conditions(value, PREFERRED_CONDITIONS);
    if !targets.is_empty() {
        return targets;
    }
    resolve_conditions(value, FALLBACK_CONDITIONS)
}

fn resolve_subpath(key: &str, value: &Value, cwd: &Path) -> Option<ExportEntry> {
    match targets_for(value).first() {
        Some(target) => {
            let file_path = clean(cwd.join(target));
            trace!("Export '{}' resolved to {}", key, file_path.display());
            Some(ExportEntry { key: key.to_string(), file_path })
        }
        None => {
            warn!("Export '{}' does not resolve under any supported condition, skipping", key);
            None
        }
    }
}

fn expand_wildcard(key: &str, value: &Value, cwd: &Path) -> Vec<ExportEntry> {
    let mut entries = Vec::new();
    let base = Pattern::escape(&cwd.to_string_lossy());

    for target in targets_for(value) {
        let pattern = format!("{}/{}", base, target.trim_start_matches("./"));
        trace!("Expanding export '{}' with glob {}", key, pattern);

        let paths = match glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Invalid glob for export '{}': {}", key, e);
                continue;
            }
        };

        for path in paths {
            match path {
                Ok(p) if p.is_file() => {
                    entries.push(ExportEntry { key: key.to_string(), file_path: clean(p) })
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to read glob match for export '{}': {}", key, e),
            }
        }
    }

    debug!("Export '{}' expanded to {} files", key, entries.len());
    entries
}

/// Finds the export value for `subpath` in a dependency's `exports` field,
/// returning it together with the text captured by a wildcard key.
pub(crate) fn match_subpath<'v>(
    exports: &'v Value,
    subpath: &str,
) -> Option<(&'v Value, Option<String>)> {
    let map = match exports {
        Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => map,
        _ => return (subpath == ".").then_some((exports, None)),
    };

    if let Some(value) = map.get(subpath) {
        return Some((value, None));
    }

    // Longest matching prefix wins among wildcard keys
    map.iter()
        .filter_map(|(key, value)| {
            let (prefix, suffix) = key.split_once('*')?;
            let captured = subpath.strip_prefix(prefix)?.strip_suffix(suffix)?;
            Some((prefix.len(), value, captured.to_string()))
        })
        .max_by_key(|(len, _, _)| *len)
        .map(|(_, value, captured)| (value, Some(captured)))
}
