use anyhow::Result;
use dashmap::DashMap;
use log::{debug, trace};
use path_clean::clean;
use std::path::{Path, PathBuf};

use crate::{
    config::PathAliases,
    constants::{DEPENDENCY_CONDITIONS, INDEX_FILES, RESOLVE_EXTENSIONS},
    package::{PackageJson, match_subpath, resolve_conditions},
};

pub type ResolveCache = DashMap<(PathBuf, String), Option<PathBuf>>;

/// Resolves an import request made from `from_file` to an absolute module id.
///
/// Returns `Ok(None)` when the request cannot be resolved (missing file,
/// missing package, node builtin); the caller decides how loudly to report it.
pub fn resolve(
    root: &Path,
    aliases: &PathAliases,
    from_file: &Path,
    request: &str,
    cache: &ResolveCache,
) -> Result<Option<PathBuf>> {
    let key = (from_file.to_path_buf(), request.to_string());
    if let Some(v) = cache.get(&key) {
        trace!("Cache hit for resolve: '{}' from {}", request, from_file.display());
        return Ok(v.clone());
    }
    trace!("Resolving: '{}' from {}", request, from_file.display());

    let resolved = if is_relative(request) {
        let base = from_file.parent().unwrap_or(root);
        let result = resolve_file(&clean(base.join(request)));
        trace!("Relative import '{}' resolved to {:?}", request, result);
        result
    } else if request.starts_with("node:") {
        trace!("Skipping node builtin '{}'", request);
        None
    } else {
        resolve_alias(aliases, request).or_else(|| {
            let start_dir = from_file.parent().unwrap_or(root);
            let result = resolve_node_module_from_dir(start_dir, request);
            trace!("Package import '{}' resolved to {:?}", request, result);
            result
        })
    };

    cache.insert(key, resolved.clone());
    if resolved.is_some() {
        debug!("Successfully resolved '{}' from {}", request, from_file.display());
    }
    Ok(resolved)
}

/// Relative, absolute or parent-directory requests.
pub fn is_relative(request: &str) -> bool {
    request.starts_with("./")
        || request.starts_with("../")
        || request.starts_with('/')
        || request == "."
        || request == ".."
}

/// Tries the exact path, then known extensions, then directory index files.
pub(crate) fn resolve_file(p: &Path) -> Option<PathBuf> {
    if p.is_file() {
        return Some(p.canonicalize().unwrap_or_else(|_| p.to_path_buf()));
    }

    for ext in RESOLVE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}.{}", p.display(), ext));
        if candidate.is_file() {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }

    for index_file in INDEX_FILES {
        let candidate = p.join(index_file);
        if candidate.is_file() {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }

    None
}

fn resolve_alias(aliases: &PathAliases, request: &str) -> Option<PathBuf> {
    // Longest alias first so "@app/ui" beats "@app"
    let mut matching: Vec<_> = aliases
        .iter()
        .filter(|(alias, _)| {
            request == alias.as_str()
                || request.strip_prefix(alias.as_str()).is_some_and(|rest| rest.starts_with('/'))
        })
        .collect();
    matching.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    for (alias, targets) in matching {
        let remainder = request[alias.len()..].trim_start_matches('/');
        for target in targets {
            let candidate =
                if remainder.is_empty() { target.clone() } else { target.join(remainder) };
            if let Some(resolved) = resolve_file(&candidate) {
                trace!("Resolved alias '{}' to {:?}", alias, resolved);
                return Some(resolved);
            }
        }
    }
    None
}

/// Splits `@scope/name/sub/path` into (`@scope/name`, `./sub/path`).
pub fn split_package_request(request: &str) -> (&str, String) {
    let mut segments = request.splitn(3, '/');
    let first = segments.next().unwrap_or_default();
    let name_len = if first.starts_with('@') {
        match segments.next() {
            Some(second) => first.len() + 1 + second.len(),
            None => first.len(),
        }
    } else {
        first.len()
    };

    let (name, rest) = request.split_at(name_len);
    let subpath = if rest.is_empty() { ".".to_string() } else { format!(".{}", rest) };
    (name, subpath)
}

fn resolve_node_module_from_dir(start_dir: &Path, request: &str) -> Option<PathBuf> {
    trace!("Walking up from {:?} to find node_modules for '{}'", start_dir, request);
    let mut current_dir = start_dir;

    // Workspace managers hoist dependencies above the package root, so the
    // walk continues up to the filesystem root.
    loop {
        let result = resolve_node_module(current_dir, request);
        if result.is_some() {
            return result;
        }
        current_dir = current_dir.parent()?;
    }
}

fn resolve_node_module(dir: &Path, request: &str) -> Option<PathBuf> {
    let (name, subpath) = split_package_request(request);
    let pkg_dir = dir.join("node_modules").join(name);
    if !pkg_dir.is_dir() {
        return None;
    }
    trace!("Checking node_modules at: {:?}", pkg_dir);

    let pkg = PackageJson::from_dir(&pkg_dir).ok();

    if let Some(exports) = pkg.as_ref().and_then(|p| p.exports.as_ref()).filter(|e| !e.is_null())
    {
        // A package with "exports" only exposes what it declares
        let (value, captured) = match_subpath(exports, &subpath)?;
        let target = resolve_conditions(value, DEPENDENCY_CONDITIONS).into_iter().next()?;
        let target = match captured {
            Some(captured) => target.replace('*', &captured),
            None => target.to_string(),
        };
        return resolve_file(&clean(pkg_dir.join(target)));
    }

    if subpath != "." {
        return resolve_file(&clean(pkg_dir.join(&subpath)));
    }

    if let Some(pkg) = &pkg {
        for field in [&pkg.module, &pkg.main].into_iter().flatten() {
            if let Some(resolved) = resolve_file(&clean(pkg_dir.join(field))) {
                return Some(resolved);
            }
        }
    }

    INDEX_FILES.iter().map(|index_file| pkg_dir.join(index_file)).find(|p| p.is_file()).map(|p| {
        p.canonicalize().unwrap_or(p)
    })
}
