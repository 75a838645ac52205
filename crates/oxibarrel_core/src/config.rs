use ignore::WalkBuilder;
use log::{debug, trace, warn};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// tsconfig `paths` aliases: alias prefix (without `/*`) to candidate directories.
pub type PathAliases = HashMap<String, Vec<PathBuf>>;

/// Collects `compilerOptions.paths` from every `tsconfig.json` inside the
/// package, skipping `node_modules` and git-ignored directories.
pub fn read_tsconfig_paths(root: &Path) -> PathAliases {
    debug!("Reading tsconfig paths from root: {:?}", root);
    let mut paths = PathAliases::new();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|e| e.file_name() != "node_modules")
        .build();

    let tsconfig_files: Vec<PathBuf> = walker
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() == "tsconfig.json")
        .map(|e| e.into_path())
        .collect();
    debug!("Found {} tsconfig.json files", tsconfig_files.len());

    for tsconfig_path in &tsconfig_files {
        trace!("Checking tsconfig at: {:?}", tsconfig_path);
        let content = match fs::read_to_string(tsconfig_path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", tsconfig_path.display(), e);
                continue;
            }
        };

        let json = match serde_json::from_str::<serde_json::Value>(&strip_line_comments(&content))
        {
            Ok(json) => json,
            Err(e) => {
                debug!("Skipping unparsable {}: {}", tsconfig_path.display(), e);
                continue;
            }
        };

        let Some(compiler_options) = json.get("compilerOptions") else {
            continue;
        };
        let Some(paths_obj) = compiler_options.get("paths").and_then(|p| p.as_object()) else {
            continue;
        };

        let base_url = compiler_options.get("baseUrl").and_then(|b| b.as_str()).unwrap_or(".");
        let base_path = tsconfig_path.parent().unwrap_or(root).join(base_url);

        for (alias, targets) in paths_obj {
            let resolved_targets: Vec<PathBuf> = targets
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|t| t.as_str())
                .map(|t| path_clean::clean(base_path.join(t.trim_end_matches("/*"))))
                .collect();

            if !resolved_targets.is_empty() {
                let alias_key = alias.trim_end_matches("/*").to_string();
                trace!("Found tsconfig path alias: '{}' -> {:?}", alias_key, resolved_targets);
                paths.insert(alias_key, resolved_targets);
            }
        }
    }

    debug!("Loaded {} tsconfig path aliases", paths.len());
    paths
}

/// Drops `//` comments, leaving `//` inside string literals (URLs, globs) intact.
fn strip_line_comments(content: &str) -> String {
    content
        .lines()
        .map(|line| {
            let mut in_string = false;
            let mut chars = line.char_indices().peekable();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' if in_string => {
                        chars.next();
                    }
                    '"' => in_string = !in_string,
                    '/' if !in_string && matches!(chars.peek(), Some((_, '/'))) => {
                        return &line[..i];
                    }
                    _ => {}
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
