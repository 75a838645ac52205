//! File extensions and resolution order shared by the parser, the resolver
//! and the export-map resolver.
//!
//! - **TypeScript**: `.ts`, `.tsx`, `.mts` (ES module), `.cts` (CommonJS)
//! - **JavaScript**: `.js`, `.jsx`, `.mjs` (ES module), `.cjs` (CommonJS)

use std::path::Path;

/// Extensions of files the parser adapter knows how to read
pub const JS_TS_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Extensions to try when resolving extensionless requests (in priority order)
pub const RESOLVE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx", "mts", "cts"];

/// Index file names to try when resolving directory imports
pub const INDEX_FILES: &[&str] = &[
    "index.js",
    "index.mjs",
    "index.cjs",
    "index.jsx",
    "index.ts",
    "index.tsx",
    "index.mts",
    "index.cts",
];

/// Export conditions tried first for a package's own entrypoints
pub const PREFERRED_CONDITIONS: &[&str] = &["import", "default", "browser"];

/// Conditions used when the preferred set yields nothing
pub const FALLBACK_CONDITIONS: &[&str] = &["default", "import", "node"];

/// Conditions used when resolving into a dependency in `node_modules`
pub const DEPENDENCY_CONDITIONS: &[&str] = &["import", "module", "default", "node"];

/// Returns true when the path has an extension the parser adapter accepts.
pub fn is_js_ts_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|ext| JS_TS_EXTENSIONS.contains(&ext))
}
