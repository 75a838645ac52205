//! Core utilities for oxibarrel.
//!
//! This crate provides the JavaScript/TypeScript plumbing the barrel file
//! analysis is built on:
//! - Parsing modules into the small set of top-level shapes the classifier reads
//! - Resolving import specifiers (relative, node_modules, tsconfig paths)
//! - Turning a package's `exports`/`module`/`main` fields into entrypoints
//! - Reading tsconfig path aliases

mod config;
mod constants;
mod package;
mod parser;
mod resolver;
mod types;

// Re-export public API
pub use config::{PathAliases, read_tsconfig_paths};
pub use constants::{
    DEPENDENCY_CONDITIONS, FALLBACK_CONDITIONS, INDEX_FILES, JS_TS_EXTENSIONS,
    PREFERRED_CONDITIONS, RESOLVE_EXTENSIONS, is_js_ts_path,
};
pub use package::{ExportEntry, PackageError, PackageJson, resolve_conditions, resolve_exports};
pub use parser::{parse_module, parse_source};
pub use resolver::{ResolveCache, is_relative, resolve, split_package_request};
pub use types::{Loc, ModuleSyntax, SpecKind, Specifier, SyntaxShape};
