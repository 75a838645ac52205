//! Barrel file detection for JavaScript/TypeScript packages.
//!
//! For every public entrypoint of a package (derived from the `exports`,
//! `module` or `main` field of its `package.json`) this crate builds the
//! module graph, classifies each module as a barrel file or not, and reports
//! the import chains through which the entrypoint reaches a barrel file.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use oxibarrel_barrel_file::{Config, run_barrel_check};
//! use std::io::{BufWriter, Write};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut cfg = Config {
//!     cwd: Some(std::path::PathBuf::from("/path/to/package")),
//!     info: true,
//!     ..Default::default()
//! };
//!
//! let result = run_barrel_check(&mut cfg)?;
//!
//! let mut stdout = BufWriter::new(std::io::stdout());
//! if result.entrypoints.iter().any(|e| !e.diagnostics.is_empty()) {
//!     oxibarrel_barrel_file::print_diagnostics(&mut stdout, &result, cfg.info)?;
//! } else {
//!     oxibarrel_barrel_file::print_no_barrel_files_message(&mut stdout, &result)?;
//! }
//! stdout.flush()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom graph sources
//!
//! [`analyze_module_graph`] works against any [`ModuleGraphBuilder`], so the
//! classification and chain tracing can run on graphs produced elsewhere.

mod checker;
mod classifier;
mod config;
mod graph;
mod module_graph;
mod reporter;
mod trace;
mod types;

// Re-export public API
pub use checker::run_barrel_check;
pub use classifier::{FileOptions, analyze_file};
pub use config::{
    CONFIG_FILE_NAME, Config, DEFAULT_AMOUNT_OF_EXPORTS_TO_CONSIDER_MODULE_AS_BARREL,
    DEFAULT_MAX_MODULE_GRAPH_SIZE, UserConfig,
};
pub use graph::{
    FsGraphBuilder, GraphPlugin, ModuleGraph, ModuleGraphBuilder, ModuleGraphSource, ModuleInfo,
};
pub use module_graph::{GraphBuild, GraphOptions, analyze_module_graph, build_graph};
pub use reporter::{format_chains, print_diagnostics, print_json, print_no_barrel_files_message};
pub use trace::trace_importers;
pub use types::{
    CheckResult, Diagnostic, DiagnosticId, EntrypointReport, FileAnalysis, ImportChain, Level,
    ModuleId,
};
