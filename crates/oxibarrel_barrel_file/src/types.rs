use oxibarrel_core::Loc;
use serde::Serialize;
use std::{fmt, path::PathBuf};

/// Module id: the absolute, resolved path of a module.
pub type ModuleId = PathBuf;

/// Module ids from a barrel file (first) back to the entrypoint (last).
pub type ImportChain = Vec<ModuleId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticId {
    BarrelFile,
    ReExportAll,
    ImportAll,
    ModuleGraphSize,
}

impl DiagnosticId {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticId::BarrelFile => "barrel-file",
            DiagnosticId::ReExportAll => "re-export-all",
            DiagnosticId::ImportAll => "import-all",
            DiagnosticId::ModuleGraphSize => "module-graph-size",
        }
    }
}

impl fmt::Display for DiagnosticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub level: Level,
    pub message: String,
    /// Import chains leading into a barrel dependency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ImportChain>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

impl Diagnostic {
    pub fn new(id: DiagnosticId, level: Level, message: impl Into<String>) -> Self {
        Self { id, level, message: message.into(), data: None, loc: None }
    }

    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn with_chains(mut self, chains: Vec<ImportChain>) -> Self {
        self.data = Some(chains);
        self
    }
}

/// Result of classifying a single module.
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    pub diagnostics: Vec<Diagnostic>,
    pub export_count: usize,
    pub declaration_count: usize,
}

impl FileAnalysis {
    /// The barrel verdict, when present, is always the first diagnostic.
    pub fn is_barrel(&self) -> bool {
        self.diagnostics.first().is_some_and(|d| d.id == DiagnosticId::BarrelFile)
    }
}

/// Diagnostics for one package entrypoint, in reporting order.
#[derive(Debug, Clone, Serialize)]
pub struct EntrypointReport {
    pub key: String,
    pub file: ModuleId,
    pub module_count: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub entrypoints: Vec<EntrypointReport>,
    pub files_analyzed: usize,
}

impl CheckResult {
    pub fn count(&self, level: Level) -> usize {
        self.entrypoints
            .iter()
            .flat_map(|e| &e.diagnostics)
            .filter(|d| d.level == level)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Level::Error) > 0
    }
}
