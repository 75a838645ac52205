use log::{debug, trace};
use oxibarrel_core::{ModuleSyntax, SyntaxShape};
use std::path::Path;

use crate::types::{Diagnostic, DiagnosticId, FileAnalysis, Level};

#[derive(Debug, Clone, Copy, Default)]
pub struct FileOptions {
    /// Minimum number of exports before a file can be considered a barrel.
    /// `None` means any file whose exports outnumber its declarations.
    pub barrel_export_threshold: Option<usize>,
}

/// Counts exports against declarations in one module's top-level statements.
///
/// A module that exports more than it declares is a barrel file. A blind
/// `export * from` counts as a single export because the real number is only
/// known after analysing the target module, so re-export heavy files can be
/// undercounted.
pub fn analyze_file(syntax: &ModuleSyntax, file: &Path, options: &FileOptions) -> FileAnalysis {
    let mut analysis = FileAnalysis::default();

    for shape in &syntax.shapes {
        match shape {
            SyntaxShape::AggregatingImport { specifier, loc } => {
                analysis.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticId::ImportAll,
                        Level::Warning,
                        format!(
                            "\"{}\" contains an aggregating import, importing * from \"{}\", this should be avoided because it leads to unused imports, and makes it more difficult to tree-shake correctly.",
                            file.display(),
                            specifier
                        ),
                    )
                    .with_loc(*loc),
                );
            }
            SyntaxShape::ReExportAll { specifier, loc } => {
                analysis.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticId::ReExportAll,
                        Level::Warning,
                        format!(
                            "\"{}\" re-exports all exports from \"{}\", this should be avoided because it leads to unused imports, and makes it more difficult to tree-shake correctly.",
                            file.display(),
                            specifier
                        ),
                    )
                    .with_loc(*loc),
                );
                analysis.export_count += 1;
            }
            SyntaxShape::ReExport { named, .. } | SyntaxShape::LocalExport { named } => {
                analysis.export_count += named;
            }
            SyntaxShape::ExportObject { properties } => analysis.export_count += properties,
            SyntaxShape::Declaration => analysis.declaration_count += 1,
        }
    }

    trace!(
        "{}: {} exports, {} declarations",
        file.display(),
        analysis.export_count,
        analysis.declaration_count
    );

    let meets_threshold =
        options.barrel_export_threshold.is_none_or(|min| analysis.export_count >= min);
    if analysis.export_count > analysis.declaration_count && meets_threshold {
        debug!("{} is a barrel file", file.display());
        analysis.diagnostics.insert(
            0,
            Diagnostic::new(
                DiagnosticId::BarrelFile,
                Level::Error,
                format!("\"{}\" is a barrel file.", file.display()),
            ),
        );
    }

    analysis
}
