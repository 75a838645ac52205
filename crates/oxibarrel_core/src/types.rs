use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub request: String,
    pub kind: SpecKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecKind {
    Static,
    Dynamic,
}

/// Byte offsets of a statement in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Loc {
    pub start: u32,
    pub end: u32,
}

/// The top-level statement shapes the barrel classifier looks at.
///
/// Produced by the parser adapter; any statement that does not fit one of
/// these variants is dropped during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxShape {
    /// `import * as ns from "m"`
    AggregatingImport { specifier: String, loc: Loc },
    /// `export { a, b } from "m"`
    ReExport { specifier: String, named: usize, loc: Loc },
    /// `export * from "m"` or `export * as ns from "m"`
    ReExportAll { specifier: String, loc: Loc },
    /// `export { a, b }`
    LocalExport { named: usize },
    /// `export default { a, b }` or `export = { a, b }`
    ExportObject { properties: usize },
    /// Top-level variable, function or class declaration, exported or not
    Declaration,
}

/// Everything the analysis needs from one parsed source file.
#[derive(Debug, Clone, Default)]
pub struct ModuleSyntax {
    pub shapes: Vec<SyntaxShape>,
    pub specifiers: Vec<Specifier>,
}
