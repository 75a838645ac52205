use anyhow::{Context, Result};
use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use std::{fs, path::Path};

use crate::types::{Loc, ModuleSyntax, SpecKind, Specifier, SyntaxShape};

/// Reads and parses a module from disk.
pub fn parse_module(file: &Path) -> Result<ModuleSyntax> {
    trace!("Parsing module: {}", file.display());
    let src =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(parse_source(file, &src))
}

/// Parses module text and reduces its top-level statements to the shapes and
/// import specifiers the analysis consumes.
///
/// Syntax errors are not fatal: whatever program oxc recovers is used.
pub fn parse_source(file: &Path, src: &str) -> ModuleSyntax {
    let st = source_type_for(file);
    let allocator = Allocator::default();
    let ParserReturn { program, errors, .. } = OxcParser::new(&allocator, src, st).parse();
    if !errors.is_empty() {
        debug!("Recovered from {} syntax errors in {}", errors.len(), file.display());
    }

    let mut syntax = ModuleSyntax::default();

    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => import_declaration(decl, &mut syntax),
            Statement::ExportNamedDeclaration(decl) => export_named_declaration(decl, &mut syntax),
            Statement::ExportAllDeclaration(decl) => {
                let specifier = decl.source.value.to_string();
                trace!("Found re-export of everything from '{}'", specifier);
                if !decl.export_kind.is_type() {
                    syntax.specifiers.push(Specifier {
                        request: specifier.clone(),
                        kind: SpecKind::Static,
                    });
                }
                syntax.shapes.push(SyntaxShape::ReExportAll { specifier, loc: loc(decl.span) });
            }
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::ObjectExpression(obj) => {
                    extract_require_from_object(obj, &mut syntax.specifiers);
                    syntax
                        .shapes
                        .push(SyntaxShape::ExportObject { properties: obj.properties.len() });
                }
                ExportDefaultDeclarationKind::FunctionDeclaration(_)
                | ExportDefaultDeclarationKind::ClassDeclaration(_) => {
                    syntax.shapes.push(SyntaxShape::Declaration);
                }
                other => {
                    if let Some(expr) = other.as_expression() {
                        extract_require_from_expression(expr, &mut syntax.specifiers);
                    }
                }
            },
            Statement::TSExportAssignment(assign) => {
                if let Expression::ObjectExpression(obj) = &assign.expression {
                    syntax
                        .shapes
                        .push(SyntaxShape::ExportObject { properties: obj.properties.len() });
                }
                extract_require_from_expression(&assign.expression, &mut syntax.specifiers);
            }
            Statement::VariableDeclaration(vd) => {
                variable_declaration(vd, &mut syntax.specifiers);
                syntax.shapes.push(SyntaxShape::Declaration);
            }
            Statement::FunctionDeclaration(_) | Statement::ClassDeclaration(_) => {
                syntax.shapes.push(SyntaxShape::Declaration);
            }
            Statement::ExpressionStatement(es) => {
                extract_require_from_expression(&es.expression, &mut syntax.specifiers);
            }
            _ => {}
        }
    }

    debug!(
        "Found {} shapes and {} import specifiers in {}",
        syntax.shapes.len(),
        syntax.specifiers.len(),
        file.display()
    );
    syntax
}

fn import_declaration(decl: &ImportDeclaration, syntax: &mut ModuleSyntax) {
    let request = decl.source.value.to_string();

    // `import * as ns from 'm'`, possibly alongside a default binding
    let is_aggregating = decl.specifiers.as_ref().is_some_and(|specifiers| {
        specifiers.iter().any(|s| matches!(s, ImportDeclarationSpecifier::ImportNamespaceSpecifier(_)))
            && !specifiers.iter().any(|s| matches!(s, ImportDeclarationSpecifier::ImportSpecifier(_)))
    });
    if is_aggregating {
        trace!("Found aggregating import from '{}'", request);
        syntax
            .shapes
            .push(SyntaxShape::AggregatingImport { specifier: request.clone(), loc: loc(decl.span) });
    }

    if decl.import_kind.is_type() {
        trace!("Skipping type-only import of '{}'", request);
        return;
    }

    // import { type Foo } from 'bar' carries no runtime edge
    let has_runtime_import = match &decl.specifiers {
        Some(specifiers) if !specifiers.is_empty() => specifiers.iter().any(|spec| match spec {
            ImportDeclarationSpecifier::ImportSpecifier(s) => !s.import_kind.is_type(),
            ImportDeclarationSpecifier::ImportDefaultSpecifier(_) => true,
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => true,
        }),
        // import 'side-effect' or import {} from 'x'
        _ => true,
    };

    if has_runtime_import {
        trace!("Found static import: '{}'", request);
        syntax.specifiers.push(Specifier { request, kind: SpecKind::Static });
    }
}

fn export_named_declaration(decl: &ExportNamedDeclaration, syntax: &mut ModuleSyntax) {
    if let Some(declaration) = &decl.declaration {
        match declaration {
            Declaration::VariableDeclaration(vd) => {
                variable_declaration(vd, &mut syntax.specifiers);
                syntax.shapes.push(SyntaxShape::Declaration);
            }
            Declaration::FunctionDeclaration(_) | Declaration::ClassDeclaration(_) => {
                syntax.shapes.push(SyntaxShape::Declaration);
            }
            _ => {}
        }
        return;
    }

    let named = decl.specifiers.len();
    match &decl.source {
        Some(source) => {
            let specifier = source.value.to_string();
            let has_runtime_export = !decl.export_kind.is_type()
                && (named == 0 || decl.specifiers.iter().any(|s| !s.export_kind.is_type()));
            if has_runtime_export {
                syntax
                    .specifiers
                    .push(Specifier { request: specifier.clone(), kind: SpecKind::Static });
            }

            // `export {} from 'm'` has no named elements, same as a blind re-export
            if named == 0 {
                syntax.shapes.push(SyntaxShape::ReExportAll { specifier, loc: loc(decl.span) });
            } else {
                syntax.shapes.push(SyntaxShape::ReExport { specifier, named, loc: loc(decl.span) });
            }
        }
        None if named > 0 => syntax.shapes.push(SyntaxShape::LocalExport { named }),
        None => {}
    }
}

fn variable_declaration(vd: &VariableDeclaration, specs: &mut Vec<Specifier>) {
    // const x = require('...') or const x = someFunc(require('...'))
    for decl in &vd.declarations {
        if let Some(init) = &decl.init {
            extract_require_from_expression(init, specs);
        }
    }
}

fn extract_require_from_object(oe: &ObjectExpression, specs: &mut Vec<Specifier>) {
    for prop in &oe.properties {
        if let Some(p) = prop.as_property() {
            extract_require_from_expression(&p.value, specs);
        }
    }
}

fn extract_require_from_expression(expr: &Expression, specs: &mut Vec<Specifier>) {
    match expr {
        Expression::CallExpression(ce) => {
            if let Expression::Identifier(callee_ident) = &ce.callee
                && callee_ident.name.as_str() == "require"
                && !ce.arguments.is_empty()
                && let Some(Expression::StringLiteral(sl)) = ce.arguments[0].as_expression()
            {
                trace!("Found require() call: '{}'", sl.value);
                specs.push(Specifier { request: sl.value.to_string(), kind: SpecKind::Static });
            }
            for arg in &ce.arguments {
                if let Some(arg_expr) = arg.as_expression() {
                    extract_require_from_expression(arg_expr, specs);
                }
            }
            extract_require_from_expression(&ce.callee, specs);
        }
        Expression::ImportExpression(ie) => {
            if let Expression::StringLiteral(sl) = &ie.source {
                trace!("Found dynamic import(): '{}'", sl.value);
                specs.push(Specifier { request: sl.value.to_string(), kind: SpecKind::Dynamic });
            }
        }
        Expression::ArrayExpression(ae) => {
            for elem in &ae.elements {
                if let Some(expr) = elem.as_expression() {
                    extract_require_from_expression(expr, specs);
                }
            }
        }
        Expression::ObjectExpression(oe) => extract_require_from_object(oe, specs),
        Expression::ConditionalExpression(ce) => {
            extract_require_from_expression(&ce.test, specs);
            extract_require_from_expression(&ce.consequent, specs);
            extract_require_from_expression(&ce.alternate, specs);
        }
        Expression::AssignmentExpression(ae) => {
            extract_require_from_expression(&ae.right, specs);
        }
        Expression::ParenthesizedExpression(pe) => {
            extract_require_from_expression(&pe.expression, specs);
        }
        _ => {}
    }
}

fn loc(span: oxc_span::Span) -> Loc {
    Loc { start: span.start, end: span.end }
}

fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());

    SourceType::default()
        .with_jsx(matches!(ext, Some("tsx") | Some("jsx") | Some("js")))
        .with_typescript(matches!(ext, Some("ts") | Some("tsx") | Some("mts") | Some("cts")))
        // .cjs and .cts are CommonJS scripts, everything else is parsed as ESM
        .with_module(!matches!(ext, Some("cjs") | Some("cts")))
}
