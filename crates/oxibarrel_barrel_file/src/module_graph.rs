use anyhow::Result;
use log::{debug, info, trace};
use oxibarrel_core::ModuleSyntax;
use std::path::Path;

use crate::{
    classifier::{FileOptions, analyze_file},
    graph::{GraphPlugin, ModuleGraph, ModuleGraphBuilder, ModuleGraphSource},
    trace::trace_importers,
    types::{Diagnostic, DiagnosticId, Level, ModuleId},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    pub file: FileOptions,
    /// Graphs with more modules than this get a `module-graph-size` error.
    pub max_module_graph_size: Option<usize>,
}

/// A built graph plus the barrel files found while building it.
#[derive(Debug)]
pub struct GraphBuild {
    pub graph: ModuleGraph,
    /// Barrel modules other than the entrypoint, in discovery order.
    pub barrel_module_ids: Vec<ModuleId>,
    /// Classifier findings for the entrypoint file itself.
    pub entry_diagnostics: Vec<Diagnostic>,
}

/// Classifies every module handed to it by the graph builder.
struct BarrelCollector<'a> {
    entry: &'a Path,
    options: FileOptions,
    barrel_module_ids: Vec<ModuleId>,
    entry_diagnostics: Vec<Diagnostic>,
}

impl GraphPlugin for BarrelCollector<'_> {
    fn transform(&mut self, syntax: &ModuleSyntax, id: &Path) {
        let analysis = analyze_file(syntax, id, &self.options);
        if id == self.entry {
            self.entry_diagnostics = analysis.diagnostics;
        } else if analysis.is_barrel() {
            trace!("Recording barrel dependency {}", id.display());
            self.barrel_module_ids.push(id.to_path_buf());
        }
    }

    fn build_end(&mut self, graph: &dyn ModuleGraphSource) {
        debug!(
            "Found {} barrel files among {} modules",
            self.barrel_module_ids.len(),
            graph.module_ids().len()
        );
    }
}

/// Builds the module graph of `entry`, classifying each module on the way.
///
/// `entry` must be the resolved module id the builder will report for it,
/// otherwise the entrypoint is not told apart from its dependencies.
pub fn build_graph(
    entry: &Path,
    builder: &dyn ModuleGraphBuilder,
    options: &FileOptions,
) -> Result<GraphBuild> {
    let mut collector = BarrelCollector {
        entry,
        options: *options,
        barrel_module_ids: Vec::new(),
        entry_diagnostics: Vec::new(),
    };
    let graph = builder.build(entry, &mut collector)?;

    Ok(GraphBuild {
        graph,
        barrel_module_ids: collector.barrel_module_ids,
        entry_diagnostics: collector.entry_diagnostics,
    })
}

/// Analyzes one entrypoint and appends its diagnostics to `diagnostics`.
///
/// Resulting order: graph size error, the entrypoint's own findings, then one
/// `barrel-file` error per barrel dependency. Returns the analyzed graph.
pub fn analyze_module_graph(
    entry: &Path,
    builder: &dyn ModuleGraphBuilder,
    options: &GraphOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<ModuleGraph> {
    let GraphBuild { graph, barrel_module_ids, entry_diagnostics } =
        build_graph(entry, builder, &options.file)?;
    let start = diagnostics.len();
    diagnostics.extend(entry_diagnostics);

    let module_count = graph.len();
    if let Some(max) = options.max_module_graph_size
        && module_count > max
    {
        info!("{} leads to {} modules (max {})", entry.display(), module_count, max);
        diagnostics.insert(
            start,
            Diagnostic::new(
                DiagnosticId::ModuleGraphSize,
                Level::Error,
                format!(
                    "\"{}\" leads to a module graph of {} modules, which is more than the allowed maxModuleGraphSize of {}.",
                    entry.display(),
                    module_count,
                    max
                ),
            ),
        );
    }

    for barrel in &barrel_module_ids {
        let chains = trace_importers(barrel, &graph);
        diagnostics.push(
            Diagnostic::new(
                DiagnosticId::BarrelFile,
                Level::Error,
                format!(
                    "\"{}\" leads to an import for \"{}\", which is a barrel file. It is imported via {} import {}.",
                    entry.display(),
                    barrel.display(),
                    chains.len(),
                    if chains.len() == 1 { "chain" } else { "chains" }
                ),
            )
            .with_chains(chains),
        );
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FsGraphBuilder;
    use oxibarrel_core::PathAliases;
    use std::{fs, path::PathBuf};
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn analyze(root: &Path, entry: &Path, options: GraphOptions) -> (usize, Vec<Diagnostic>) {
        let builder = FsGraphBuilder::new(root, PathAliases::new());
        let mut diagnostics = Vec::new();
        let graph = analyze_module_graph(entry, &builder, &options, &mut diagnostics).unwrap();
        (graph.len(), diagnostics)
    }

    fn ids(diagnostics: &[Diagnostic]) -> Vec<DiagnosticId> {
        diagnostics.iter().map(|d| d.id).collect()
    }

    #[test]
    fn test_barrel_dependency_chain() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let entry = create_test_file(&root, "root.js", "import { a } from './mid.js';\nconsole.log(a);");
        let mid = create_test_file(&root, "mid.js", "export { a } from './leaf.js';\nconst x = 1;");
        let leaf = create_test_file(&root, "leaf.js", "export { a, b, c } from './impl.js';");
        create_test_file(&root, "impl.js", "export const a = 1, b = 2, c = 3;");

        let (count, diagnostics) = analyze(&root, &entry, GraphOptions::default());

        assert_eq!(count, 4);
        assert_eq!(ids(&diagnostics), vec![DiagnosticId::BarrelFile]);
        assert_eq!(diagnostics[0].data, Some(vec![vec![leaf.clone(), mid, entry.clone()]]));
        assert!(diagnostics[0].message.contains(&format!("\"{}\"", leaf.display())));
        assert!(diagnostics[0].message.ends_with("via 1 import chain."));
    }

    #[test]
    fn test_graph_size_precedes_barrel_diagnostics() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let entry = create_test_file(&root, "index.js", "import './barrel.js';");
        create_test_file(&root, "barrel.js", "export { a, b } from './a.js';");
        create_test_file(&root, "a.js", "export const a = 1, b = 2;");

        let options = GraphOptions { max_module_graph_size: Some(2), ..Default::default() };
        let (count, diagnostics) = analyze(&root, &entry, options);

        assert_eq!(count, 3);
        assert_eq!(ids(&diagnostics), vec![DiagnosticId::ModuleGraphSize, DiagnosticId::BarrelFile]);
        assert_eq!(diagnostics[0].level, Level::Error);
        assert!(diagnostics[0].message.contains("module graph of 3 modules"));
        assert!(diagnostics[0].message.contains("maxModuleGraphSize of 2"));
    }

    #[test]
    fn test_graph_size_at_limit_is_fine() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let entry = create_test_file(&root, "index.js", "import './a.js';");
        create_test_file(&root, "a.js", "export const a = 1;");

        let options = GraphOptions { max_module_graph_size: Some(2), ..Default::default() };
        let (_, diagnostics) = analyze(&root, &entry, options);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_entrypoint_findings_come_before_dependencies() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let entry = create_test_file(
            &root,
            "index.js",
            "export * from './barrel.js';\nexport { x, y } from './x.js';",
        );
        let barrel = create_test_file(&root, "barrel.js", "export { a, b } from './a.js';");
        create_test_file(&root, "a.js", "export const a = 1, b = 2;");
        create_test_file(&root, "x.js", "export const x = 1, y = 2;");

        let options = GraphOptions { max_module_graph_size: Some(1), ..Default::default() };
        let (_, diagnostics) = analyze(&root, &entry, options);

        assert_eq!(
            ids(&diagnostics),
            vec![
                DiagnosticId::ModuleGraphSize,
                DiagnosticId::BarrelFile,
                DiagnosticId::ReExportAll,
                DiagnosticId::BarrelFile,
            ]
        );
        // The entrypoint's own verdict has no chains, the dependency's does
        assert_eq!(diagnostics[1].data, None);
        assert_eq!(diagnostics[3].data, Some(vec![vec![barrel, entry]]));
    }

    #[test]
    fn test_entry_never_flagged_as_dependency() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let entry = create_test_file(&root, "index.js", "export { a, b, c } from './a.js';");
        create_test_file(&root, "a.js", "import './index.js';\nexport const a = 1, b = 2, c = 3;");

        let builder = FsGraphBuilder::new(&root, PathAliases::new());
        let build = build_graph(&entry, &builder, &FileOptions::default()).unwrap();
        assert!(build.barrel_module_ids.is_empty());
        assert_eq!(build.entry_diagnostics.len(), 1);
        assert_eq!(build.graph.len(), 2);
    }

    #[test]
    fn test_barrels_reported_in_discovery_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let entry = create_test_file(&root, "index.js", "import './a.js';\nimport './b.js';");
        let a = create_test_file(&root, "a.js", "import './c.js';\nexport { x } from './x.js';");
        let b = create_test_file(&root, "b.js", "export { x } from './x.js';");
        let c = create_test_file(&root, "c.js", "export { x } from './x.js';");
        create_test_file(&root, "x.js", "export const x = 1;");

        let builder = FsGraphBuilder::new(&root, PathAliases::new());
        let build = build_graph(&entry, &builder, &FileOptions::default()).unwrap();
        assert_eq!(build.barrel_module_ids, vec![a, b, c]);
    }

    #[test]
    fn test_barrel_behind_dynamically_imported_cycle_keeps_a_chain() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let entry = create_test_file(&root, "root.js", "import('./a.js');");
        let a = create_test_file(&root, "a.js", "import './b.js';");
        let b = create_test_file(&root, "b.js", "import './a.js';\nimport './barrel.js';");
        let barrel = create_test_file(&root, "barrel.js", "export { x, y } from './x.js';");
        create_test_file(&root, "x.js", "export const x = 1, y = 2;");

        let (_, diagnostics) = analyze(&root, &entry, GraphOptions::default());

        assert_eq!(ids(&diagnostics), vec![DiagnosticId::BarrelFile]);
        assert_eq!(diagnostics[0].data, Some(vec![vec![barrel, b, a]]));
        assert!(diagnostics[0].message.ends_with("via 1 import chain."));
        assert!(!diagnostics[0].message.contains("via 0"));
    }

    #[test]
    fn test_threshold_applies_to_dependencies() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();

        let entry = create_test_file(&root, "index.js", "import './small.js';");
        create_test_file(&root, "small.js", "export { a, b } from './a.js';");
        create_test_file(&root, "a.js", "export const a = 1, b = 2;");

        let options = GraphOptions {
            file: FileOptions { barrel_export_threshold: Some(3) },
            max_module_graph_size: None,
        };
        let (_, diagnostics) = analyze(&root, &entry, options);
        assert!(diagnostics.is_empty());
    }
}
