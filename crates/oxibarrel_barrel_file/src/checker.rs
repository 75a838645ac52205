use anyhow::{Context, Result};
use log::{debug, info, warn};
use oxibarrel_core::{PackageJson, is_js_ts_path};
use std::collections::HashSet;

use crate::{
    classifier::FileOptions,
    config::Config,
    graph::{FsGraphBuilder, ModuleGraphSource},
    module_graph::{GraphOptions, analyze_module_graph},
    types::{CheckResult, EntrypointReport, ModuleId},
};

/// Analyzes every public entrypoint of the package in `cfg.cwd`.
///
/// `cfg` is initialized in place, so afterwards it holds the merged settings.
/// A missing or unusable export surface is returned as a
/// [`oxibarrel_core::PackageError`] inside the `anyhow::Error`.
pub fn run_barrel_check(cfg: &mut Config) -> Result<CheckResult> {
    info!("Starting barrel file check");
    cfg.initialize()?;
    let cwd = cfg.cwd().to_path_buf();
    info!("Using package directory: {}", cwd.display());

    let package = PackageJson::from_dir(&cwd)?;
    let entries = package.entrypoints(&cwd)?;
    info!("Found {} entrypoints", entries.len());

    let builder = FsGraphBuilder::new(&cwd, cfg.path_aliases.clone());
    let options = GraphOptions {
        file: FileOptions {
            barrel_export_threshold: Some(cfg.amount_of_exports_to_consider_module_as_barrel()),
        },
        max_module_graph_size: Some(cfg.max_module_graph_size()),
    };
    debug!("Graph options: {:?}", options);

    let mut reports = Vec::with_capacity(entries.len());
    // Entrypoints often share dependencies; count each file once
    let mut analyzed_files: HashSet<ModuleId> = HashSet::new();

    for entry in entries {
        if !entry.file_path.is_file() {
            warn!("Skipping '{}': {} does not exist", entry.key, entry.file_path.display());
            continue;
        }
        if !is_js_ts_path(&entry.file_path) {
            warn!("Skipping '{}': {} is not a JS/TS module", entry.key, entry.file_path.display());
            continue;
        }

        let file = entry
            .file_path
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", entry.file_path.display()))?;
        debug!("Analyzing entrypoint '{}' ({})", entry.key, file.display());

        let mut diagnostics = Vec::new();
        let graph = analyze_module_graph(&file, &builder, &options, &mut diagnostics)?;
        let module_count = graph.len();
        analyzed_files.extend(graph.module_ids().iter().cloned());
        debug!("'{}' produced {} diagnostics", entry.key, diagnostics.len());

        reports.push(EntrypointReport { key: entry.key, file, module_count, diagnostics });
    }

    info!("Barrel file check complete. Analyzed {} entrypoints", reports.len());
    Ok(CheckResult { entrypoints: reports, files_analyzed: analyzed_files.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiagnosticId, Level};
    use oxibarrel_core::PackageError;
    use std::{
        fs,
        path::{Path, PathBuf},
    };
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn config_in(dir: &Path) -> Config {
        Config { cwd: Some(dir.to_path_buf()), ..Default::default() }
    }

    #[test]
    fn test_string_exports_barrel_entrypoint() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        create_test_file(&root, "package.json", r#"{ "name": "pkg", "exports": "./index.js" }"#);
        let index = create_test_file(&root, "index.js", "export { a, b, c } from './impl.js';");
        create_test_file(&root, "impl.js", "export const a = 1, b = 2, c = 3;");

        let result = run_barrel_check(&mut config_in(&root)).unwrap();

        assert_eq!(result.entrypoints.len(), 1);
        let report = &result.entrypoints[0];
        assert_eq!(report.key, ".");
        assert_eq!(report.file, index);
        assert_eq!(report.module_count, 2);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].id, DiagnosticId::BarrelFile);
        assert_eq!(report.diagnostics[0].loc, None);
        assert!(result.has_errors());
        assert_eq!(result.files_analyzed, 2);
    }

    #[test]
    fn test_wildcard_exports_analyzed_separately() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        create_test_file(&root, "package.json", r#"{ "exports": { "./foo/*": "./foo/*.js" } }"#);
        create_test_file(&root, "foo/a.js", "export const a = 1;");
        create_test_file(&root, "foo/b.js", "export const b = 1;");

        let result = run_barrel_check(&mut config_in(&root)).unwrap();

        assert_eq!(result.entrypoints.len(), 2);
        assert!(result.entrypoints.iter().all(|e| e.key == "./foo/*"));
        assert!(!result.has_errors());
        assert_eq!(result.count(Level::Warning), 0);
    }

    #[test]
    fn test_shared_dependencies_counted_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        create_test_file(&root, "package.json", r#"{ "exports": { "./foo/*": "./foo/*.js" } }"#);
        create_test_file(&root, "foo/a.js", "import { s } from '../shared.js';\nexport const a = s;");
        create_test_file(&root, "foo/b.js", "import { s } from '../shared.js';\nexport const b = s;");
        create_test_file(&root, "shared.js", "export const s = 1;");

        let result = run_barrel_check(&mut config_in(&root)).unwrap();

        assert_eq!(result.entrypoints.len(), 2);
        assert!(result.entrypoints.iter().all(|e| e.module_count == 2));
        assert_eq!(result.files_analyzed, 3);
    }

    #[test]
    fn test_dependency_barrel_classified_but_not_an_entrypoint() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        create_test_file(&root, "package.json", r#"{ "exports": "./index.js" }"#);
        create_test_file(&root, "index.js", "import { a } from 'dep';\nconsole.log(a);");
        create_test_file(
            &root,
            "node_modules/dep/package.json",
            r#"{ "exports": { ".": "./index.js", "./extra": "./extra.js" } }"#,
        );
        let dep =
            create_test_file(&root, "node_modules/dep/index.js", "export { a, b, c } from './impl.js';");
        create_test_file(&root, "node_modules/dep/impl.js", "export const a = 1, b = 2, c = 3;");
        create_test_file(&root, "node_modules/dep/extra.js", "export { a, b, c } from './impl.js';");

        let result = run_barrel_check(&mut config_in(&root)).unwrap();

        assert_eq!(result.entrypoints.len(), 1);
        let diagnostics = &result.entrypoints[0].diagnostics;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].id, DiagnosticId::BarrelFile);
        assert_eq!(diagnostics[0].data.as_ref().unwrap()[0][0], dep);
        assert_eq!(result.files_analyzed, 3);
    }

    #[test]
    fn test_empty_exports_object_is_missing_surface() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "pkg", "exports": {} }"#);

        let err = run_barrel_check(&mut config_in(root)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::MissingExportsField { .. })
        ));
    }

    #[test]
    fn test_missing_export_surface_is_typed_error() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "pkg" }"#);

        let err = run_barrel_check(&mut config_in(root)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackageError>(),
            Some(PackageError::MissingExportsField { .. })
        ));
    }

    #[test]
    fn test_missing_package_json_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = run_barrel_check(&mut config_in(temp_dir.path())).unwrap_err();
        assert!(matches!(err.downcast_ref::<PackageError>(), Some(PackageError::Read { .. })));
    }

    #[test]
    fn test_missing_and_non_js_entrypoints_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        create_test_file(
            &root,
            "package.json",
            r#"{ "exports": { ".": "./index.js", "./gone": "./gone.js", "./styles": "./styles.css" } }"#,
        );
        create_test_file(&root, "index.js", "export const a = 1;");
        create_test_file(&root, "styles.css", "body {}");

        let result = run_barrel_check(&mut config_in(&root)).unwrap();
        assert_eq!(result.entrypoints.len(), 1);
        assert_eq!(result.entrypoints[0].key, ".");
    }

    #[test]
    fn test_user_config_limits_graph_size() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        create_test_file(&root, "package.json", r#"{ "main": "./index.js" }"#);
        create_test_file(&root, "oxibarrel.config.json", r#"{ "maxModuleGraphSize": 1 }"#);
        create_test_file(&root, "index.js", "import './a.js';");
        create_test_file(&root, "a.js", "export const a = 1;");

        let result = run_barrel_check(&mut config_in(&root)).unwrap();
        let diagnostics = &result.entrypoints[0].diagnostics;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].id, DiagnosticId::ModuleGraphSize);
    }
}
