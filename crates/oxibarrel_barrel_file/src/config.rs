use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, trace, warn};
use oxibarrel_core::{PathAliases, read_tsconfig_paths};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const CONFIG_FILE_NAME: &str = "oxibarrel.config.json";
pub const DEFAULT_MAX_MODULE_GRAPH_SIZE: usize = 10;
pub const DEFAULT_AMOUNT_OF_EXPORTS_TO_CONSIDER_MODULE_AS_BARREL: usize = 3;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "barrel-files")]
#[command(about = "Find barrel files in a package's entrypoints and the modules they import")]
pub struct Config {
    /// Package directory containing package.json (defaults to the current directory)
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Maximum number of modules an entrypoint may lead to [default: 10]
    #[arg(long)]
    pub max_module_graph_size: Option<usize>,

    /// Number of exports before a module is considered a barrel file [default: 3]
    #[arg(long)]
    pub amount_of_exports_to_consider_module_as_barrel: Option<usize>,

    /// Print the import chains leading to every barrel file
    #[arg(long)]
    pub info: bool,

    /// Print the reports as JSON
    #[arg(long)]
    pub json: bool,

    #[clap(skip)]
    pub path_aliases: PathAliases,
}

/// Settings read from `oxibarrel.config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub max_module_graph_size: Option<usize>,
    pub amount_of_exports_to_consider_module_as_barrel: Option<usize>,
    pub info: Option<bool>,
}

impl UserConfig {
    /// Reads the user config from `dir`. A missing or malformed file yields
    /// the empty config.
    pub fn read(dir: &Path) -> Self {
        let path = dir.join(CONFIG_FILE_NAME);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(_) => {
                trace!("No user config at {}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => {
                debug!("Loaded user config from {}: {:?}", path.display(), config);
                config
            }
            Err(e) => {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl Config {
    /// Resolves `cwd`, merges in the user config and defaults (command line
    /// flags win) and loads tsconfig path aliases.
    pub fn initialize(&mut self) -> Result<()> {
        let cwd = match self.cwd.take() {
            Some(cwd) => cwd,
            None => env::current_dir().context("Failed to read the current directory")?,
        };
        let cwd = cwd
            .canonicalize()
            .with_context(|| format!("Package directory {} does not exist", cwd.display()))?;
        debug!("Using package directory: {}", cwd.display());

        self.merge(UserConfig::read(&cwd));
        self.path_aliases = read_tsconfig_paths(&cwd);
        self.cwd = Some(cwd);
        Ok(())
    }

    fn merge(&mut self, user: UserConfig) {
        self.max_module_graph_size = self
            .max_module_graph_size
            .or(user.max_module_graph_size)
            .or(Some(DEFAULT_MAX_MODULE_GRAPH_SIZE));
        self.amount_of_exports_to_consider_module_as_barrel = self
            .amount_of_exports_to_consider_module_as_barrel
            .or(user.amount_of_exports_to_consider_module_as_barrel)
            .or(Some(DEFAULT_AMOUNT_OF_EXPORTS_TO_CONSIDER_MODULE_AS_BARREL));
        self.info = self.info || user.info.unwrap_or(false);
        trace!(
            "Merged config: max_module_graph_size={:?}, amount_of_exports={:?}, info={}",
            self.max_module_graph_size,
            self.amount_of_exports_to_consider_module_as_barrel,
            self.info
        );
    }

    pub fn cwd(&self) -> &Path {
        self.cwd.as_deref().unwrap_or(Path::new("."))
    }

    pub fn max_module_graph_size(&self) -> usize {
        self.max_module_graph_size.unwrap_or(DEFAULT_MAX_MODULE_GRAPH_SIZE)
    }

    pub fn amount_of_exports_to_consider_module_as_barrel(&self) -> usize {
        self.amount_of_exports_to_consider_module_as_barrel
            .unwrap_or(DEFAULT_AMOUNT_OF_EXPORTS_TO_CONSIDER_MODULE_AS_BARREL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        Config { cwd: Some(dir.to_path_buf()), ..Default::default() }
    }

    #[test]
    fn test_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let mut cfg = config_in(temp_dir.path());
        cfg.initialize().unwrap();

        assert_eq!(cfg.max_module_graph_size(), 10);
        assert_eq!(cfg.amount_of_exports_to_consider_module_as_barrel(), 3);
        assert!(!cfg.info);
        assert_eq!(cfg.cwd(), temp_dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_user_config_fills_missing_flags() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{ "maxModuleGraphSize": 50, "amountOfExportsToConsiderModuleAsBarrel": 5, "info": true }"#,
        )
        .unwrap();

        let mut cfg = config_in(temp_dir.path());
        cfg.initialize().unwrap();

        assert_eq!(cfg.max_module_graph_size(), 50);
        assert_eq!(cfg.amount_of_exports_to_consider_module_as_barrel(), 5);
        assert!(cfg.info);
    }

    #[test]
    fn test_cli_flags_override_user_config() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{ "maxModuleGraphSize": 50 }"#)
            .unwrap();

        let mut cfg = Config {
            max_module_graph_size: Some(20),
            amount_of_exports_to_consider_module_as_barrel: Some(1),
            ..config_in(temp_dir.path())
        };
        cfg.initialize().unwrap();

        assert_eq!(cfg.max_module_graph_size(), 20);
        assert_eq!(cfg.amount_of_exports_to_consider_module_as_barrel(), 1);
    }

    #[test]
    fn test_malformed_user_config_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();

        assert_eq!(UserConfig::read(temp_dir.path()), UserConfig::default());

        let mut cfg = config_in(temp_dir.path());
        cfg.initialize().unwrap();
        assert_eq!(cfg.max_module_graph_size(), 10);
    }

    #[test]
    fn test_missing_cwd_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let mut cfg = config_in(&temp_dir.path().join("missing"));
        assert!(cfg.initialize().is_err());
    }

    #[test]
    fn test_cli_parsing() {
        let cfg = Config::parse_from([
            "barrel-files",
            "--cwd",
            "pkg",
            "--max-module-graph-size",
            "25",
            "--amount-of-exports-to-consider-module-as-barrel",
            "4",
            "--info",
        ]);
        assert_eq!(cfg.cwd, Some(PathBuf::from("pkg")));
        assert_eq!(cfg.max_module_graph_size, Some(25));
        assert_eq!(cfg.amount_of_exports_to_consider_module_as_barrel, Some(4));
        assert!(cfg.info);
        assert!(!cfg.json);
    }

    #[test]
    fn test_tsconfig_aliases_loaded() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("tsconfig.json"),
            r#"{ "compilerOptions": { "paths": { "@lib/*": ["src/lib/*"] } } }"#,
        )
        .unwrap();

        let mut cfg = config_in(temp_dir.path());
        cfg.initialize().unwrap();
        assert!(cfg.path_aliases.contains_key("@lib"));
    }
}
