use anyhow::{Context, Result};
use log::{debug, trace, warn};
use oxibarrel_core::{
    ModuleSyntax, PathAliases, ResolveCache, SpecKind, is_js_ts_path, is_relative, parse_module,
    resolve,
};
use rayon::prelude::*;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::types::ModuleId;

/// Edges recorded for one module of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    pub id: ModuleId,
    /// Modules importing this one statically
    pub importers: Vec<ModuleId>,
    /// Modules importing this one through `import()`
    pub dynamic_importers: Vec<ModuleId>,
    pub imported_ids: Vec<ModuleId>,
}

/// Read access to a built module graph.
pub trait ModuleGraphSource {
    fn entry(&self) -> &Path;
    /// Module ids in discovery order, entry first.
    fn module_ids(&self) -> &[ModuleId];
    fn module_info(&self, id: &Path) -> Option<&ModuleInfo>;
}

/// Hooks invoked while a module graph is built.
pub trait GraphPlugin {
    /// Called once for every parsed module, in discovery order.
    fn transform(&mut self, syntax: &ModuleSyntax, id: &Path);

    /// Called once after discovery has finished.
    fn build_end(&mut self, _graph: &dyn ModuleGraphSource) {}
}

pub trait ModuleGraphBuilder {
    fn build(&self, entry: &Path, plugin: &mut dyn GraphPlugin) -> Result<ModuleGraph>;
}

#[derive(Debug, Clone)]
pub struct ModuleGraph {
    entry: ModuleId,
    order: Vec<ModuleId>,
    modules: HashMap<ModuleId, ModuleInfo>,
}

impl ModuleGraph {
    pub fn new(entry: ModuleId) -> Self {
        let mut graph = Self { entry: entry.clone(), order: Vec::new(), modules: HashMap::new() };
        graph.add_module(entry);
        graph
    }

    /// Returns `true` when the module was not part of the graph yet.
    pub fn add_module(&mut self, id: ModuleId) -> bool {
        if self.modules.contains_key(&id) {
            return false;
        }
        self.order.push(id.clone());
        self.modules.insert(id.clone(), ModuleInfo { id, ..Default::default() });
        true
    }

    pub fn add_edge(&mut self, from: &Path, to: &Path, kind: SpecKind) {
        self.add_module(from.to_path_buf());
        self.add_module(to.to_path_buf());

        if let Some(info) = self.modules.get_mut(from)
            && !info.imported_ids.iter().any(|id| id == to)
        {
            info.imported_ids.push(to.to_path_buf());
        }
        if let Some(info) = self.modules.get_mut(to) {
            let importers = match kind {
                SpecKind::Static => &mut info.importers,
                SpecKind::Dynamic => &mut info.dynamic_importers,
            };
            if !importers.iter().any(|id| id == from) {
                importers.push(from.to_path_buf());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl ModuleGraphSource for ModuleGraph {
    fn entry(&self) -> &Path {
        &self.entry
    }

    fn module_ids(&self) -> &[ModuleId] {
        &self.order
    }

    fn module_info(&self, id: &Path) -> Option<&ModuleInfo> {
        self.modules.get(id)
    }
}

/// Builds module graphs by parsing files from disk.
#[derive(Debug, Clone)]
pub struct FsGraphBuilder {
    root: PathBuf,
    aliases: PathAliases,
}

struct LoadedModule {
    id: ModuleId,
    syntax: Option<ModuleSyntax>,
    edges: Vec<(ModuleId, SpecKind)>,
}

impl FsGraphBuilder {
    pub fn new(root: impl Into<PathBuf>, aliases: PathAliases) -> Self {
        Self { root: root.into(), aliases }
    }

    fn load(&self, id: &Path, cache: &ResolveCache) -> LoadedModule {
        let mut module = LoadedModule { id: id.to_path_buf(), syntax: None, edges: Vec::new() };

        if !is_js_ts_path(id) {
            trace!("Not parsing non-JS module: {}", id.display());
            return module;
        }

        let syntax = match parse_module(id) {
            Ok(syntax) => syntax,
            Err(e) => {
                warn!("Skipping unreadable module {}: {:#}", id.display(), e);
                return module;
            }
        };

        for spec in &syntax.specifiers {
            match resolve(&self.root, &self.aliases, id, &spec.request, cache) {
                Ok(Some(target)) => module.edges.push((target, spec.kind)),
                Ok(None) if is_relative(&spec.request) => {
                    warn!("Could not resolve '{}' from {}", spec.request, id.display());
                }
                Ok(None) => {
                    debug!("Leaving '{}' from {} unresolved", spec.request, id.display());
                }
                Err(e) => warn!("Error resolving '{}' from {}: {}", spec.request, id.display(), e),
            }
        }

        module.syntax = Some(syntax);
        module
    }
}

impl ModuleGraphBuilder for FsGraphBuilder {
    fn build(&self, entry: &Path, plugin: &mut dyn GraphPlugin) -> Result<ModuleGraph> {
        let entry = entry
            .canonicalize()
            .with_context(|| format!("Failed to resolve entrypoint {}", entry.display()))?;
        debug!("Building module graph from {}", entry.display());

        let cache = ResolveCache::new();
        let mut graph = ModuleGraph::new(entry.clone());
        let mut frontier = vec![entry];

        while !frontier.is_empty() {
            trace!("Loading frontier of {} modules", frontier.len());
            let loaded: Vec<LoadedModule> =
                frontier.par_iter().map(|id| self.load(id, &cache)).collect();

            let mut next = Vec::new();
            for module in loaded {
                if let Some(syntax) = &module.syntax {
                    plugin.transform(syntax, &module.id);
                }
                for (target, kind) in module.edges {
                    if graph.add_module(target.clone()) {
                        next.push(target.clone());
                    }
                    graph.add_edge(&module.id, &target, kind);
                }
            }
            frontier = next;
        }

        debug!("Module graph of {} has {} modules", graph.entry().display(), graph.len());
        plugin.build_end(&graph);
        Ok(graph)
    }
}
