use log::trace;
use std::path::Path;

use crate::{
    graph::ModuleGraphSource,
    types::{ImportChain, ModuleId},
};

/// Collects every acyclic chain of static importers from `module_id` back to
/// the graph's entrypoint.
///
/// Each chain starts with `module_id` and ends at the entrypoint, or at a
/// module nobody imports statically. An importer already on the chain being
/// built is skipped. When every importer of a module is skipped that way, the
/// chain ends at that module, so a reachable module always yields at least one
/// chain.
pub fn trace_importers(module_id: &Path, graph: &dyn ModuleGraphSource) -> Vec<ImportChain> {
    let mut chains = Vec::new();
    let mut path = vec![module_id.to_path_buf()];
    walk(graph, &mut path, &mut chains);
    trace!("Traced {} import chains for {}", chains.len(), module_id.display());
    chains
}

fn walk(graph: &dyn ModuleGraphSource, path: &mut Vec<ModuleId>, chains: &mut Vec<ImportChain>) {
    let Some(current) = path.last().cloned() else {
        return;
    };
    let importers =
        graph.module_info(&current).map(|info| info.importers.as_slice()).unwrap_or_default();

    if current == graph.entry() || importers.is_empty() {
        chains.push(path.clone());
        return;
    }

    let mut followed = false;
    for importer in importers {
        if path.contains(importer) {
            trace!("Skipping cyclic importer {}", importer.display());
            continue;
        }
        followed = true;
        path.push(importer.clone());
        walk(graph, path, chains);
        path.pop();
    }

    // Closed cycle with no way out
    if !followed {
        chains.push(path.clone());
    }
}
