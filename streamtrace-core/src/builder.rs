// Dependency graph construction from the target backwards

use crate::error::Result;
use crate::graph::ProvenanceGraph;
use crate::matching::match_exchange;
use crate::model::{Edge, ROOT};
use crate::registry::{Registry, RegistryOptions, build_registry};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use streamtrace_capture::{BodySource, CapturedExchange};
use tracing::{debug, info, warn};

/// Options for a full resolution run
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub registry: RegistryOptions,
    /// Treat a body quoting a later URL verbatim as a full explanation of it
    pub match_direct_urls: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            registry: RegistryOptions::default(),
            match_direct_urls: true,
        }
    }
}

/// Needed items of an exchange that no earlier exchange supplied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unexplained {
    pub index: usize,
    pub url: String,
    pub missing: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub graph: ProvenanceGraph,
    pub unexplained: Vec<Unexplained>,
}

/// Registry, graph construction and pruning in one go
pub fn resolve_capture<B>(
    captured: &[CapturedExchange],
    bodies: &B,
    options: &ResolveOptions,
) -> Result<Resolution>
where
    B: BodySource + ?Sized,
{
    let registry = build_registry(captured, bodies, &options.registry)?;
    Ok(resolve(registry, options))
}

/// Discover, starting from the target, which earlier exchanges supplied the
/// data each needed exchange consumed.
pub fn resolve(registry: Registry, options: &ResolveOptions) -> Resolution {
    let mut graph = ProvenanceGraph::from(registry);
    let mut unexplained = Vec::new();
    let target = graph.target();

    graph.reset_visited();
    graph.visited[ROOT] = true;
    graph.visited[target] = true;
    let mut queue = VecDeque::from([target]);

    while let Some(current) = queue.pop_front() {
        let needed = graph.exchange(current).needed();
        let mut explained = BTreeSet::new();

        // closest sources first
        for earlier in (0..current).rev() {
            let Some(edge) = match_exchange(
                graph.exchange(earlier),
                graph.exchange(current),
                &needed,
                options.match_direct_urls,
            ) else {
                continue;
            };

            explained.extend(edge.provides.iter().cloned());
            let complete = edge.provides == needed;
            attach(&mut graph, &mut queue, earlier, current, edge);

            if complete {
                break;
            }
        }

        let missing: BTreeSet<String> = needed.difference(&explained).cloned().collect();
        if !missing.is_empty() {
            let url = graph.exchange(current).url.clone();
            warn!(
                "Couldn't find the following for {}: {}",
                url,
                missing.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
            );
            unexplained.push(Unexplained {
                index: current,
                url,
                missing,
            });
        }
    }

    info!(
        "Resolved {} edges over {} exchanges ({} partially unexplained)",
        graph.edge_count(),
        graph.len(),
        unexplained.len()
    );

    Resolution { graph, unexplained }
}

/// Add `earlier -> current` unless an existing parent already supplies at
/// least as much; existing parents supplying strictly less are cut and
/// pruned if left childless.
fn attach(
    graph: &mut ProvenanceGraph,
    queue: &mut VecDeque<usize>,
    earlier: usize,
    current: usize,
    edge: Edge,
) {
    let parents: Vec<usize> = graph.parents(current).iter().copied().collect();
    let mut dominated = Vec::new();

    for parent in parents {
        let Some(existing) = graph.edge(parent, current) else {
            continue;
        };
        if existing.provides.is_superset(&edge.provides) {
            debug!(
                "Discarding {} -> {}: dominated by {}",
                earlier, current, parent
            );
            return;
        }
        if existing.provides.is_subset(&edge.provides) {
            dominated.push(parent);
        }
    }

    for parent in dominated {
        debug!("Cutting {} -> {}: dominated by {}", parent, current, earlier);
        graph.unlink(parent, current);
        for pruned in graph.prune_orphans(parent) {
            queue.retain(|&queued| queued != pruned);
        }
    }

    debug!(
        "Linking {} -> {} [{}]",
        earlier,
        current,
        edge.label()
    );
    graph.link(earlier, current, edge);

    if !graph.visited[earlier] {
        graph.visited[earlier] = true;
        queue.push_back(earlier);
    }
}
