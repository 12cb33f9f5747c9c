// Arena of exchanges with index-addressed dependency edges

use crate::model::{Edge, Exchange, ROOT};
use crate::registry::Registry;
use std::collections::{BTreeMap, BTreeSet};

/// Dependency graph over a registry. Edges point from a source exchange to
/// the later exchange it supplies, and are stored in both directions.
#[derive(Debug, Clone)]
pub struct ProvenanceGraph {
    exchanges: Vec<Exchange>,
    children: Vec<BTreeMap<usize, Edge>>,
    parents: Vec<BTreeSet<usize>>,
    pub(crate) visited: Vec<bool>,
    target: usize,
}

impl From<Registry> for ProvenanceGraph {
    fn from(registry: Registry) -> Self {
        let (exchanges, target) = registry.into_parts();
        let len = exchanges.len();
        Self {
            exchanges,
            children: vec![BTreeMap::new(); len],
            parents: vec![BTreeSet::new(); len],
            visited: vec![false; len],
            target,
        }
    }
}

impl ProvenanceGraph {
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn exchange(&self, index: usize) -> &Exchange {
        &self.exchanges[index]
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn root(&self) -> usize {
        ROOT
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn children(&self, index: usize) -> &BTreeMap<usize, Edge> {
        &self.children[index]
    }

    pub fn parents(&self, index: usize) -> &BTreeSet<usize> {
        &self.parents[index]
    }

    pub fn edge(&self, source: usize, target: usize) -> Option<&Edge> {
        self.children[source].get(&target)
    }

    /// Every edge as `(source, target, edge)`, ordered by source then target
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &Edge)> {
        self.children.iter().enumerate().flat_map(|(source, children)| {
            children
                .iter()
                .map(move |(&target, edge)| (source, target, edge))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.children.iter().map(BTreeMap::len).sum()
    }

    pub(crate) fn link(&mut self, source: usize, target: usize, edge: Edge) {
        debug_assert!(source < target, "edges must point forward in time");
        self.children[source].insert(target, edge);
        self.parents[target].insert(source);
    }

    pub(crate) fn unlink(&mut self, source: usize, target: usize) -> Option<Edge> {
        self.parents[target].remove(&source);
        self.children[source].remove(&target)
    }

    /// Take all parent edges of `index`, leaving it disconnected upstream
    pub(crate) fn detach_parents(&mut self, index: usize) -> BTreeSet<usize> {
        let parents = std::mem::take(&mut self.parents[index]);
        for &parent in &parents {
            self.children[parent].remove(&index);
        }
        parents
    }

    pub(crate) fn reset_visited(&mut self) {
        self.visited.iter_mut().for_each(|v| *v = false);
    }
}
