// Cascading removal of vertices that no longer explain anything

use crate::graph::ProvenanceGraph;
use tracing::debug;

impl ProvenanceGraph {
    /// Remove `start` from the graph if it has no children left, then every
    /// ancestor that becomes childless as a result. The root and the target
    /// are never removed.
    ///
    /// Returns the removed vertices; their visited marks are cleared so they
    /// are examined again if a later match reconnects them.
    pub fn prune_orphans(&mut self, start: usize) -> Vec<usize> {
        let mut pruned = Vec::new();
        let mut worklist = vec![start];

        while let Some(vertex) = worklist.pop() {
            if vertex == self.root()
                || vertex == self.target()
                || !self.children(vertex).is_empty()
            {
                continue;
            }

            for parent in self.detach_parents(vertex) {
                if self.children(parent).is_empty() {
                    worklist.push(parent);
                }
            }

            debug!("Pruned orphan {}", self.exchange(vertex).url);
            self.visited[vertex] = false;
            pruned.push(vertex);
        }

        pruned
    }
}
