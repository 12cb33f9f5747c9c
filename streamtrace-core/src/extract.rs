// Forward traversal producing the explanatory subgraph handed to exporters

use crate::graph::ProvenanceGraph;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathVertex {
    pub index: usize,
    pub url: String,
    /// Reachable forward from the root
    pub rooted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathEdge {
    pub source: usize,
    pub target: usize,
    pub label: String,
    pub direct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvenancePath {
    pub root: usize,
    pub target: usize,
    pub vertices: Vec<PathVertex>,
    pub edges: Vec<PathEdge>,
}

impl ProvenancePath {
    /// Whether the target is explained all the way back to the root
    pub fn is_connected(&self) -> bool {
        self.vertices
            .iter()
            .any(|vertex| vertex.index == self.target && vertex.rooted)
    }

    pub fn vertex(&self, index: usize) -> Option<&PathVertex> {
        self.vertices.iter().find(|vertex| vertex.index == index)
    }

    pub fn edge(&self, source: usize, target: usize) -> Option<&PathEdge> {
        self.edges
            .iter()
            .find(|edge| edge.source == source && edge.target == target)
    }
}

impl ProvenanceGraph {
    /// Walk the surviving edges forward from the root, visiting each vertex
    /// once. Branches the root does not reach are appended afterwards,
    /// starting from their parentless sources, so no surviving edge is lost.
    pub fn extract_path(&mut self) -> ProvenancePath {
        self.reset_visited();
        let mut path = ProvenancePath {
            root: self.root(),
            target: self.target(),
            vertices: Vec::new(),
            edges: Vec::new(),
        };

        if self.is_empty() {
            return path;
        }

        self.traverse_from(self.root(), true, &mut path);

        for index in 0..self.len() {
            if !self.visited[index]
                && self.parents(index).is_empty()
                && !self.children(index).is_empty()
            {
                self.traverse_from(index, false, &mut path);
            }
        }

        path
    }

    fn traverse_from(&mut self, start: usize, rooted: bool, path: &mut ProvenancePath) {
        let mut queue = VecDeque::from([start]);
        self.visited[start] = true;

        while let Some(current) = queue.pop_front() {
            path.vertices.push(PathVertex {
                index: current,
                url: self.exchange(current).url.clone(),
                rooted,
            });

            let children: Vec<usize> = self.children(current).keys().copied().collect();
            for child in children {
                if let Some(edge) = self.edge(current, child) {
                    path.edges.push(PathEdge {
                        source: current,
                        target: child,
                        label: edge.label(),
                        direct: edge.direct,
                    });
                }
                if !self.visited[child] {
                    self.visited[child] = true;
                    queue.push_back(child);
                }
            }
        }
    }
}
