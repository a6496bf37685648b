//! Degree and adjacency lookup over an edge list
//!
//! Built once whenever a link force is bound, in compressed sparse row form:
//! the neighbours of node `i` are `neighbors[offsets[i]..offsets[i + 1]]`.

use crate::kinetics::Edge;

/// Undirected adjacency of a node set
#[derive(Debug, Clone, PartialEq)]
pub struct LinkLookup {
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
}

impl LinkLookup {
    /// Index `edges` over `node_count` nodes. Endpoints must already be validated.
    pub fn new(node_count: usize, edges: &[Edge]) -> Self {
        let mut degree = vec![0usize; node_count];
        for edge in edges {
            degree[edge.source] += 1;
            degree[edge.target] += 1;
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);
        for d in &degree {
            offsets.push(offsets[offsets.len() - 1] + d);
        }

        let mut cursor = offsets[..node_count].to_vec();
        let mut neighbors = vec![0; edges.len() * 2];
        for edge in edges {
            neighbors[cursor[edge.source]] = edge.target;
            cursor[edge.source] += 1;
            neighbors[cursor[edge.target]] = edge.source;
            cursor[edge.target] += 1;
        }

        Self { offsets, neighbors }
    }

    pub fn node_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of edge endpoints at `node`; a self-loop counts twice
    pub fn degree(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    /// Nodes adjacent to `node`, in edge order
    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.neighbors[self.offsets[node]..self.offsets[node + 1]]
    }

    /// Share of the link's motion borne by `edge.target`.
    ///
    /// The endpoint with the higher degree gets the smaller share, so hubs
    /// move less.
    pub fn bias(&self, edge: Edge) -> f64 {
        let source = self.degree(edge.source) as f64;
        let target = self.degree(edge.target) as f64;
        source / (source + target)
    }
}
