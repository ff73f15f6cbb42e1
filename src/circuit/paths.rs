//! Maximal non-branching path decomposition.
//!
//! Every series chain of elements between two branch points carries one flow,
//! so it becomes one [`Path`] and one flow unknown. The walk starts from each
//! branch point along each incident edge and crosses degree-2 nodes until it
//! reaches another branch point. Since the graph is undirected each chain is
//! found once from each end; the second discovery is dropped.

use std::collections::HashSet;

use super::graph::CircuitGraph;
use crate::error::{LumpedError, Result};

/// A maximal series chain between two branch points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Branch node the walk started from
    pub start: usize,
    /// Branch node the walk ended on
    pub end: usize,
    /// Edge indices in traversal order from `start`
    pub edges: Vec<usize>,
}

impl Path {
    /// Orientation-free identity: bounding nodes plus the edge multiset.
    fn canonical_key(&self) -> (usize, usize, Vec<usize>) {
        let mut edges = self.edges.clone();
        edges.sort_unstable();
        (self.start.min(self.end), self.start.max(self.end), edges)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Decompose a reduced graph into maximal non-branching paths.
///
/// Fails with [`LumpedError::UnsupportedTopology`] when some edges lie on a
/// cycle without any branch point, since no walk can reach them.
pub fn max_non_branching_paths(graph: &CircuitGraph) -> Result<Vec<Path>> {
    let limit = graph.edges.len();
    let mut paths = Vec::new();
    let mut seen = HashSet::new();

    for node in graph.nodes.iter().filter(|n| n.is_branch_point()) {
        for &first in &node.edges {
            let path = walk(graph, node.index, first, limit)?;
            if seen.insert(path.canonical_key()) {
                paths.push(path);
            }
        }
    }

    let mut covered = vec![false; graph.edges.len()];
    for path in &paths {
        for &e in &path.edges {
            covered[e] = true;
        }
    }
    let uncovered: Vec<String> = covered
        .iter()
        .enumerate()
        .filter(|(_, &c)| !c)
        .map(|(e, _)| graph.labels[e].clone())
        .collect();
    if !uncovered.is_empty() {
        return Err(LumpedError::UnsupportedTopology {
            elements: uncovered,
        });
    }

    tracing::debug!(paths = paths.len(), "decomposed network into paths");
    Ok(paths)
}

/// Follow `first` out of branch node `start` until the next branch point.
fn walk(graph: &CircuitGraph, start: usize, first: usize, limit: usize) -> Result<Path> {
    let mut edges = vec![first];
    let mut prev = first;
    let mut current = graph.edges[first].other_end(start);
    let mut steps = 0;

    while !graph.nodes[current].is_branch_point() {
        steps += 1;
        if steps > limit {
            return Err(LumpedError::PathWalkOverflow { start, limit });
        }
        let next = graph.nodes[current]
            .edges
            .iter()
            .copied()
            .find(|&e| e != prev)
            .ok_or_else(|| {
                LumpedError::internal(format!("node {} has no outgoing edge", current))
            })?;
        edges.push(next);
        prev = next;
        current = graph.edges[next].other_end(current);
    }

    Ok(Path {
        start,
        end: current,
        edges,
    })
}
