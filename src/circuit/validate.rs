//! Structural solvability check.
//!
//! Before any matrix is allocated the equation count is compared with the
//! unknown count. Each traversed edge contributes one row and each node that
//! bounds two or more path ends contributes one flow-balance row.

use std::fmt;

use super::graph::CircuitGraph;
use super::paths::Path;

/// Outcome of the equation/unknown count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralStatus {
    Balanced,
    /// Fewer equations than unknowns
    UnderConstrained,
    /// More equations than unknowns
    OverConstrained,
}

impl StructuralStatus {
    /// Numeric status code reported to callers.
    pub fn code(&self) -> u8 {
        match self {
            Self::Balanced => 0,
            Self::UnderConstrained => 1,
            Self::OverConstrained => 2,
        }
    }

    /// Hint shown to the user when the network cannot be solved.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Balanced => "network is well posed",
            Self::UnderConstrained => "the problem is under constrained, add a source",
            Self::OverConstrained => "the problem is over constrained, remove a source",
        }
    }
}

impl fmt::Display for StructuralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hint())
    }
}

/// Equation and unknown counts of a decomposed network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuralCount {
    pub equations: usize,
    pub unknowns: usize,
}

impl StructuralCount {
    pub fn status(&self) -> StructuralStatus {
        use std::cmp::Ordering;
        match self.equations.cmp(&self.unknowns) {
            Ordering::Equal => StructuralStatus::Balanced,
            Ordering::Less => StructuralStatus::UnderConstrained,
            Ordering::Greater => StructuralStatus::OverConstrained,
        }
    }
}

/// Nodes bounding two or more path ends, ascending.
///
/// A path that starts and ends on the same node counts twice.
pub fn kcl_nodes(graph: &CircuitGraph, paths: &[Path]) -> Vec<usize> {
    let mut references = vec![0usize; graph.nodes.len()];
    for path in paths {
        references[path.start] += 1;
        references[path.end] += 1;
    }
    references
        .iter()
        .enumerate()
        .filter(|(_, &count)| count >= 2)
        .map(|(node, _)| node)
        .collect()
}

/// Count equations and unknowns without building any matrix.
pub fn count_equations(graph: &CircuitGraph, paths: &[Path]) -> StructuralCount {
    let edge_rows: usize = paths.iter().map(Path::len).sum();
    StructuralCount {
        equations: edge_rows + kcl_nodes(graph, paths).len(),
        unknowns: graph.num_pressures() + paths.len(),
    }
}

/// Classify a decomposed network as balanced, under- or over-constrained.
pub fn check_no_solution(graph: &CircuitGraph, paths: &[Path]) -> StructuralStatus {
    let count = count_equations(graph, paths);
    let status = count.status();
    if status != StructuralStatus::Balanced {
        tracing::warn!(
            equations = count.equations,
            unknowns = count.unknowns,
            "{}",
            status
        );
    }
    status
}
