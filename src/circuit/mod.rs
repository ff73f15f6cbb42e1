//! Network representation and topological reduction.
//!
//! A [`Schematic`] is the drawn network: elements with two endpoints each.
//! Before assembly it is reduced in three stages:
//!
//! | Stage | Output |
//! |-------|--------|
//! | [`CircuitGraph::from_schematic`] | nodes and one edge per non-wire element |
//! | [`max_non_branching_paths`] | series chains, one flow unknown each |
//! | [`check_no_solution`] | equation/unknown balance |

mod graph;
mod paths;
mod types;
mod validate;

pub use graph::{CircuitGraph, GraphEdge, GraphNode, NodeKind};
pub use paths::{max_non_branching_paths, Path};
pub use types::*;
pub use validate::{
    check_no_solution, count_equations, kcl_nodes, StructuralCount, StructuralStatus,
};
