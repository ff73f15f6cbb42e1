//! System assembly: `M1·dx/dt + M0·x = Source(t)`.
//!
//! The unknown vector holds the pressure of every non-reference node (in
//! node order) followed by one flow per path. Rows are laid out as one row
//! per path edge, walking each path from its start, then one flow-balance
//! row per node bounding several path ends, by ascending node.
//!
//! | Element | M0 row | M1 row | Source |
//! |---------|--------|--------|--------|
//! | Resistor | `P0 - P1 - R·Q` | | 0 |
//! | Capacitor | `-Q` | `C·P0 - C·P1` | 0 |
//! | Inductor | `P0 - P1` | `-L·Q` | 0 |
//! | Ground | `P` at terminal 0 | | 0 |
//! | Pressure source | `P` at terminal 0 | | `s(t)` |
//! | Flow source | `±Q` | | `s(t)` |
//! | Diode | `P0 - P1` or `Q` | | 0 |
//! | Balance | `Σ ±Q` | | 0 |
//!
//! `P0`/`P1` are the upstream/downstream pressures in traversal order;
//! reference pressures are zero and dropped.

use std::fmt;

use super::dense::DenseMatrix;
use super::diode::DiodeRow;
use crate::circuit::{kcl_nodes, CircuitGraph, ElementKind, Path, Schematic};
use crate::error::{LumpedError, Result};
use crate::expr::{SourceEvaluator, SourceFn};

/// What a row of the system stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Resistor,
    Capacitor,
    Inductor,
    Ground,
    /// Index into the source table
    PressureSource { source: usize },
    FlowSource { source: usize },
    /// Index into the diode table
    Diode { slot: usize },
    /// Flow balance at a branch node
    BranchKcl,
}

/// Display metadata of one unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unknown {
    pub name: String,
    pub listened: bool,
}

/// Matrices and tables of one assembled network.
pub struct AssembledSystem {
    pub m0: DenseMatrix,
    pub m1: DenseMatrix,
    pub rows: Vec<RowKind>,
    pub sources: Vec<SourceFn>,
    pub diodes: Vec<DiodeRow>,
    pub unknowns: Vec<Unknown>,
    pub num_pressures: usize,
}

impl fmt::Debug for AssembledSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssembledSystem")
            .field("size", &self.size())
            .field("num_pressures", &self.num_pressures)
            .field("rows", &self.rows)
            .field("sources", &self.sources.len())
            .field("diodes", &self.diodes)
            .finish_non_exhaustive()
    }
}

impl AssembledSystem {
    /// Number of unknowns (and rows).
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn num_flows(&self) -> usize {
        self.size() - self.num_pressures
    }

    /// `Source(t)`, one entry per row.
    pub fn source_vector(&self, t: f64) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| match *row {
                RowKind::PressureSource { source } | RowKind::FlowSource { source } => {
                    (self.sources[source])(t)
                }
                _ => 0.0,
            })
            .collect()
    }

    /// Rewrite every diode row for its current state.
    pub fn write_diode_rows(&mut self) {
        for diode in &self.diodes {
            diode.write_row(&mut self.m0);
        }
    }
}

/// Build `M0`, `M1`, the source table and the diode table.
///
/// The graph and paths must already have passed the structural check; a row
/// count that differs from the unknown count is an internal error.
pub fn assemble(
    schematic: &Schematic,
    graph: &CircuitGraph,
    paths: &[Path],
    evaluator: &dyn SourceEvaluator,
) -> Result<AssembledSystem> {
    let pressures = graph.compaction_map();
    let num_pressures = graph.num_pressures();
    let size = num_pressures + paths.len();
    let kcl = kcl_nodes(graph, paths);
    let num_rows: usize = paths.iter().map(Path::len).sum::<usize>() + kcl.len();
    if num_rows != size {
        return Err(LumpedError::internal(format!(
            "assembled {} rows for {} unknowns",
            num_rows, size
        )));
    }

    let mut m0 = DenseMatrix::zeros(size);
    let mut m1 = DenseMatrix::zeros(size);
    let mut rows = Vec::with_capacity(size);
    let mut sources: Vec<SourceFn> = Vec::new();
    let mut diodes = Vec::new();

    for (j, path) in paths.iter().enumerate() {
        let q = num_pressures + j;
        let mut current = path.start;
        for &e in &path.edges {
            let edge = graph.edge(e);
            let element = schematic.element(edge.element);
            let row = rows.len();
            let downstream = edge.other_end(current);
            let p0 = pressures[current];
            let p1 = pressures[downstream];

            let kind = match element.kind {
                ElementKind::Resistor => {
                    m0.add_opt(row, p0, 1.0);
                    m0.add_opt(row, p1, -1.0);
                    m0.add(row, q, -element.value);
                    RowKind::Resistor
                }
                ElementKind::Capacitor => {
                    m0.add(row, q, -1.0);
                    m1.add_opt(row, p0, element.value);
                    m1.add_opt(row, p1, -element.value);
                    RowKind::Capacitor
                }
                ElementKind::Inductor => {
                    m0.add_opt(row, p0, 1.0);
                    m0.add_opt(row, p1, -1.0);
                    m1.add(row, q, -element.value);
                    RowKind::Inductor
                }
                ElementKind::Ground => {
                    m0.add_opt(row, pressures[edge.start], 1.0);
                    RowKind::Ground
                }
                ElementKind::PressureSource => {
                    m0.add_opt(row, pressures[edge.start], 1.0);
                    sources.push(evaluator.evaluate(&element.source_value())?);
                    RowKind::PressureSource {
                        source: sources.len() - 1,
                    }
                }
                ElementKind::FlowSource => {
                    m0.add(row, q, edge.direction_from(current));
                    sources.push(evaluator.evaluate(&element.source_value())?);
                    RowKind::FlowSource {
                        source: sources.len() - 1,
                    }
                }
                ElementKind::Diode => {
                    let diode = DiodeRow {
                        element: element.id,
                        name: element.name.clone(),
                        row,
                        p0,
                        p1,
                        q,
                        forward_sign: edge.direction_from(current),
                        open: true,
                    };
                    diode.write_row(&mut m0);
                    diodes.push(diode);
                    RowKind::Diode {
                        slot: diodes.len() - 1,
                    }
                }
                ElementKind::Wire => {
                    return Err(LumpedError::internal(format!(
                        "wire '{}' survived graph reduction",
                        element.name
                    )));
                }
            };
            rows.push(kind);
            current = downstream;
        }
    }

    for node in kcl {
        let row = rows.len();
        for (j, path) in paths.iter().enumerate() {
            if path.start == node {
                m0.add(row, num_pressures + j, 1.0);
            }
            if path.end == node {
                m0.add(row, num_pressures + j, -1.0);
            }
        }
        rows.push(RowKind::BranchKcl);
    }

    let unknowns = name_unknowns(schematic, graph, paths);

    tracing::debug!(
        unknowns = size,
        pressures = num_pressures,
        flows = paths.len(),
        sources = sources.len(),
        diodes = diodes.len(),
        "assembled system"
    );

    Ok(AssembledSystem {
        m0,
        m1,
        rows,
        sources,
        diodes,
        unknowns,
        num_pressures,
    })
}

/// `P<i>`/`Q<j>` unless a listener supplies the name.
fn name_unknowns(schematic: &Schematic, graph: &CircuitGraph, paths: &[Path]) -> Vec<Unknown> {
    let pressures = graph
        .nodes
        .iter()
        .filter(|node| !node.is_reference())
        .enumerate()
        .map(|(i, node)| match &node.listener {
            Some(name) => Unknown {
                name: name.clone(),
                listened: true,
            },
            None => Unknown {
                name: format!("P{}", i),
                listened: false,
            },
        });

    let flows = paths.iter().enumerate().map(|(j, path)| {
        let listener = path
            .edges
            .iter()
            .find_map(|&e| schematic.element(graph.edge(e).element).flow_listener.clone());
        match listener {
            Some(name) => Unknown {
                name,
                listened: true,
            },
            None => Unknown {
                name: format!("Q{}", j),
                listened: false,
            },
        }
    });

    pressures.chain(flows).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{max_non_branching_paths, ElementKind::*};
    use crate::expr::Calculator;
    use approx::assert_relative_eq;

    fn build(s: &Schematic) -> AssembledSystem {
        let graph = CircuitGraph::from_schematic(s).unwrap();
        let paths = max_non_branching_paths(&graph).unwrap();
        assemble(s, &graph, &paths, &Calculator).unwrap()
    }

    fn divider() -> Schematic {
        let mut s = Schematic::new();
        s.add_element(PressureSource, "P", (0.0, 0.0), (0.0, -1.0), 10.0);
        s.add_element(Wire, "", (0.0, 0.0), (1.0, 0.0), 0.0);
        s.add_element(Resistor, "R1", (1.0, 0.0), (2.0, 0.0), 25.0);
        s.add_element(Resistor, "R2", (2.0, 0.0), (3.0, 0.0), 10.0);
        s.add_element(Ground, "G", (3.0, 0.0), (3.0, 1.0), 0.0);
        s
    }

    #[test]
    fn test_divider_rows() {
        let sys = build(&divider());
        assert_eq!(sys.size(), 4);
        assert_eq!(sys.num_pressures, 3);
        assert_eq!(
            sys.rows,
            vec![
                RowKind::PressureSource { source: 0 },
                RowKind::Resistor,
                RowKind::Resistor,
                RowKind::Ground,
            ]
        );
        assert_eq!(sys.m0.row(0), &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(sys.m0.row(1), &[1.0, -1.0, 0.0, -25.0]);
        assert_eq!(sys.m0.row(2), &[0.0, 1.0, -1.0, -10.0]);
        assert_eq!(sys.m0.row(3), &[0.0, 0.0, 1.0, 0.0]);
        assert_eq!(sys.m1.max_abs(), 0.0);
        assert_eq!(sys.source_vector(0.0), vec![10.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_divider_steady_state() {
        let sys = build(&divider());
        let x = sys.m0.factor(0.0).unwrap().solve(&sys.source_vector(0.0));
        let q = 10.0 / 35.0;
        assert_relative_eq!(x[3], q, epsilon = 1e-12);
        assert_relative_eq!(x[1], q * 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_capacitor_goes_to_m1() {
        let mut s = divider();
        s.elements[3].kind = Capacitor;
        s.elements[3].value = 2.0;
        let sys = build(&s);
        assert_eq!(sys.rows[2], RowKind::Capacitor);
        assert_eq!(sys.m0.row(2), &[0.0, 0.0, 0.0, -1.0]);
        assert_eq!(sys.m1.row(2), &[0.0, 2.0, -2.0, 0.0]);
    }

    #[test]
    fn test_branch_rows_follow_edge_rows() {
        // Source feeding two resistors in parallel to ground
        let mut s = Schematic::new();
        s.add_element(PressureSource, "P", (0.0, 0.0), (0.0, -1.0), 1.0);
        s.add_element(Resistor, "Ra", (0.0, 0.0), (1.0, 0.0), 1.0);
        s.add_element(Resistor, "Rb", (0.0, 0.0), (1.0, 0.0), 2.0);
        s.add_element(Ground, "G", (1.0, 0.0), (1.0, 1.0), 0.0);
        let sys = build(&s);

        let kcl: Vec<_> = sys
            .rows
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == RowKind::BranchKcl)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(kcl, vec![4, 5]);
        assert_eq!(sys.size(), 6);
    }

    #[test]
    fn test_flow_source_sign_follows_traversal() {
        let mut s = Schematic::new();
        s.add_element(FlowSource, "Q", (1.0, 0.0), (0.0, 0.0), 2.0);
        s.add_element(Resistor, "R", (1.0, 0.0), (0.0, 0.0), 3.0);
        s.add_element(Ground, "G", (0.0, 0.0), (0.0, -1.0), 0.0);
        let sys = build(&s);
        let x = sys.m0.factor(0.0).unwrap().solve(&sys.source_vector(0.0));

        // Forward flow through the source equals its value
        let source_row = sys
            .rows
            .iter()
            .position(|r| matches!(r, RowKind::FlowSource { .. }))
            .unwrap();
        let q_col = (0..sys.size())
            .find(|&c| sys.m0.get(source_row, c) != 0.0)
            .unwrap();
        assert_relative_eq!(
            sys.m0.get(source_row, q_col) * x[q_col],
            2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_expression_source_is_resolved() {
        let mut s = divider();
        s.set_expression(crate::circuit::ElementId(0), "2*t");
        let sys = build(&s);
        assert_eq!(sys.source_vector(1.5)[0], 3.0);
    }

    #[test]
    fn test_bad_expression_aborts_assembly() {
        let mut s = divider();
        s.set_expression(crate::circuit::ElementId(0), "2 + (t");
        let graph = CircuitGraph::from_schematic(&s).unwrap();
        let paths = max_non_branching_paths(&graph).unwrap();
        let err = assemble(&s, &graph, &paths, &Calculator).unwrap_err();
        assert!(err.is_expression_error());
    }

    #[test]
    fn test_listeners_name_unknowns() {
        let mut s = divider();
        s.listen_pressure((2.0, 0.0), "mid");
        s.listen_flow(crate::circuit::ElementId(2), "flow");
        let sys = build(&s);
        let names: Vec<_> = sys.unknowns.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["P0", "mid", "P2", "flow"]);
        assert!(sys.unknowns[1].listened);
        assert!(!sys.unknowns[0].listened);
    }
}
