//! Reduced network graph.
//!
//! Wires are zero-impedance, so every group of endpoints joined by wires or
//! by geometric coincidence is a single potential. The builder merges such
//! groups with a disjoint-set forest and emits one [`GraphNode`] per group and
//! one [`GraphEdge`] per non-wire element.

use std::collections::BTreeSet;

use petgraph::unionfind::UnionFind;

use super::types::{grid_key, ElementId, Schematic};
use crate::error::{LumpedError, Result};

/// Role of a reduced node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Ordinary junction, owns one pressure unknown
    Normal,
    /// Phantom reference potential behind a ground or pressure source
    SourceReference,
}

/// A node of the reduced graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub index: usize,
    pub kind: NodeKind,
    /// Incident edge indices; a self-loop appears twice
    pub edges: Vec<usize>,
    /// Listener name inherited from a listened endpoint
    pub listener: Option<String>,
}

impl GraphNode {
    fn new(index: usize) -> Self {
        Self {
            index,
            kind: NodeKind::Normal,
            edges: Vec::new(),
            listener: None,
        }
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }

    /// Nodes of degree other than 2 bound the non-branching paths.
    pub fn is_branch_point(&self) -> bool {
        self.degree() != 2
    }

    pub fn is_reference(&self) -> bool {
        self.kind == NodeKind::SourceReference
    }
}

/// A directed reference to one non-wire element.
///
/// `start` is the node of the element's terminal 0. The direction is only
/// bookkeeping: traversal treats the graph as undirected and uses
/// [`GraphEdge::direction_from`] to keep signs consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub element: ElementId,
}

impl GraphEdge {
    /// The node reached when crossing this edge from `node`.
    pub fn other_end(&self, node: usize) -> usize {
        if self.start == node {
            self.end
        } else {
            self.start
        }
    }

    /// +1 when crossing from `node` follows terminal 0 → terminal 1, else −1.
    pub fn direction_from(&self, node: usize) -> f64 {
        if self.start == node {
            1.0
        } else {
            -1.0
        }
    }
}

/// Reduced graph of a schematic.
#[derive(Debug, Clone)]
pub struct CircuitGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Element name behind each edge, for diagnostics
    pub labels: Vec<String>,
}

impl CircuitGraph {
    /// Collapse wires and coincident endpoints of a schematic.
    pub fn from_schematic(schematic: &Schematic) -> Result<Self> {
        let endpoints = &schematic.endpoints;
        let n = endpoints.len();
        let mut groups = UnionFind::<usize>::new(n);

        // Sort by position, then merge runs of coincident endpoints
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            grid_key(endpoints[a].position)
                .total_cmp(&grid_key(endpoints[b].position))
                .then(a.cmp(&b))
        });
        for pair in order.windows(2) {
            if grid_key(endpoints[pair[0]].position) == grid_key(endpoints[pair[1]].position) {
                groups.union(pair[0], pair[1]);
            }
        }

        for element in schematic.elements.iter().filter(|e| e.kind.is_wire()) {
            groups.union(element.endpoints[0].0, element.endpoints[1].0);
        }

        let mut terminated = vec![false; n];
        for element in schematic.elements.iter().filter(|e| !e.kind.is_wire()) {
            for ep in element.endpoints {
                terminated[groups.find(ep.0)] = true;
            }
        }

        let orphans: BTreeSet<(usize, &str)> = schematic
            .elements
            .iter()
            .filter(|e| e.kind.is_wire() && !terminated[groups.find(e.endpoints[0].0)])
            .map(|e| (e.id.0, e.name.as_str()))
            .collect();
        if !orphans.is_empty() {
            return Err(LumpedError::GraphReduction {
                wires: orphans.into_iter().map(|(_, name)| name.to_string()).collect(),
            });
        }

        let mut node_of_root: Vec<Option<usize>> = vec![None; n];
        let mut nodes: Vec<GraphNode> = Vec::new();
        for &ep in &order {
            let root = groups.find(ep);
            if !terminated[root] {
                continue;
            }
            let index = *node_of_root[root].get_or_insert_with(|| {
                nodes.push(GraphNode::new(nodes.len()));
                nodes.len() - 1
            });
            let node = &mut nodes[index];
            if node.listener.is_none() {
                node.listener = endpoints[ep].listener.clone();
            }
        }

        let mut edges = Vec::new();
        let mut labels = Vec::new();
        for element in schematic.elements.iter().filter(|e| !e.kind.is_wire()) {
            let [start, end] = element.endpoints.map(|ep| node_of_root[groups.find(ep.0)]);
            let (Some(start), Some(end)) = (start, end) else {
                return Err(LumpedError::internal(format!(
                    "element '{}' has a terminal outside every node",
                    element.name
                )));
            };

            if element.kind.has_reference_terminal() {
                nodes[end].kind = NodeKind::SourceReference;
            }

            let index = edges.len();
            edges.push(GraphEdge {
                index,
                start,
                end,
                element: element.id,
            });
            labels.push(element.name.clone());
            nodes[start].edges.push(index);
            nodes[end].edges.push(index);
        }

        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            "reduced network graph"
        );

        Ok(Self {
            nodes,
            edges,
            labels,
        })
    }

    /// Build a graph directly from node kinds and `(start, end, element)` triples.
    pub fn from_edges(kinds: &[NodeKind], edge_list: &[(usize, usize, ElementId)]) -> Self {
        let mut nodes: Vec<GraphNode> = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| GraphNode {
                kind,
                ..GraphNode::new(i)
            })
            .collect();
        let labels = edge_list.iter().map(|&(_, _, element)| element.to_string()).collect();
        let edges = edge_list
            .iter()
            .enumerate()
            .map(|(index, &(start, end, element))| {
                nodes[start].edges.push(index);
                nodes[end].edges.push(index);
                GraphEdge {
                    index,
                    start,
                    end,
                    element,
                }
            })
            .collect();
        Self {
            nodes,
            edges,
            labels,
        }
    }

    /// Number of pressure unknowns (non-reference nodes).
    pub fn num_pressures(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_reference()).count()
    }

    /// Stable map from node index to pressure unknown index.
    ///
    /// Reference nodes map to `None`; surviving nodes keep their relative order.
    pub fn compaction_map(&self) -> Vec<Option<usize>> {
        let mut next = 0;
        self.nodes
            .iter()
            .map(|node| {
                if node.is_reference() {
                    None
                } else {
                    next += 1;
                    Some(next - 1)
                }
            })
            .collect()
    }

    pub fn edge(&self, index: usize) -> &GraphEdge {
        &self.edges[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::ElementKind::*;

    /// Pressure source, R1, R2 and ground in series, joined by wires.
    fn divider() -> Schematic {
        let mut s = Schematic::new();
        s.add_element(PressureSource, "P", (0.0, 0.0), (0.0, -1.0), 10.0);
        s.add_element(Wire, "", (0.0, 0.0), (1.0, 0.0), 0.0);
        s.add_element(Resistor, "R1", (1.0, 0.0), (2.0, 0.0), 25.0);
        s.add_element(Resistor, "R2", (2.0, 0.0), (3.0, 0.0), 10.0);
        s.add_element(Wire, "", (3.0, 0.0), (4.0, 0.0), 0.0);
        s.add_element(Wire, "", (4.0, 0.0), (4.0, 1.0), 0.0);
        s.add_element(Ground, "G", (4.0, 1.0), (4.0, 2.0), 0.0);
        s
    }

    #[test]
    fn test_wires_collapse_to_single_nodes() {
        let graph = CircuitGraph::from_schematic(&divider()).unwrap();

        // P ref, P/R1 junction, R1/R2, R2/G junction, G ref
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.edges.len(), 4);
        assert_eq!(graph.num_pressures(), 3);

        let refs: Vec<_> = graph.nodes.iter().filter(|n| n.is_reference()).collect();
        assert_eq!(refs.len(), 2);
        for node in refs {
            assert_eq!(node.degree(), 1);
        }

        // R1 end and R2 start share a node
        assert_eq!(graph.edges[1].end, graph.edges[2].start);
        // The wire chain joins R2 and the ground
        assert_eq!(graph.edges[2].end, graph.edges[3].start);
    }

    #[test]
    fn test_every_element_yields_one_edge() {
        let s = divider();
        let graph = CircuitGraph::from_schematic(&s).unwrap();
        let non_wire = s.elements.iter().filter(|e| !e.kind.is_wire()).count();
        assert_eq!(graph.edges.len(), non_wire);
        for (i, node) in graph.nodes.iter().enumerate() {
            assert_eq!(node.index, i);
        }
    }

    #[test]
    fn test_distant_endpoints_stay_separate() {
        let mut s = Schematic::new();
        s.add_element(PressureSource, "P", (1e10, 0.0), (1e10, -1.0), 10.0);
        s.add_element(Resistor, "R", (1e10, 0.0), (2e10, 0.0), 10.0);
        s.add_element(Ground, "G", (2e10, 0.0), (2e10, 1.0), 0.0);
        let graph = CircuitGraph::from_schematic(&s).unwrap();

        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.num_pressures(), 2);
        assert_ne!(graph.edges[1].start, graph.edges[1].end);
        assert_eq!(graph.edges[0].start, graph.edges[1].start);
        assert_eq!(graph.edges[1].end, graph.edges[2].start);
    }

    #[test]
    fn test_wire_only_loop_is_reported() {
        let mut s = divider();
        s.add_element(Wire, "Wa", (10.0, 0.0), (11.0, 0.0), 0.0);
        s.add_element(Wire, "Wb", (11.0, 0.0), (11.0, 1.0), 0.0);
        s.add_element(Wire, "Wc", (11.0, 1.0), (10.0, 0.0), 0.0);

        match CircuitGraph::from_schematic(&s) {
            Err(LumpedError::GraphReduction { wires }) => {
                assert_eq!(wires, vec!["Wa", "Wb", "Wc"]);
            }
            other => panic!("expected graph reduction error, got {:?}", other),
        }
    }

    #[test]
    fn test_listener_is_inherited_through_wires() {
        let mut s = divider();
        assert!(s.listen_pressure((4.0, 0.0), "outlet"));
        let graph = CircuitGraph::from_schematic(&s).unwrap();
        let ground_edge = graph.edges[3];
        assert_eq!(graph.nodes[ground_edge.start].listener.as_deref(), Some("outlet"));
    }

    #[test]
    fn test_compaction_map_skips_references() {
        let graph = CircuitGraph::from_edges(
            &[NodeKind::SourceReference, NodeKind::Normal, NodeKind::SourceReference, NodeKind::Normal],
            &[(1, 0, ElementId(0)), (1, 3, ElementId(1)), (3, 2, ElementId(2))],
        );
        assert_eq!(graph.compaction_map(), vec![None, Some(0), None, Some(1)]);
        assert_eq!(graph.num_pressures(), 2);
    }

    #[test]
    fn test_edge_direction() {
        let edge = GraphEdge {
            index: 0,
            start: 3,
            end: 7,
            element: ElementId(0),
        };
        assert_eq!(edge.other_end(3), 7);
        assert_eq!(edge.other_end(7), 3);
        assert_eq!(edge.direction_from(3), 1.0);
        assert_eq!(edge.direction_from(7), -1.0);
    }
}
