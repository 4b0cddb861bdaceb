//! Closed (or, for the membrane element, open) polygons of nodes.

use crate::Index;
use std::collections::BTreeMap;

/// A closed ordered polygon over nodes (or, for the distinguished membrane
/// element, a non-closed basement-lamina polyline). Traversal order of
/// `nodes` defines positive orientation.
#[derive(Debug, Clone)]
pub struct Element {
    pub index: Index,
    pub nodes: Vec<Index>,
    pub membrane_spring_constant: f64,
    pub membrane_rest_length: f64,
    pub fluid_source: Option<Index>,
    /// Up to four corner-node markers used to track orientation across
    /// division; `None` entries are unused slots, not "corner at node 0".
    pub corner_nodes: [Option<Index>; 4],
    pub attributes: BTreeMap<String, f64>,
    pub is_membrane: bool,
    /// Cache for `average_node_spacing_of`; invalidated by passing
    /// `recompute = true` or by any topology change (division).
    pub(crate) cached_spacing: Option<f64>,
}

impl Element {
    pub fn new(index: Index, nodes: Vec<Index>) -> Element {
        Element {
            index,
            nodes,
            membrane_spring_constant: 0.,
            membrane_rest_length: 0.,
            fluid_source: None,
            corner_nodes: [None; 4],
            attributes: BTreeMap::new(),
            is_membrane: false,
            cached_spacing: None,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `(node_i, node_{i+1})` index pairs, wrapping around to the
    /// first node after the last (closed-ring edges). For the membrane
    /// element this still closes the ring; callers that must treat it as
    /// an open polyline drop the final wrap-around pair themselves (e.g.
    /// `forces::membrane::MembraneForce`, which takes only the first
    /// `n - 1` pairs for the membrane element).
    pub fn edges(&self) -> impl Iterator<Item = (Index, Index)> + '_ {
        let n = self.nodes.len();
        (0..n).map(move |i| (self.nodes[i], self.nodes[(i + 1) % n]))
    }
}
