//! Uniform box-grid candidate-pair search over the periodic torus (spec
//! section 4.6). Box side length equals the interaction radius, so any
//! pair of nodes closer than the radius fall in the same or an adjacent
//! box; scanning each box against itself plus a "half" selection of
//! neighbouring boxes visits every close pair exactly once.

use crate::geometry::distance;
use crate::mesh::Mesh;
use crate::Index;
use std::collections::BTreeSet;

/// The half-stencil of box offsets scanned from each box, chosen so
/// that every unordered pair of distinct boxes within range is visited
/// from exactly one of the two boxes.
const HALF_STENCIL: [(i64, i64); 4] = [(1, 0), (1, 1), (0, 1), (-1, 1)];

pub struct NeighbourSearch {
    radius: f64,
    boxes_x: usize,
    boxes_y: usize,
    pairs: Vec<(Index, Index)>,
    neighbours: Vec<BTreeSet<Index>>,
}

impl NeighbourSearch {
    pub fn new(radius: f64) -> NeighbourSearch {
        let boxes = (1.0 / radius).floor().max(1.0) as usize;
        NeighbourSearch {
            radius,
            boxes_x: boxes,
            boxes_y: boxes,
            pairs: Vec::new(),
            neighbours: Vec::new(),
        }
    }

    pub fn pairs(&self) -> &[(Index, Index)] {
        &self.pairs
    }

    pub fn neighbours_of(&self, node: Index) -> &BTreeSet<Index> {
        static EMPTY: std::sync::OnceLock<BTreeSet<Index>> = std::sync::OnceLock::new();
        self.neighbours
            .get(node)
            .unwrap_or_else(|| EMPTY.get_or_init(BTreeSet::new))
    }

    /// Rebuilds the candidate pair list from the current node locations.
    pub fn refresh(&mut self, mesh: &Mesh) {
        let n = mesh.nodes().len();
        let mut boxes: Vec<Vec<Index>> = vec![Vec::new(); self.boxes_x * self.boxes_y];

        let box_of = |x: f64, y: f64| -> (usize, usize) {
            let bx = ((x * self.boxes_x as f64) as usize).min(self.boxes_x - 1);
            let by = ((y * self.boxes_y as f64) as usize).min(self.boxes_y - 1);
            (bx, by)
        };

        let mut node_box = vec![(0usize, 0usize); n];
        for node in mesh.nodes() {
            let (bx, by) = box_of(node.location.x, node.location.y);
            node_box[node.index] = (bx, by);
            boxes[by * self.boxes_x + bx].push(node.index);
        }

        self.pairs.clear();
        self.neighbours = vec![BTreeSet::new(); n];

        for by in 0..self.boxes_y {
            for bx in 0..self.boxes_x {
                let here = &boxes[by * self.boxes_x + bx];

                for i in 0..here.len() {
                    for j in (i + 1)..here.len() {
                        self.consider_pair(mesh, here[i], here[j]);
                    }
                }

                for &(dx, dy) in &HALF_STENCIL {
                    let ox = wrap_offset(bx as i64 + dx, self.boxes_x);
                    let oy = wrap_offset(by as i64 + dy, self.boxes_y);
                    if ox == bx && oy == by {
                        continue;
                    }
                    let other = &boxes[oy * self.boxes_x + ox];
                    for &a in here {
                        for &b in other {
                            self.consider_pair(mesh, a, b);
                        }
                    }
                }
            }
        }
    }

    fn consider_pair(&mut self, mesh: &Mesh, a: Index, b: Index) {
        if a == b {
            return;
        }
        let d = distance(mesh.node(a).location, mesh.node(b).location);
        if d <= self.radius {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            self.pairs.push((lo, hi));
            self.neighbours[lo].insert(hi);
            self.neighbours[hi].insert(lo);
        }
    }
}

fn wrap_offset(i: i64, n: usize) -> usize {
    (((i % n as i64) + n as i64) % n as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::geometry::Point;
    use crate::node::Node;

    #[test]
    fn finds_nearby_pair_across_periodic_boundary() {
        let nodes = vec![
            Node::new(0, Point::new(0.01, 0.5)),
            Node::new(1, Point::new(0.99, 0.5)),
            Node::new(2, Point::new(0.5, 0.5)),
        ];
        let elem = Element::new(0, vec![0, 1, 2]);
        let mesh = Mesh::new(nodes, vec![elem], None, 32, 32).unwrap();

        let mut search = NeighbourSearch::new(0.05);
        search.refresh(&mesh);

        assert!(search.pairs().contains(&(0, 1)));
        assert!(!search.pairs().contains(&(0, 2)));
    }

    #[test]
    fn no_pair_reported_twice() {
        let nodes = vec![
            Node::new(0, Point::new(0.5, 0.5)),
            Node::new(1, Point::new(0.505, 0.5)),
        ];
        let elem = Element::new(0, vec![0, 1]);
        let mesh = Mesh::new(nodes, vec![elem], None, 32, 32).unwrap();

        let mut search = NeighbourSearch::new(0.1);
        search.refresh(&mesh);

        let count = search.pairs().iter().filter(|&&p| p == (0, 1)).count();
        assert_eq!(count, 1);
    }
}
