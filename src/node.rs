//! Lagrangian vertices.

use crate::geometry::Point;
use crate::Index;
use std::collections::BTreeSet;

/// Coarse anatomical tag assigned to a node by the membrane elasticity
/// force. Stored on the node itself since several force modules and
/// geometry queries care about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Basal,
    Apical,
    Lateral,
}

/// A single Lagrangian vertex. Node locations are always kept reduced
/// into `[0, 1)^2`; wrap-around is applied explicitly at advection time.
#[derive(Debug, Clone)]
pub struct Node {
    pub index: Index,
    pub location: Point,
    /// Always true in this core; kept as a field because collaborators
    /// (mesh readers, future non-boundary node kinds) read it.
    pub is_boundary: bool,
    pub region: Option<Region>,
    pub applied_force: Point,
    /// Attribute vector used by the cell-cell force to store per-node
    /// "protein" quantities. Empty until a force module attaches to it.
    pub attributes: Vec<f64>,
    pub containing_elements: BTreeSet<Index>,
}

impl Node {
    pub fn new(index: Index, location: Point) -> Node {
        Node {
            index,
            location: location.reduce(),
            is_boundary: true,
            region: None,
            applied_force: Point::zero(),
            attributes: Vec::new(),
            containing_elements: BTreeSet::new(),
        }
    }

    pub fn clear_force(&mut self) {
        self.applied_force = Point::zero();
    }

    pub fn add_force(&mut self, f: Point) {
        self.applied_force = self.applied_force.add(&f);
    }

    /// Advects the node by `dt * velocity` and reduces the result back
    /// into `[0, 1)^2`.
    pub fn advect(&mut self, velocity: Point, dt: f64) {
        self.location = self.location.add(&velocity.scale(dt)).reduce();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reduces_location() {
        let n = Node::new(0, Point::new(1.3, -0.2));
        assert!((n.location.x - 0.3).abs() < 1e-12);
        assert!((n.location.y - 0.8).abs() < 1e-12);
    }

    #[test]
    fn advect_wraps_around() {
        let mut n = Node::new(0, Point::new(0.95, 0.5));
        n.advect(Point::new(1.0, 0.0), 0.2);
        assert!((n.location.x - 0.15).abs() < 1e-10, "{}", n.location.x);
    }
}
