//! Membrane elasticity: a Hookean spring along every polygon edge, with
//! a stiffer/longer-rest apical-basal variant.

use super::{CellPopulation, ForceModule};
use crate::errors::*;
use crate::geometry::vector_from;
use crate::mesh::Mesh;
use crate::node::Region;
use crate::{Float, Index};
use serde::{Deserialize, Serialize};

/// Persisted state for [`MembraneForce`]: spring constant and rest
/// length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MembraneArchive {
    pub spring_constant: Float,
    pub rest_length: Float,
}

/// Hookean spring along every edge of every element (including the
/// membrane polyline). On its first call it classifies every non-membrane
/// element's nodes into basal/apical/lateral regions; all later calls
/// only compute forces.
pub struct MembraneForce {
    spring_constant: Float,
    rest_length: Float,
    classified: bool,
}

impl MembraneForce {
    pub fn new(spring_constant: Float, rest_length: Float) -> MembraneForce {
        MembraneForce {
            spring_constant,
            rest_length,
            classified: false,
        }
    }

    pub fn from_archive(archive: MembraneArchive) -> MembraneForce {
        MembraneForce::new(archive.spring_constant, archive.rest_length)
    }

    pub fn to_archive(&self) -> MembraneArchive {
        MembraneArchive {
            spring_constant: self.spring_constant,
            rest_length: self.rest_length,
        }
    }

    /// Classifies the nodes of every non-membrane element into
    /// `{Basal, Apical, Lateral}`: the basal-node
    /// count is `floor(0.5 * N / (1 + aspect))`; that many bottom-most
    /// nodes by `y` become basal, the same number of top-most nodes
    /// become apical, and everything else is lateral. The membrane
    /// element's nodes are all lateral.
    fn classify_regions(&self, mesh: &mut Mesh) {
        let element_indices: Vec<Index> = (0..mesh.elements().len()).collect();

        for elem in element_indices {
            if Some(elem) == mesh.membrane_element() {
                let node_ids = mesh.element(elem).nodes.clone();
                for id in node_ids {
                    mesh.node_mut(id).region = Some(Region::Lateral);
                }
                continue;
            }

            let aspect = mesh.elongation_shape_factor(elem);
            let node_ids = mesh.element(elem).nodes.clone();
            let n = node_ids.len();
            let basal_count = (0.5 * n as Float / (1.0 + aspect)).floor() as usize;
            let basal_count = basal_count.min(n / 2);

            let mut order: Vec<Index> = node_ids.clone();
            order.sort_by(|&a, &b| {
                mesh.node(a)
                    .location
                    .y
                    .partial_cmp(&mesh.node(b).location.y)
                    .unwrap()
            });

            for (rank, &id) in order.iter().enumerate() {
                let region = if rank < basal_count {
                    Region::Basal
                } else if rank >= n - basal_count {
                    Region::Apical
                } else {
                    Region::Lateral
                };
                mesh.node_mut(id).region = Some(region);
            }
        }
    }

    fn is_apical_or_basal(region: Option<Region>) -> bool {
        matches!(region, Some(Region::Apical) | Some(Region::Basal))
    }
}

impl ForceModule for MembraneForce {
    fn add_force_contribution(
        &mut self,
        mesh: &mut Mesh,
        _pairs: &[(Index, Index)],
        _population: &CellPopulation,
    ) -> Result<()> {
        if !self.classified {
            self.classify_regions(mesh);
            self.classified = true;
        }

        let element_indices: Vec<Index> = (0..mesh.elements().len()).collect();

        for elem in element_indices {
            let (node_ids, is_membrane) = {
                let e = mesh.element(elem);
                (e.nodes.clone(), e.is_membrane)
            };
            let n = node_ids.len();
            if n < 2 {
                continue;
            }
            let edge_count = if is_membrane { n - 1 } else { n };
            if edge_count == 0 {
                continue;
            }

            // `edges()` closes the ring unconditionally (spec: traversal
            // order defines positive orientation for closed elements); for
            // the open membrane polyline we take only the first `n - 1`
            // pairs, dropping the wrap-around edge it doesn't have.
            let edge_pairs: Vec<(Index, Index)> =
                mesh.element(elem).edges().take(edge_count).collect();

            // F[i]: the spring-edge vector for the edge connecting
            // node_ids[i] ("this") to node_ids[i + 1] ("next").
            let mut edge_force = Vec::with_capacity(edge_count);
            for &(this_id, next_id) in &edge_pairs {
                let this_loc = mesh.node(this_id).location;
                let next_loc = mesh.node(next_id).location;

                let stiffened = Self::is_apical_or_basal(mesh.node(this_id).region)
                    || Self::is_apical_or_basal(mesh.node(next_id).region);
                let k = if stiffened {
                    10.0 * self.spring_constant
                } else {
                    self.spring_constant
                };
                let l = if stiffened {
                    4.0 * self.rest_length
                } else {
                    self.rest_length
                };

                let d = vector_from(next_loc, this_loc);
                let len = d.norm();
                let dhat = if len > 1e-15 {
                    d.scale(1.0 / len)
                } else {
                    d
                };
                edge_force.push(dhat.scale(k * (len - l)));
            }

            for i in 0..n {
                let prev_edge = if is_membrane {
                    if i == 0 {
                        None
                    } else {
                        Some(i - 1)
                    }
                } else {
                    Some((i + edge_count - 1) % edge_count)
                };
                let this_edge = if is_membrane {
                    if i >= edge_count {
                        None
                    } else {
                        Some(i)
                    }
                } else {
                    Some(i % edge_count)
                };

                let mut net = crate::geometry::Point::zero();
                if let Some(p) = prev_edge {
                    net = net.add(&edge_force[p]);
                }
                if let Some(c) = this_edge {
                    net = net.sub(&edge_force[c]);
                }
                mesh.node_mut(node_ids[i]).add_force(net);
            }
        }

        Ok(())
    }

    fn parameters_dump(&self) -> Vec<(&'static str, Float)> {
        vec![
            ("SpringConstant", self.spring_constant),
            ("RestLength", self.rest_length),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::geometry::Point;
    use crate::node::Node;

    fn square_mesh(half: Float) -> Mesh {
        let corners = [(-half, -half), (half, -half), (half, half), (-half, half)];
        let nodes: Vec<Node> = corners
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Node::new(i, Point::new(0.5 + x, 0.5 + y)))
            .collect();
        let elem = Element::new(0, vec![0, 1, 2, 3]);
        Mesh::new(nodes, vec![elem], None, 32, 32).unwrap()
    }

    #[test]
    fn stretched_square_contracts_inward() {
        let mut mesh = square_mesh(0.2);
        let mut force = MembraneForce::new(1.0, 0.2);
        let population = CellPopulation {
            interaction_distance: 0.1,
            intrinsic_spacing: 0.01,
        };
        force.add_force_contribution(&mut mesh, &[], &population).unwrap();

        // Node 0 sits at the bottom-left corner; a stretched square (edge
        // length > rest length) should pull it toward the centroid, i.e.
        // its applied force should have a positive x and y component.
        let f = mesh.node(0).applied_force;
        assert!(f.x > 0.0, "fx = {}", f.x);
        assert!(f.y > 0.0, "fy = {}", f.y);
    }

    #[test]
    fn relaxed_square_has_zero_force() {
        let side = 0.2;
        let rest = side; // rest length equals edge length: no spring force
        let mut mesh = square_mesh(side / 2.0);
        let mut force = MembraneForce::new(1.0, rest);
        let population = CellPopulation {
            interaction_distance: 0.1,
            intrinsic_spacing: 0.01,
        };
        force.add_force_contribution(&mut mesh, &[], &population).unwrap();
        for n in mesh.nodes() {
            assert!(n.applied_force.norm() < 1e-10, "f = {:?}", n.applied_force);
        }
    }

    #[test]
    fn classification_marks_top_and_bottom_nodes() {
        let n = 64;
        let nodes: Vec<Node> = (0..n)
            .map(|i| {
                let t = std::f64::consts::TAU * i as f64 / n as f64;
                Node::new(i, Point::new(0.5 + 0.3 * t.cos(), 0.5 + 0.15 * t.sin()))
            })
            .collect();
        let elem = Element::new(0, (0..n).collect());
        let mut mesh = Mesh::new(nodes, vec![elem], None, 32, 32).unwrap();
        let mut force = MembraneForce::new(1.0, 0.01);
        let population = CellPopulation {
            interaction_distance: 0.1,
            intrinsic_spacing: 0.01,
        };
        force.add_force_contribution(&mut mesh, &[], &population).unwrap();

        let has_basal = mesh.nodes().iter().any(|n| n.region == Some(Region::Basal));
        let has_apical = mesh.nodes().iter().any(|n| n.region == Some(Region::Apical));
        let has_lateral = mesh.nodes().iter().any(|n| n.region == Some(Region::Lateral));
        assert!(has_basal && has_apical && has_lateral);
    }
}
