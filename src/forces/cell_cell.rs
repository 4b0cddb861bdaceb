//! Cell-cell interaction: a linear spring or Morse potential between
//! nearby nodes of distinct elements, scaled by a node-local protein
//! multiplier and by the ratio of mesh-mean to local node spacing so
//! that spreading stays mass-conservative on non-uniform meshes (spec
//! section 4.3).

use super::{CellPopulation, ForceModule};
use crate::errors::*;
use crate::geometry::{distance, vector_from};
use crate::mesh::Mesh;
use crate::{Float, Index};
use serde::{Deserialize, Serialize};

const E_CADHERIN: usize = 0;
const P_CADHERIN: usize = 1;
const INTEGRIN: usize = 2;
const NUM_PROTEINS: usize = 3;

/// Which potential the interaction force uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpringVariant {
    Linear,
    Morse,
}

/// One subtlety in initial protein-level assignment: should the
/// membrane's own nodes carry the same baseline E-cadherin as ordinary
/// cell nodes, or none at all? `SameAsCell` (the default) gives every
/// node E-cadherin = 1 regardless of whether its element is the
/// membrane, preserving established scenario behaviour; `Zero` is the
/// alternative for callers who want membrane nodes to carry no
/// cadherin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembraneCadherinPolicy {
    SameAsCell,
    Zero,
}

impl Default for MembraneCadherinPolicy {
    fn default() -> Self {
        MembraneCadherinPolicy::SameAsCell
    }
}

/// Persisted state for [`CellCellForce`]; the archive carries the two
/// mutually-exclusive booleans `is_linear`/`is_morse`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CellCellArchive {
    pub spring_constant: Float,
    pub rest_length: Float,
    pub is_linear: bool,
    pub is_morse: bool,
}

pub struct CellCellForce {
    spring_constant: Float,
    variant: SpringVariant,
    membrane_cadherin_policy: MembraneCadherinPolicy,
    attached: bool,
    /// `0.25 * interaction_distance` as of the most recent call; kept
    /// only so `parameters_dump`/`to_archive` can report a concrete
    /// rest length without needing a `CellPopulation` of their own.
    last_rest_length: Float,
}

impl CellCellForce {
    pub fn new(spring_constant: Float, variant: SpringVariant) -> CellCellForce {
        CellCellForce {
            spring_constant,
            variant,
            membrane_cadherin_policy: MembraneCadherinPolicy::default(),
            attached: false,
            last_rest_length: 0.0,
        }
    }

    pub fn with_membrane_policy(mut self, policy: MembraneCadherinPolicy) -> Self {
        self.membrane_cadherin_policy = policy;
        self
    }

    pub fn from_archive(archive: CellCellArchive) -> Result<CellCellForce> {
        let variant = match (archive.is_linear, archive.is_morse) {
            (true, false) => SpringVariant::Linear,
            (false, true) => SpringVariant::Morse,
            _ => bail!(ErrorKind::ConfigError(
                "cell-cell archive must set exactly one of is_linear/is_morse".to_string()
            )),
        };
        let mut force = CellCellForce::new(archive.spring_constant, variant);
        force.last_rest_length = archive.rest_length;
        Ok(force)
    }

    pub fn to_archive(&self) -> CellCellArchive {
        CellCellArchive {
            spring_constant: self.spring_constant,
            rest_length: self.last_rest_length,
            is_linear: self.variant == SpringVariant::Linear,
            is_morse: self.variant == SpringVariant::Morse,
        }
    }

    /// Extends every node's attribute vector with the three protein
    /// slots and initialises them: non-membrane elements get
    /// `E-cadherin = 1`, everything else `0`; P-cadherin and integrin
    /// start at `0` everywhere.
    fn attach(&self, mesh: &mut Mesh) {
        let element_indices: Vec<Index> = (0..mesh.elements().len()).collect();
        for elem in element_indices {
            let is_membrane = Some(elem) == mesh.membrane_element();
            let e_cad = if is_membrane {
                match self.membrane_cadherin_policy {
                    MembraneCadherinPolicy::SameAsCell => 1.0,
                    MembraneCadherinPolicy::Zero => 0.0,
                }
            } else {
                1.0
            };
            let node_ids = mesh.element(elem).nodes.clone();
            for id in node_ids {
                mesh.node_mut(id).attributes = vec![e_cad, 0.0, 0.0];
            }
        }
    }

    /// The node's element, preferring a non-membrane element if the node
    /// belongs to more than one. Cell-cell interaction is only defined
    /// between cell (non-membrane) elements; a node with no non-membrane
    /// element (i.e. a pure membrane node) has nothing to report.
    fn non_membrane_element_of(mesh: &Mesh, node: Index) -> Option<Index> {
        mesh.node(node)
            .containing_elements
            .iter()
            .copied()
            .find(|&e| Some(e) != mesh.membrane_element())
    }
}

impl ForceModule for CellCellForce {
    fn add_force_contribution(
        &mut self,
        mesh: &mut Mesh,
        pairs: &[(Index, Index)],
        population: &CellPopulation,
    ) -> Result<()> {
        if !self.attached {
            self.attach(mesh);
            self.attached = true;
        }

        let r_int = population.interaction_distance;
        let w = 0.25 * r_int;
        let l = 0.25 * r_int;
        self.last_rest_length = l;

        for &(a, b) in pairs {
            let shares_element = !mesh
                .node(a)
                .containing_elements
                .is_disjoint(&mesh.node(b).containing_elements);
            if shares_element {
                continue;
            }

            let (elem_a, elem_b) = match (
                Self::non_membrane_element_of(mesh, a),
                Self::non_membrane_element_of(mesh, b),
            ) {
                (Some(ea), Some(eb)) => (ea, eb),
                _ => continue,
            };

            let r = distance(mesh.node(a).location, mesh.node(b).location);
            if r >= r_int || r < 1e-15 {
                continue;
            }

            let attrs_a = mesh.node(a).attributes.clone();
            let attrs_b = mesh.node(b).attributes.clone();
            if attrs_a.len() != NUM_PROTEINS || attrs_b.len() != NUM_PROTEINS {
                bail!(ErrorKind::AttributeMismatch(format!(
                    "expected {} attribute slots, got {}/{} for nodes {}/{}",
                    NUM_PROTEINS,
                    attrs_a.len(),
                    attrs_b.len(),
                    a,
                    b
                )));
            }

            let s_a = mesh.average_node_spacing_cached(elem_a);
            let s_b = mesh.average_node_spacing_cached(elem_b);
            let mean = mesh.characteristic_spacing();

            let k_eff = self.spring_constant * (s_a + s_b) / 2.0 / population.intrinsic_spacing;
            let p = attrs_a[E_CADHERIN].min(attrs_b[E_CADHERIN])
                + attrs_a[P_CADHERIN].min(attrs_b[P_CADHERIN])
                + attrs_a[INTEGRIN].max(attrs_b[INTEGRIN]);

            let magnitude = match self.variant {
                SpringVariant::Linear => k_eff * p * (r - l),
                SpringVariant::Morse => {
                    let e = ((l - r) / w).exp();
                    2.0 * w * k_eff * p * e * (1.0 - e)
                }
            };

            let rhat = vector_from(mesh.node(a).location, mesh.node(b).location).scale(1.0 / r);
            let force_a = rhat.scale(magnitude * mean / s_a);
            let force_b = rhat.scale(-magnitude * mean / s_b);

            mesh.node_mut(a).add_force(force_a);
            mesh.node_mut(b).add_force(force_b);
        }

        Ok(())
    }

    fn parameters_dump(&self) -> Vec<(&'static str, Float)> {
        vec![
            ("SpringConst", self.spring_constant),
            ("RestLength", self.last_rest_length),
            ("NumProteins", NUM_PROTEINS as Float),
            (
                "LinearSpring",
                if self.variant == SpringVariant::Linear {
                    1.0
                } else {
                    0.0
                },
            ),
            (
                "Morse",
                if self.variant == SpringVariant::Morse {
                    1.0
                } else {
                    0.0
                },
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::geometry::Point;
    use crate::node::Node;

    fn two_cell_mesh(dx: Float) -> Mesh {
        let nodes = vec![
            Node::new(0, Point::new(0.5, 0.5)),
            Node::new(1, Point::new(0.5 + dx, 0.5)),
            Node::new(2, Point::new(0.5 + dx, 0.55)),
            Node::new(3, Point::new(0.5, 0.55)),
            Node::new(4, Point::new(0.6, 0.5)),
            Node::new(5, Point::new(0.6 + dx, 0.5)),
            Node::new(6, Point::new(0.6 + dx, 0.55)),
            Node::new(7, Point::new(0.6, 0.55)),
        ];
        let elem_a = Element::new(0, vec![0, 1, 2, 3]);
        let elem_b = Element::new(1, vec![4, 5, 6, 7]);
        Mesh::new(nodes, vec![elem_a, elem_b], None, 32, 32).unwrap()
    }

    #[test]
    fn pairs_sharing_an_element_are_skipped() {
        let mut mesh = two_cell_mesh(0.01);
        let mut force = CellCellForce::new(1.0, SpringVariant::Linear);
        let population = CellPopulation {
            interaction_distance: 0.2,
            intrinsic_spacing: mesh.characteristic_spacing(),
        };
        force
            .add_force_contribution(&mut mesh, &[(0, 1), (0, 2)], &population)
            .unwrap();
        assert!(mesh.node(0).applied_force.norm() < 1e-12);
    }

    #[test]
    fn symmetric_pair_forces_cancel_when_spacing_matches() {
        let mut mesh = two_cell_mesh(0.01);
        let mut force = CellCellForce::new(2.0, SpringVariant::Linear);
        let population = CellPopulation {
            interaction_distance: 0.2,
            intrinsic_spacing: mesh.characteristic_spacing(),
        };
        force
            .add_force_contribution(&mut mesh, &[(0, 4)], &population)
            .unwrap();
        let fa = mesh.node(0).applied_force;
        let fb = mesh.node(4).applied_force;
        assert!((fa.x + fb.x).abs() < 1e-10, "{} {}", fa.x, fb.x);
        assert!((fa.y + fb.y).abs() < 1e-10, "{} {}", fa.y, fb.y);
    }

    #[test]
    fn archive_round_trips() {
        let force = CellCellForce::new(3.5, SpringVariant::Morse);
        let archive = force.to_archive();
        let restored = CellCellForce::from_archive(archive).unwrap();
        assert_eq!(restored.spring_constant, 3.5);
        assert_eq!(restored.variant, SpringVariant::Morse);
    }

    #[test]
    fn archive_rejects_both_variants_set() {
        let archive = CellCellArchive {
            spring_constant: 1.0,
            rest_length: 0.1,
            is_linear: true,
            is_morse: true,
        };
        assert!(CellCellForce::from_archive(archive).is_err());
    }
}
