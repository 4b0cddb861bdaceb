//! Pluggable Lagrangian force producers.
//!
//! Every force module implements [`ForceModule`]: a single mandatory
//! contribution method, plus two hooks (`update_protein_levels`,
//! `parameters_dump`) that default to a no-op / empty dump so modules
//! that don't need them stay trivial to write.

pub mod cell_cell;
pub mod membrane;

use crate::errors::*;
use crate::mesh::Mesh;
use crate::Index;

/// Population-level scalars shared by all force modules that reason
/// about pairs of cells rather than a single element.
#[derive(Debug, Clone, Copy)]
pub struct CellPopulation {
    /// Radius of the neighbour-search box and the force cutoff.
    pub interaction_distance: f64,
    /// The population's "intrinsic spacing" `s_0`, against which a
    /// pair's average node spacing is normalised.
    pub intrinsic_spacing: f64,
}

/// Capability implemented by every Lagrangian force producer.
pub trait ForceModule {
    /// Adds this module's contribution into every affected node's
    /// applied-force accumulator. `pairs` is the current neighbour-search
    /// candidate list; modules that don't need pairs (e.g. membrane
    /// elasticity) ignore it.
    fn add_force_contribution(
        &mut self,
        mesh: &mut Mesh,
        pairs: &[(Index, Index)],
        population: &CellPopulation,
    ) -> Result<()>;

    /// Per-step protein-level update hook. Default is a no-op; modules
    /// that track time-varying protein levels override it.
    fn update_protein_levels(&mut self, _mesh: &mut Mesh) {}

    /// Ordered `(name, value)` pairs a collaborator formats as XML/CSV/etc.
    /// Field order and naming are part of this module's contract.
    fn parameters_dump(&self) -> Vec<(&'static str, f64)>;
}
