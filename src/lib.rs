//! Core of a two-dimensional Immersed Boundary simulator for deformable
//! cells suspended in an incompressible viscous fluid on a doubly-periodic
//! unit square.
//!
//! The crate couples a Lagrangian description of closed polygonal
//! elements ([`mesh`]) with an Eulerian spectral Navier-Stokes solver
//! ([`solver`]) through a regularised delta-function spreading kernel
//! ([`spreading`]). [`simulation`] orchestrates one time step; everything
//! else (archival, mesh file formats, the outer driver loop) is left to
//! collaborators outside this crate.

#[macro_use]
extern crate error_chain;

pub mod errors;
pub mod geometry;
pub mod node;
pub mod element;
pub mod mesh;
pub mod spreading;
pub mod solver;
pub mod neighbour;
pub mod forces;
pub mod settings;
pub mod simulation;

#[cfg(test)]
pub(crate) mod test_helper;

/// Floating point type used throughout the core. Kept as a type alias
/// so a single-precision build is a one-line change away even though no
/// `single` feature is wired up yet.
pub type Float = f64;

/// Index type for nodes, elements and fluid sources alike.
pub type Index = usize;

/// Sentinel meaning "no membrane element is registered".
pub const NO_MEMBRANE: Index = Index::MAX;
