//! Core simulation loop: orchestrates, in a fixed per-step order,
//! neighbour refresh, force computation, spreading, the spectral fluid
//! solve, interpolation and advection. Exposes exactly the two driver
//! entry points a caller needs: one-time setup and a per-step advance.

use crate::errors::*;
use crate::forces::{CellPopulation, ForceModule};
use crate::mesh::Mesh;
use crate::neighbour::NeighbourSearch;
use crate::settings::Settings;
use crate::solver::Solver;
use crate::spreading;
use crate::Float;

/// Assembles the mesh, the registered force modules, the spectral
/// solver and the neighbour-search box collection into a single owned
/// set of collaborators driven one time step at a time.
pub struct Simulation {
    mesh: Mesh,
    solver: Solver,
    neighbour_search: NeighbourSearch,
    forces: Vec<Box<dyn ForceModule>>,
    population: CellPopulation,
    dt: Float,
    re: Float,
    neighbour_update_frequency: usize,
    /// Step counter advanced only by the `Iterator` convenience wrapper;
    /// the named driver entry point takes its own `step_index` argument
    /// and never reads or writes this field.
    iter_step: usize,
}

impl Simulation {
    /// Builds a simulation from an already-constructed mesh, settings,
    /// and registered force modules. Configures a process-global rayon
    /// thread pool from `settings.grid.fft_threads` before doing
    /// anything else; a pool can only be built once per process, so a
    /// second `Simulation` in the same process (as in tests) simply
    /// keeps the first pool rather than erroring.
    pub fn new(
        mut mesh: Mesh,
        settings: &Settings,
        forces: Vec<Box<dyn ForceModule>>,
    ) -> Result<Simulation> {
        crate::settings::check_settings(settings)?;

        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.grid.fft_threads)
            .build_global();

        if let Some(spacing) = settings.population.element_division_spacing {
            mesh.set_element_division_spacing(spacing)?;
        }

        let solver = Solver::new(mesh.nx(), mesh.ny());
        let neighbour_search = NeighbourSearch::new(settings.population.interaction_distance);
        let population = CellPopulation {
            interaction_distance: settings.population.interaction_distance,
            intrinsic_spacing: settings.population.intrinsic_spacing,
        };

        Ok(Simulation {
            mesh,
            solver,
            neighbour_search,
            forces,
            population,
            dt: settings.grid.dt,
            re: settings.grid.re,
            neighbour_update_frequency: settings.grid.node_neighbour_update_frequency,
            iter_step: 0,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn forces(&self) -> &[Box<dyn ForceModule>] {
        &self.forces
    }

    /// One-time setup the driver must call before the first time step:
    /// establishes the initial neighbour-pair list so the first
    /// `update_at_end_of_time_step` call has candidate pairs to work
    /// with.
    pub fn setup_solve(&mut self) -> Result<()> {
        self.neighbour_search.refresh(&self.mesh);
        Ok(())
    }

    /// Advances the simulation by one step of size `dt`, in this exact
    /// order:
    /// 1. refresh neighbour pairs on cadence boundaries;
    /// 2. zero node forces and the grid force arrays;
    /// 3. invoke every registered force module;
    /// 4. refresh the characteristic/per-element node spacing against the
    ///    nodes' current (post-force, pre-advect) locations, so spreading
    ///    and the next call's cell-cell scaling track the deforming mesh
    ///    rather than a stale construction-time snapshot;
    /// 5. spread node forces onto the grid;
    /// 6. advance the fluid in place;
    /// 7. interpolate new node velocities;
    /// 8. advect every node and reduce into `[0, 1)^2`.
    pub fn update_at_end_of_time_step(&mut self, dt: Float, step_index: usize) -> Result<()> {
        if step_index % self.neighbour_update_frequency == 0 {
            self.neighbour_search.refresh(&self.mesh);
        }

        for node in self.mesh.nodes_mut() {
            node.clear_force();
        }
        self.mesh.clear_force_grids();

        let pairs: Vec<_> = self.neighbour_search.pairs().to_vec();
        for module in self.forces.iter_mut() {
            module.update_protein_levels(&mut self.mesh);
            module.add_force_contribution(&mut self.mesh, &pairs, &self.population)?;
        }

        self.mesh.recompute_mean_node_spacing();
        spreading::spread(&mut self.mesh);
        self.solver.step(&mut self.mesh, dt, self.re)?;

        let velocities = spreading::interpolate(&self.mesh);
        for (node, v) in self.mesh.nodes_mut().iter_mut().zip(velocities) {
            node.advect(v, dt);
        }

        Ok(())
    }
}

/// Drives the simulation one step at a time, yielding the new step
/// index, as a thin convenience wrapper around
/// `update_at_end_of_time_step`. This is not a replacement for the two
/// named driver entry points above: it uses the configured `dt` and
/// stops (returns `None`) the first time a step errors.
impl Iterator for Simulation {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let step = self.iter_step;
        let dt = self.dt;
        self.update_at_end_of_time_step(dt, step).ok()?;
        self.iter_step += 1;
        Some(step)
    }
}
