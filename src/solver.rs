//! One time step of periodic 2-D Navier-Stokes with pressure projection
//! via 2-D FFT.
//!
//! The first-derivative symbol used throughout is `sin(2*pi*k/N)`, not
//! `i*k`; this corresponds to a staggered-difference operator and must
//! not be "cleaned up" to the spectrally-exact derivative, or the
//! pressure projection silently produces different velocities.

use crate::errors::*;
use crate::mesh::Mesh;
use ndarray::Array2;
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// Caches FFT plans across steps; rebuilding a `rustfft` plan on every
/// call is pure overhead once `Nx, Ny` are fixed for the solver's
/// lifetime.
pub struct Solver {
    nx: usize,
    ny: usize,
    forward_x: Arc<dyn Fft<f64>>,
    inverse_x: Arc<dyn Fft<f64>>,
    forward_y: Arc<dyn Fft<f64>>,
    inverse_y: Arc<dyn Fft<f64>>,
    sx: Vec<f64>,
    s2x: Vec<f64>,
    sy: Vec<f64>,
    s2y: Vec<f64>,
}

impl Solver {
    pub fn new(nx: usize, ny: usize) -> Solver {
        let mut planner = FftPlanner::new();
        let forward_x = planner.plan_fft_forward(nx);
        let inverse_x = planner.plan_fft_inverse(nx);
        let forward_y = planner.plan_fft_forward(ny);
        let inverse_y = planner.plan_fft_inverse(ny);

        let sx = (0..nx).map(|k| (PI * k as f64 / nx as f64).sin()).collect();
        let s2x = (0..nx)
            .map(|k| (2. * PI * k as f64 / nx as f64).sin())
            .collect();
        let sy = (0..ny).map(|k| (PI * k as f64 / ny as f64).sin()).collect();
        let s2y = (0..ny)
            .map(|k| (2. * PI * k as f64 / ny as f64).sin())
            .collect();

        Solver {
            nx,
            ny,
            forward_x,
            inverse_x,
            forward_y,
            inverse_y,
            sx,
            s2x,
            sy,
            s2y,
        }
    }

    /// Advances `mesh`'s velocity grids in place by one step of size
    /// `dt` at Reynolds number `re`.
    pub fn step(&self, mesh: &mut Mesh, dt: f64, re: f64) -> Result<()> {
        if mesh.nx() != self.nx || mesh.ny() != self.ny {
            bail!(ErrorKind::ConfigError(format!(
                "solver was built for ({}, {}) but mesh grid is ({}, {})",
                self.nx,
                self.ny,
                mesh.nx(),
                mesh.ny()
            )));
        }

        let dx = mesh.dx();
        let dy = mesh.dy();
        let nu = 1. / re;

        let (r_u, r_v) = {
            let (u, v) = mesh.velocity_grids();
            let (fx, fy) = mesh.force_grids();
            let a_u = upwind(u, v, dx, dy, true);
            let a_v = upwind(u, v, dx, dy, false);

            let r_u = Array2::from_shape_fn(u.dim(), |(y, x)| u[[y, x]] + dt * (fx[[y, x]] - a_u[[y, x]]));
            let r_v = Array2::from_shape_fn(v.dim(), |(y, x)| v[[y, x]] + dt * (fy[[y, x]] - a_v[[y, x]]));
            (r_u, r_v)
        };

        let mut ru_hat = self.fft2d_forward(&r_u);
        let mut rv_hat = self.fft2d_forward(&r_v);

        let gauge_modes = [
            (0, 0),
            (0, self.nx / 2),
            (self.ny / 2, 0),
            (self.ny / 2, self.nx / 2),
        ];

        let mut p_hat = Array2::<Complex64>::zeros((self.ny, self.nx));
        for ky in 0..self.ny {
            for kx in 0..self.nx {
                if gauge_modes.contains(&(ky, kx)) {
                    continue;
                }
                let s2x = self.s2x[kx];
                let s2y = self.sy_s2(ky);
                let denom = (dt / re) * ((s2x / dx).powi(2) + (s2y / dy).powi(2));
                if denom.abs() < 1e-300 {
                    bail!(ErrorKind::NumericError(format!(
                        "pressure denominator vanished at non-gauge mode ({}, {})",
                        ky, kx
                    )));
                }
                let numer = -Complex64::i()
                    * (s2x * ru_hat[[ky, kx]] / dx + s2y * rv_hat[[ky, kx]] / dy);
                p_hat[[ky, kx]] = numer / denom;
            }
        }

        for ky in 0..self.ny {
            for kx in 0..self.nx {
                let sx = self.sx[kx];
                let sy = self.sy[ky];
                let op = 1. + (4. * dt * nu) * ((sx / dx).powi(2) + (sy / dy).powi(2));
                let s2x = self.s2x[kx];
                let s2y = self.sy_s2(ky);

                let u_new = (ru_hat[[ky, kx]]
                    - (Complex64::i() * dt * nu / dx) * s2x * p_hat[[ky, kx]])
                    / op;
                let v_new = (rv_hat[[ky, kx]]
                    - (Complex64::i() * dt * nu / dy) * s2y * p_hat[[ky, kx]])
                    / op;
                ru_hat[[ky, kx]] = u_new;
                rv_hat[[ky, kx]] = v_new;
            }
        }

        let u_new = self.fft2d_inverse(&ru_hat);
        let v_new = self.fft2d_inverse(&rv_hat);

        let (u, v) = mesh.velocity_grids_mut();
        *u = u_new;
        *v = v_new;

        Ok(())
    }

    fn sy_s2(&self, ky: usize) -> f64 {
        self.s2y[ky]
    }

    fn fft2d_forward(&self, grid: &Array2<f64>) -> Array2<Complex64> {
        let (ny, nx) = grid.dim();
        let mut out = Array2::from_shape_fn((ny, nx), |(y, x)| Complex64::new(grid[[y, x]], 0.));

        out.axis_iter_mut(ndarray::Axis(0))
            .into_par_iter()
            .for_each(|mut row| {
                let mut buf: Vec<Complex64> = row.to_vec();
                self.forward_x.process(&mut buf);
                for (slot, v) in row.iter_mut().zip(buf.into_iter()) {
                    *slot = v;
                }
            });

        out.axis_iter_mut(ndarray::Axis(1))
            .into_par_iter()
            .for_each(|mut col| {
                let mut buf: Vec<Complex64> = col.to_vec();
                self.forward_y.process(&mut buf);
                for (slot, v) in col.iter_mut().zip(buf.into_iter()) {
                    *slot = v;
                }
            });

        out
    }

    fn fft2d_inverse(&self, spectrum: &Array2<Complex64>) -> Array2<f64> {
        let (ny, nx) = spectrum.dim();
        let mut out = spectrum.clone();

        out.axis_iter_mut(ndarray::Axis(1))
            .into_par_iter()
            .for_each(|mut col| {
                let mut buf: Vec<Complex64> = col.to_vec();
                self.inverse_y.process(&mut buf);
                for (slot, v) in col.iter_mut().zip(buf.into_iter()) {
                    *slot = v;
                }
            });

        out.axis_iter_mut(ndarray::Axis(0))
            .into_par_iter()
            .for_each(|mut row| {
                let mut buf: Vec<Complex64> = row.to_vec();
                self.inverse_x.process(&mut buf);
                for (slot, v) in row.iter_mut().zip(buf.into_iter()) {
                    *slot = v;
                }
            });

        let norm = 1.0 / (nx * ny) as f64;
        Array2::from_shape_fn((ny, nx), |(y, x)| out[[y, x]].re * norm)
    }
}

/// First-order upwind advection term, for `u` if `for_u` else `v`.
fn upwind(u: &Array2<f64>, v: &Array2<f64>, dx: f64, dy: f64, for_u: bool) -> Array2<f64> {
    let (ny, nx) = u.dim();
    let field = if for_u { u } else { v };

    Array2::from_shape_fn((ny, nx), |(y, x)| {
        let xm = (x + nx - 1) % nx;
        let xp = (x + 1) % nx;
        let ym = (y + ny - 1) % ny;
        let yp = (y + 1) % ny;

        let uu = u[[y, x]];
        let vv = v[[y, x]];
        let f = field[[y, x]];

        let dfdx = if uu > 0. {
            (f - field[[y, xm]]) / dx
        } else {
            (field[[y, xp]] - f) / dx
        };
        let dfdy = if vv > 0. {
            (f - field[[ym, x]]) / dy
        } else {
            (field[[yp, x]] - f) / dy
        };

        uu * dfdx + vv * dfdy
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::geometry::Point;
    use crate::node::Node;

    fn quiescent_mesh(n: usize) -> Mesh {
        let nodes = vec![Node::new(0, Point::new(0.5, 0.5))];
        let elem = Element::new(0, vec![0]);
        Mesh::new(nodes, vec![elem], Some(0), n, n).unwrap()
    }

    #[test]
    fn quiescent_fluid_stays_quiescent() {
        let mut mesh = quiescent_mesh(16);
        let solver = Solver::new(16, 16);
        solver.step(&mut mesh, 1e-4, 1e4).unwrap();
        let (u, v) = mesh.velocity_grids();
        for &val in u.iter().chain(v.iter()) {
            assert!(val.abs() < 1e-10, "val = {}", val);
        }
    }

    #[test]
    fn fft_round_trip_recovers_constant_field() {
        let solver = Solver::new(8, 8);
        let grid = Array2::from_elem((8, 8), 3.0);
        let spectrum = solver.fft2d_forward(&grid);
        let back = solver.fft2d_inverse(&spectrum);
        for &val in back.iter() {
            assert!((val - 3.0).abs() < 1e-10, "val = {}", val);
        }
    }
}
