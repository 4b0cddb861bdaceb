//! The regularised delta function coupling the Lagrangian mesh to the
//! Eulerian fluid grid: `spread` carries node forces onto the force
//! grids, `interpolate` carries grid velocities back onto the nodes.
//! Both use the same 4x4 stencil and the same kernel.

use crate::geometry::Point;
use crate::mesh::Mesh;

/// `phi(r, h) = (1 / (4h)) * (1 + cos(pi * r / (2h)))` for `|r| <= 2h`,
/// `0` otherwise.
fn phi(r: f64, h: f64) -> f64 {
    let d = r.abs();
    if d > 2. * h {
        0.
    } else {
        (1. + (std::f64::consts::PI * d / (2. * h)).cos()) / (4. * h)
    }
}

fn wrap(i: i64, n: usize) -> usize {
    (((i % n as i64) + n as i64) % n as i64) as usize
}

/// For location `p` and grid spacing `(dx, dy)`, the 16 `(grid_index,
/// weight)` pairs of the 4x4 stencil anchored at `(floor(x/dx) - 1,
/// floor(y/dy) - 1)`.
fn stencil(p: Point, dx: f64, dy: f64, nx: usize, ny: usize) -> Vec<(usize, usize, f64)> {
    let i0 = (p.x / dx).floor() as i64 - 1;
    let j0 = (p.y / dy).floor() as i64 - 1;

    let mut out = Vec::with_capacity(16);
    for b in 0..4 {
        let gy = j0 + b;
        let wy = phi(p.y - gy as f64 * dy, dy);
        if wy == 0. {
            continue;
        }
        for a in 0..4 {
            let gx = i0 + a;
            let wx = phi(p.x - gx as f64 * dx, dx);
            if wx == 0. {
                continue;
            }
            out.push((wrap(gx, nx), wrap(gy, ny), wx * wy));
        }
    }
    out
}

/// Spreads every node's applied force onto the force grids, weighted by
/// the mesh's characteristic node spacing `dl`, so that a force per
/// unit length becomes a force per unit area.
pub fn spread(mesh: &mut Mesh) {
    let dx = mesh.dx();
    let dy = mesh.dy();
    let nx = mesh.nx();
    let ny = mesh.ny();
    let dl = mesh.characteristic_spacing();

    let contributions: Vec<(usize, usize, Point)> = mesh
        .nodes()
        .iter()
        .filter(|n| n.applied_force.x != 0. || n.applied_force.y != 0.)
        .flat_map(|n| {
            let f = n.applied_force.scale(dl);
            stencil(n.location, dx, dy, nx, ny)
                .into_iter()
                .map(move |(gx, gy, w)| (gx, gy, f.scale(w)))
        })
        .collect();

    let (fx, fy) = mesh.force_grids_mut();
    for (gx, gy, f) in contributions {
        fx[[gy, gx]] += f.x;
        fy[[gy, gx]] += f.y;
    }
}

/// Interpolates the fluid velocity at every node's location from the
/// surrounding grid points, weighted by cell area so the transform is
/// the adjoint of [`spread`].
pub fn interpolate(mesh: &Mesh) -> Vec<Point> {
    let dx = mesh.dx();
    let dy = mesh.dy();
    let nx = mesh.nx();
    let ny = mesh.ny();
    let (u, v) = mesh.velocity_grids();
    let cell_area = dx * dy;

    mesh.nodes()
        .iter()
        .map(|node| {
            let mut vel = Point::zero();
            for (gx, gy, w) in stencil(node.location, dx, dy, nx, ny) {
                vel.x += u[[gy, gx]] * w * cell_area;
                vel.y += v[[gy, gx]] * w * cell_area;
            }
            vel
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::node::Node;

    fn single_point_mesh(fx: f64, fy: f64) -> Mesh {
        let nodes = vec![
            Node::new(0, Point::new(0.5, 0.5)),
            Node::new(1, Point::new(0.55, 0.5)),
            Node::new(2, Point::new(0.55, 0.55)),
            Node::new(3, Point::new(0.5, 0.55)),
        ];
        let elem = Element::new(0, vec![0, 1, 2, 3]);
        let mut mesh = Mesh::new(nodes, vec![elem], None, 32, 32).unwrap();
        for &id in &mesh.element(0).nodes.clone() {
            mesh.node_mut(id).applied_force = Point::new(fx, fy);
        }
        mesh
    }

    #[test]
    fn stencil_is_a_partition_of_unity() {
        let weight: f64 = stencil(Point::new(0.37, 0.81), 1.0 / 32.0, 1.0 / 32.0, 32, 32)
            .iter()
            .map(|&(_, _, w)| w)
            .sum();
        assert!((weight - 1.0).abs() < 1e-8, "weight = {}", weight);
    }

    #[test]
    fn spread_conserves_total_force() {
        let mut mesh = single_point_mesh(2.0, -3.0);
        let dl = mesh.characteristic_spacing();
        spread(&mut mesh);
        let (fx, fy) = mesh.force_grids();
        let cell_area = mesh.dx() * mesh.dy();
        let sum_x: f64 = fx.iter().sum::<f64>() * cell_area;
        let sum_y: f64 = fy.iter().sum::<f64>() * cell_area;
        // Each of the 4 nodes carries (fx, fy) weighted by dl; the
        // kernel is a partition of unity so the grid integral reproduces
        // the total applied force.
        assert!((sum_x - 8.0 * dl).abs() < 1e-6, "sum_x = {}", sum_x);
        assert!((sum_y - -12.0 * dl).abs() < 1e-6, "sum_y = {}", sum_y);
    }

    #[test]
    fn interpolate_reproduces_uniform_flow() {
        let nodes = vec![
            Node::new(0, Point::new(0.1, 0.1)),
            Node::new(1, Point::new(0.15, 0.1)),
            Node::new(2, Point::new(0.15, 0.15)),
            Node::new(3, Point::new(0.1, 0.15)),
        ];
        let elem = Element::new(0, vec![0, 1, 2, 3]);
        let mut mesh = Mesh::new(nodes, vec![elem], None, 32, 32).unwrap();
        {
            let (u, v) = mesh.velocity_grids_mut();
            u.fill(1.5);
            v.fill(-0.5);
        }
        let vel = interpolate(&mesh);
        for p in &vel[..4] {
            assert!((p.x - 1.5).abs() < 1e-8, "vx = {}", p.x);
            assert!((p.y - -0.5).abs() < 1e-8, "vy = {}", p.y);
        }
    }
}
