//! Third standardised moment of a polygon's mass distribution along a
//! given axis (`skewness_of_mass_distribution`).

use super::Mesh;
use crate::geometry::{vector_from, Point};
use crate::Index;
use log::warn;

impl Mesh {
    /// Rotates the polygon so `axis` becomes vertical, sorts nodes by the
    /// rotated `x` coordinate, builds at each node a vertical
    /// intersection list with the polygon edges, normalises the
    /// resulting piecewise-linear mass pdf by the element area, and
    /// returns the third standardised moment.
    ///
    /// If the axis crosses the polygon more than twice at some station
    /// this falls back to the outermost two intersections and logs a
    /// one-shot warning (once per mesh, not once per call, since a
    /// badly concave cell will otherwise flood the log every step).
    pub fn skewness_of_mass_distribution(&mut self, elem: Index, axis: Point) -> f64 {
        let e = &self.elements[elem];
        let base = self.nodes[e.nodes[0]].location;
        let verts_abs: Vec<Point> = e
            .nodes
            .iter()
            .map(|&n| vector_from(base, self.nodes[n].location))
            .collect();
        let n = verts_abs.len();

        let area = self.volume_of(elem);
        if area < 1e-15 {
            return 0.0;
        }

        // Rotate so that `axis` maps onto (0, 1).
        let theta = axis.y.atan2(axis.x);
        let phi = std::f64::consts::FRAC_PI_2 - theta;
        let (c, s) = (phi.cos(), phi.sin());
        let rotate = |p: Point| Point::new(p.x * c - p.y * s, p.x * s + p.y * c);

        let centroid_rel = {
            let c = self.centroid_of(elem);
            vector_from(base, c)
        };
        let centered: Vec<Point> = verts_abs.iter().map(|&p| rotate(p.sub(&centroid_rel))).collect();

        let mut station_x: Vec<f64> = centered.iter().map(|p| p.x).collect();
        station_x.sort_by(|a, b| a.partial_cmp(b).unwrap());
        station_x.dedup_by(|a, b| (*a - *b).abs() < 1e-14);

        let mut any_overcrossed = false;
        let mut stations: Vec<(f64, f64)> = Vec::with_capacity(station_x.len());

        for &x in &station_x {
            let mut ys: Vec<f64> = Vec::new();
            for i in 0..n {
                let p = centered[i];
                let q = centered[(i + 1) % n];
                let (lo, hi) = if p.x <= q.x { (p, q) } else { (q, p) };
                if x < lo.x - 1e-12 || x > hi.x + 1e-12 {
                    continue;
                }
                if (hi.x - lo.x).abs() < 1e-14 {
                    continue;
                }
                let t = (x - lo.x) / (hi.x - lo.x);
                ys.push(lo.y + t * (hi.y - lo.y));
            }

            if ys.is_empty() {
                continue;
            }

            if ys.len() > 2 {
                any_overcrossed = true;
                ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let width = ys.last().unwrap() - ys.first().unwrap();
                stations.push((x, width));
            } else {
                ys.sort_by(|a, b| a.partial_cmp(b).unwrap());
                let width = if ys.len() == 2 {
                    ys[1] - ys[0]
                } else {
                    0.0
                };
                stations.push((x, width));
            }
        }

        if any_overcrossed && !self.skew_warned {
            warn!(
                "skewness_of_mass_distribution: element {} is non-convex along the given axis; \
                 falling back to outermost intersections",
                elem
            );
            self.skew_warned = true;
        }

        if stations.len() < 2 {
            return 0.0;
        }

        let integrate = |g: &dyn Fn(f64) -> f64| -> f64 {
            let mut acc = 0.0;
            for w in stations.windows(2) {
                let (x0, w0) = w[0];
                let (x1, w1) = w[1];
                let f0 = g(x0) * w0 / area;
                let f1 = g(x1) * w1 / area;
                acc += (x1 - x0) * (f0 + f1) / 2.;
            }
            acc
        };

        let mass = integrate(&|_| 1.0);
        debug_assert!(
            (mass - 1.0).abs() < 1e-6 || mass.abs() < 1e-6,
            "normalised mass pdf should integrate to ~1, got {}",
            mass
        );

        let mean = integrate(&|x| x);
        let variance = integrate(&|x| (x - mean).powi(2));
        if variance < 1e-15 {
            return 0.0;
        }
        let third = integrate(&|x| (x - mean).powi(3));

        third / variance.powf(1.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::node::Node;

    #[test]
    fn symmetric_polygon_has_near_zero_skewness() {
        let n = 64;
        let nodes: Vec<Node> = (0..n)
            .map(|i| {
                let t = 2. * std::f64::consts::PI * i as f64 / n as f64;
                Node::new(i, Point::new(0.5 + 0.2 * t.cos(), 0.5 + 0.2 * t.sin()))
            })
            .collect();
        let elem = Element::new(0, (0..n).collect());
        let mut mesh = Mesh::new(nodes, vec![elem], None, 32, 32).unwrap();

        let s = mesh.skewness_of_mass_distribution(0, Point::new(1.0, 0.0));
        assert!(s.abs() < 1e-3, "skewness = {}", s);
    }
}
