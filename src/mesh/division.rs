//! Element division along a given axis.

use super::Mesh;
use crate::element::Element;
use crate::errors::*;
use crate::geometry::{vector_from, Point};
use crate::node::Node;
use crate::Index;

impl Mesh {
    /// Divides `elem` along `axis` (and its perpendicular) into two
    /// daughter elements, using the configured element-division spacing
    /// as the required perpendicular gap. Returns the index of the newly
    /// created daughter. `place_original_below` controls which side of
    /// the axis keeps `elem`'s index.
    pub fn divide_along_axis(
        &mut self,
        elem: Index,
        axis: Point,
        place_original_below: bool,
    ) -> Result<Index> {
        let gap = self
            .element_division_spacing
            .ok_or_else(|| ErrorKind::ConfigError("element_division_spacing is unset".into()))?;

        let perp = Point::new(-axis.y, axis.x);
        let centroid = self.centroid_of(elem);
        let node_ids = self.elements[elem].nodes.clone();
        let n = node_ids.len();

        let d: Vec<f64> = node_ids
            .iter()
            .map(|&id| perp.dot(&vector_from(centroid, self.nodes[id].location)))
            .collect();
        let side = |v: f64| v >= 0.0;

        let mut crossings = Vec::new();
        for i in 0..n {
            let j = (i + 1) % n;
            if side(d[i]) != side(d[j]) {
                crossings.push(i);
            }
        }

        if crossings.len() != 2 {
            bail!(ErrorKind::GeometryError(format!(
                "division axis crosses element {} at {} edges, expected 2",
                elem,
                crossings.len()
            )));
        }

        // Two crossing edges c0 -> c0+1 and c1 -> c1+1 split the ring into
        // two arcs. `group_neg` walks forward from just after the first
        // crossing to the second crossing (inclusive); `group_pos` is the
        // complementary arc.
        let (c0, c1) = (crossings[0], crossings[1]);
        let group_neg: Vec<usize> = ring_range(c0 + 1, c1, n);
        let group_pos: Vec<usize> = ring_range(c1 + 1, c0, n);

        let neg_stencil = frontier_stencil(&group_neg, &d, &node_ids, &self.nodes, centroid, perp, gap)?;
        let pos_stencil = frontier_stencil(&group_pos, &d, &node_ids, &self.nodes, centroid, perp, gap)?;

        let num_nodes = n;
        let neg_samples = resample_closed_polyline(&neg_stencil, num_nodes);
        let pos_samples = resample_closed_polyline(&pos_stencil, num_nodes);

        let (original_samples, new_samples) = if place_original_below {
            (neg_samples, pos_samples)
        } else {
            (pos_samples, neg_samples)
        };

        // Move the original element's nodes onto daughter-A's samples.
        for (i, &id) in node_ids.iter().enumerate() {
            self.nodes[id].location = original_samples[i].add(&centroid).reduce();
        }

        // Allocate fresh nodes for daughter-B.
        let mut new_node_ids = Vec::with_capacity(num_nodes);
        for sample in &new_samples {
            let idx = self.nodes.len();
            let mut node = Node::new(idx, sample.add(&centroid).reduce());
            node.region = self.nodes[node_ids[0]].region;
            if !self.nodes[node_ids[0]].attributes.is_empty() {
                node.attributes = vec![0.0; self.nodes[node_ids[0]].attributes.len()];
            }
            self.nodes.push(node);
            new_node_ids.push(idx);
        }

        let new_elem_idx = self.elements.len();
        let mut new_elem = Element::new(new_elem_idx, new_node_ids.clone());
        {
            let orig = &self.elements[elem];
            new_elem.membrane_spring_constant = orig.membrane_spring_constant;
            new_elem.membrane_rest_length = orig.membrane_rest_length;
            new_elem.corner_nodes = orig.corner_nodes;
            new_elem.attributes = orig.attributes.clone();
            new_elem.is_membrane = false;
        }
        self.elements.push(new_elem);

        for &id in &new_node_ids {
            self.nodes[id].containing_elements.insert(new_elem_idx);
        }
        for &id in &node_ids {
            self.nodes[id].containing_elements.insert(elem);
        }

        self.elements[elem].cached_spacing = None;
        self.elements[new_elem_idx].cached_spacing = None;

        self.rebuild_element_fluid_sources();
        self.recompute_mean_node_spacing();

        Ok(new_elem_idx)
    }

    /// Divides `elem` along its own short axis (spec section 4.2).
    pub fn divide_along_short_axis(
        &mut self,
        elem: Index,
        place_original_below: bool,
    ) -> Result<Index> {
        let axis = self.short_axis_of(elem);
        self.divide_along_axis(elem, axis, place_original_below)
    }
}

/// Node indices `from..=to` walking forward around a ring of size `n`
/// (inclusive of both ends).
fn ring_range(from: usize, to: usize, n: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut i = from % n;
    loop {
        out.push(i);
        if i == to % n {
            break;
        }
        i = (i + 1) % n;
    }
    out
}

/// Walks inward from both ends of `group` (a contiguous arc of local
/// node positions, given as indices into `node_ids`/`d`) until a node's
/// perpendicular distance from the centroid reaches `gap / 2`, snaps
/// that frontier node exactly onto the `gap / 2` offset plane, and
/// returns the retained stencil (as points relative to the centroid).
fn frontier_stencil(
    group: &[usize],
    d: &[f64],
    node_ids: &[Index],
    nodes: &[Node],
    centroid: Point,
    perp: Point,
    gap: f64,
) -> Result<Vec<Point>> {
    let half = gap / 2.0;
    let len = group.len();

    let mut lo = 0;
    while lo < len && d[group[lo]].abs() < half {
        lo += 1;
    }
    let mut hi = len - 1;
    while hi > 0 && d[group[hi]].abs() < half {
        hi -= 1;
    }

    if lo >= len || hi == 0 && d[group[0]].abs() < half || lo > hi {
        bail!(ErrorKind::DivisionSpacingError(format!(
            "could not find nodes at perpendicular distance >= {} from centroid",
            half
        )));
    }

    let mut points: Vec<Point> = Vec::with_capacity(hi - lo + 1);
    for &local in &group[lo..=hi] {
        let id = node_ids[local];
        let rel = vector_from(centroid, nodes[id].location);
        points.push(rel);
    }

    // Snap the two frontier (first/last) nodes onto the exact gap/2 plane,
    // preserving their along-axis component.
    snap_onto_offset_plane(&mut points[0], perp, half * d[group[lo]].signum());
    let last = points.len() - 1;
    snap_onto_offset_plane(&mut points[last], perp, half * d[group[hi]].signum());

    Ok(points)
}

/// Adjusts `p` so that `perp . p == target`, by sliding `p` along the
/// direction of `perp` (keeping the along-axis component fixed).
fn snap_onto_offset_plane(p: &mut Point, perp: Point, target: f64) {
    let current = perp.dot(p);
    let delta = target - current;
    *p = p.add(&perp.scale(delta));
}

/// Resamples a closed polyline (vertices connect back to the first one)
/// into `num_points` equally arc-length-spaced points, starting at the
/// first input vertex.
fn resample_closed_polyline(points: &[Point], num_points: usize) -> Vec<Point> {
    let n = points.len();
    if n == 1 {
        return vec![points[0]; num_points];
    }

    let mut cum = vec![0.0; n + 1];
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        cum[i + 1] = cum[i] + a.sub(&b).norm();
    }
    let perimeter = cum[n];

    if perimeter < 1e-15 {
        return vec![points[0]; num_points];
    }

    let step = perimeter / num_points as f64;
    (0..num_points)
        .map(|k| {
            let target = step * k as f64;
            let seg = cum.partition_point(|&c| c <= target).saturating_sub(1).min(n - 1);
            let a = points[seg];
            let b = points[(seg + 1) % n];
            let seg_len = cum[seg + 1] - cum[seg];
            let t = if seg_len > 1e-15 {
                (target - cum[seg]) / seg_len
            } else {
                0.0
            };
            a.add(&b.sub(&a).scale(t))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::node::Node;

    fn squarish_mesh(half: f64) -> Mesh {
        let n = 64;
        let nodes: Vec<Node> = (0..n)
            .map(|i| {
                let t = 2. * std::f64::consts::PI * i as f64 / n as f64;
                Node::new(
                    i,
                    Point::new(0.5 + half * t.cos(), 0.5 + half * t.sin()),
                )
            })
            .collect();
        let elem = Element::new(0, (0..n).collect());
        let mut mesh = Mesh::new(nodes, vec![elem], None, 64, 64).unwrap();
        mesh.set_element_division_spacing(0.02).unwrap();
        mesh
    }

    #[test]
    fn division_requires_spacing_configured() {
        let n = 8;
        let nodes: Vec<Node> = (0..n)
            .map(|i| {
                let t = 2. * std::f64::consts::PI * i as f64 / n as f64;
                Node::new(i, Point::new(0.5 + 0.1 * t.cos(), 0.5 + 0.1 * t.sin()))
            })
            .collect();
        let elem = Element::new(0, (0..n).collect());
        let mut mesh = Mesh::new(nodes, vec![elem], None, 32, 32).unwrap();
        let res = mesh.divide_along_axis(0, Point::new(1.0, 0.0), true);
        assert!(res.is_err());
    }

    #[test]
    fn division_preserves_count_sum() {
        let mut mesh = squarish_mesh(0.2);
        let elems_before = mesh.elements().len();
        let nodes_before = mesh.nodes().len();
        let n_orig = mesh.element(0).num_nodes();

        let new_idx = mesh
            .divide_along_axis(0, Point::new(0.0, 1.0), true)
            .expect("division should succeed");

        assert_eq!(mesh.elements().len(), elems_before + 1);
        assert_eq!(mesh.nodes().len(), nodes_before + n_orig);
        assert_eq!(mesh.element(new_idx).num_nodes(), n_orig);
    }

    #[test]
    fn division_gap_matches_configured_spacing() {
        let mut mesh = squarish_mesh(0.3);
        let new_idx = mesh
            .divide_along_axis(0, Point::new(0.0, 1.0), true)
            .expect("division should succeed");

        let mut min_gap = f64::INFINITY;
        for &a in &mesh.element(0).nodes.clone() {
            for &b in &mesh.element(new_idx).nodes.clone() {
                let dist = vector_from(mesh.node(a).location, mesh.node(b).location).norm();
                if dist < min_gap {
                    min_gap = dist;
                }
            }
        }
        assert!(
            min_gap > 0.015 && min_gap < 0.025,
            "min_gap = {}",
            min_gap
        );
    }
}
