//! Owns nodes, elements, fluid grids and fluid sources; exposes the
//! geometric queries and the element-division operation. This is the
//! largest component of the core.

pub mod division;
pub mod fluid_source;
pub mod reader;
pub mod skewness;

use crate::element::Element;
use crate::errors::*;
use crate::geometry::{distance, vector_from, Point};
use crate::node::Node;
use crate::{Index, NO_MEMBRANE};
use fluid_source::{build_balancing_sources, FluidSource};
use ndarray::Array2;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use reader::MeshReader;

/// Second moments of a polygon about its own centroid.
#[derive(Debug, Clone, Copy)]
pub struct Moments {
    pub ixx: f64,
    pub iyy: f64,
    pub ixy: f64,
}

pub struct Mesh {
    nodes: Vec<Node>,
    elements: Vec<Element>,
    element_fluid_sources: Vec<FluidSource>,
    balancing_fluid_sources: Vec<FluidSource>,
    u: Array2<f64>,
    v: Array2<f64>,
    fx: Array2<f64>,
    fy: Array2<f64>,
    nx: usize,
    ny: usize,
    mean_node_spacing: f64,
    membrane_element: Option<Index>,
    element_division_spacing: Option<f64>,
    rng: Pcg64,
    skew_warned: bool,
}

impl Mesh {
    /// Builds a mesh from explicit node and element lists. `membrane_element`
    /// is the index into `elements` of the distinguished basement-lamina
    /// element, if any.
    pub fn new(
        mut nodes: Vec<Node>,
        mut elements: Vec<Element>,
        membrane_element: Option<Index>,
        nx: usize,
        ny: usize,
    ) -> Result<Mesh> {
        if nx == 0 || ny == 0 || nx % 2 != 0 || ny % 2 != 0 {
            bail!(ErrorKind::ConfigError(format!(
                "Nx, Ny must be positive even integers, got ({}, {})",
                nx, ny
            )));
        }

        for (i, e) in elements.iter().enumerate() {
            for &n in &e.nodes {
                nodes[n].containing_elements.insert(i);
            }
        }

        let mut mesh = Mesh {
            nodes,
            elements: Vec::new(),
            element_fluid_sources: Vec::new(),
            balancing_fluid_sources: Vec::new(),
            u: Array2::zeros((ny, nx)),
            v: Array2::zeros((ny, nx)),
            fx: Array2::zeros((ny, nx)),
            fy: Array2::zeros((ny, nx)),
            nx,
            ny,
            mean_node_spacing: 0.,
            membrane_element: membrane_element.filter(|&i| i != NO_MEMBRANE),
            element_division_spacing: None,
            rng: Pcg64::seed_from_u64(0xdead_beef),
            skew_warned: false,
        };

        elements.iter_mut().for_each(|e| e.is_membrane = false);
        if let Some(m) = mesh.membrane_element {
            if let Some(e) = elements.get_mut(m) {
                e.is_membrane = true;
            }
        }

        mesh.elements = elements;
        mesh.rebuild_element_fluid_sources();
        mesh.recompute_mean_node_spacing();
        mesh.rebuild_balancing_sources();

        Ok(mesh)
    }

    /// Builds a mesh from a collaborator-supplied reader blob (spec
    /// section 6). Any shape mismatch is a `MalformedMeshError`.
    pub fn from_reader<R: MeshReader>(reader: &R) -> Result<Mesh> {
        reader::validate(reader)?;

        let nodes: Vec<Node> = (0..reader.num_nodes())
            .map(|i| {
                let (x, y, _is_boundary) = reader.node(i);
                Node::new(i, Point::new(x, y))
            })
            .collect();

        let mut membrane_element = None;
        let mut elements = Vec::with_capacity(reader.num_elements());
        for i in 0..reader.num_elements() {
            let (node_idxs, is_membrane, attr) = reader.element(i);
            let mut e = Element::new(i, node_idxs);
            if let Some(a) = attr {
                e.attributes.insert("reader_attribute".to_string(), a);
            }
            if is_membrane {
                membrane_element = Some(i);
            }
            elements.push(e);
        }

        let (nx, ny) = reader.grid_dims();
        let mut mesh = Mesh::new(nodes, elements, membrane_element, nx, ny)?;

        let u_rows = reader.u_rows();
        let v_rows = reader.v_rows();
        for y in 0..ny {
            for x in 0..nx {
                mesh.u[[y, x]] = u_rows[y][x];
                mesh.v[[y, x]] = v_rows[y][x];
            }
        }

        Ok(mesh)
    }

    // -- accessors -------------------------------------------------------

    pub fn node(&self, i: Index) -> &Node {
        &self.nodes[i]
    }

    pub fn node_mut(&mut self, i: Index) -> &mut Node {
        &mut self.nodes[i]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn element(&self, i: Index) -> &Element {
        &self.elements[i]
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn membrane_element(&self) -> Option<Index> {
        self.membrane_element
    }

    pub fn non_membrane_elements(&self) -> impl Iterator<Item = Index> + '_ {
        (0..self.elements.len()).filter(move |&i| Some(i) != self.membrane_element)
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn dx(&self) -> f64 {
        1.0 / self.nx as f64
    }

    pub fn dy(&self) -> f64 {
        1.0 / self.ny as f64
    }

    pub fn characteristic_spacing(&self) -> f64 {
        self.mean_node_spacing
    }

    pub fn velocity_grids(&self) -> (&Array2<f64>, &Array2<f64>) {
        (&self.u, &self.v)
    }

    pub fn velocity_grids_mut(&mut self) -> (&mut Array2<f64>, &mut Array2<f64>) {
        (&mut self.u, &mut self.v)
    }

    pub fn force_grids(&self) -> (&Array2<f64>, &Array2<f64>) {
        (&self.fx, &self.fy)
    }

    pub fn force_grids_mut(&mut self) -> (&mut Array2<f64>, &mut Array2<f64>) {
        (&mut self.fx, &mut self.fy)
    }

    pub fn clear_force_grids(&mut self) {
        self.fx.fill(0.);
        self.fy.fill(0.);
    }

    pub fn element_fluid_sources(&self) -> &[FluidSource] {
        &self.element_fluid_sources
    }

    pub fn balancing_fluid_sources(&self) -> &[FluidSource] {
        &self.balancing_fluid_sources
    }

    pub fn set_element_division_spacing(&mut self, spacing: f64) -> Result<()> {
        if spacing <= 0. {
            bail!(ErrorKind::ConfigError(format!(
                "element_division_spacing must be positive, got {}",
                spacing
            )));
        }
        self.element_division_spacing = Some(spacing);
        Ok(())
    }

    pub fn element_division_spacing(&self) -> Option<f64> {
        self.element_division_spacing
    }

    /// Resizes the velocity/force grids, discarding their contents (spec
    /// section 4.2: `set_num_grid_pts`).
    pub fn set_num_grid_pts(&mut self, nx: usize, ny: usize) -> Result<()> {
        if nx == 0 || ny == 0 {
            bail!(ErrorKind::ConfigError(
                "grid dims must be positive".to_string()
            ));
        }
        self.nx = nx;
        self.ny = ny;
        self.u = Array2::zeros((ny, nx));
        self.v = Array2::zeros((ny, nx));
        self.fx = Array2::zeros((ny, nx));
        self.fy = Array2::zeros((ny, nx));
        Ok(())
    }

    /// `mean_node_spacing * Nx` — the dimensionless ratio controlling
    /// spreading quality.
    pub fn get_spacing_ratio(&self) -> f64 {
        self.mean_node_spacing * self.nx as f64
    }

    // -- geometry ----------------------------------------------------------

    fn node_loc(&self, i: Index) -> Point {
        self.nodes[i].location
    }

    /// `(signed_area, vertices relative to node 0)`.
    fn relative_vertices(&self, elem: Index) -> (Vec<Point>, f64) {
        let e = &self.elements[elem];
        let base = self.node_loc(e.nodes[0]);
        let verts: Vec<Point> = e
            .nodes
            .iter()
            .map(|&n| vector_from(base, self.node_loc(n)))
            .collect();

        let n = verts.len();
        let mut signed_area = 0.0;
        for i in 0..n {
            let a = verts[i];
            let b = verts[(i + 1) % n];
            signed_area += a.x * b.y - b.x * a.y;
        }
        signed_area *= 0.5;

        (verts, signed_area)
    }

    /// Shoelace sum over shortest-vector edges from node 0; `A >= 0`.
    pub fn volume_of(&self, elem: Index) -> f64 {
        let (_, signed_area) = self.relative_vertices(elem);
        signed_area.abs()
    }

    /// Sum of torus distances between consecutive nodes.
    pub fn surface_area_of(&self, elem: Index) -> f64 {
        let e = &self.elements[elem];
        let n = e.nodes.len();
        if n < 2 {
            return 0.;
        }
        let pair_count = if e.is_membrane { n - 1 } else { n };
        (0..pair_count)
            .map(|i| {
                let a = self.node_loc(e.nodes[i]);
                let b = self.node_loc(e.nodes[(i + 1) % n]);
                distance(a, b)
            })
            .sum()
    }

    /// `surface_area / num_nodes`, cached on the element unless
    /// `recompute` is true.
    pub fn average_node_spacing_of(&mut self, elem: Index, recompute: bool) -> f64 {
        if !recompute {
            if let Some(s) = self.elements[elem].cached_spacing {
                return s;
            }
        }
        let s = self.surface_area_of(elem) / self.elements[elem].num_nodes() as f64;
        self.elements[elem].cached_spacing = Some(s);
        s
    }

    /// Read-only variant that never recomputes and never caches; panics
    /// if the element's spacing has never been established. Intended for
    /// callers (force modules) that only read the already-cached value.
    pub fn average_node_spacing_cached(&self, elem: Index) -> f64 {
        self.elements[elem]
            .cached_spacing
            .expect("average_node_spacing_of must be called at least once before this")
    }

    /// Standard polygon centroid, expressed relative to node 0 and mapped
    /// back into `[0, 1)^2`. Returns `(0, 0)` for the membrane element.
    pub fn centroid_of(&self, elem: Index) -> Point {
        if Some(elem) == self.membrane_element {
            return Point::zero();
        }

        let (verts, a) = self.relative_vertices(elem);
        if a.abs() < 1e-15 {
            let base = self.node_loc(self.elements[elem].nodes[0]);
            return base.reduce();
        }

        let n = verts.len();
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let p = verts[i];
            let q = verts[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        let rel = Point::new(cx / (6. * a), cy / (6. * a));

        let base = self.node_loc(self.elements[elem].nodes[0]);
        base.add(&rel).reduce()
    }

    /// Second moments about the centroid, signed so that `Ixx >= 0`.
    pub fn moments_of(&self, elem: Index) -> Moments {
        let (verts, a) = self.relative_vertices(elem);
        let n = verts.len();

        let mut ixx0 = 0.0;
        let mut iyy0 = 0.0;
        let mut ixy0 = 0.0;
        for i in 0..n {
            let p = verts[i];
            let q = verts[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            ixx0 += (p.y * p.y + p.y * q.y + q.y * q.y) * cross;
            iyy0 += (p.x * p.x + p.x * q.x + q.x * q.x) * cross;
            ixy0 += (p.x * q.y + 2. * p.x * p.y + 2. * q.x * q.y + q.x * p.y) * cross;
        }
        ixx0 /= 12.;
        iyy0 /= 12.;
        ixy0 /= 24.;

        // centroid in the same node-0-relative frame
        let mut cx = 0.0;
        let mut cy = 0.0;
        if a.abs() > 1e-15 {
            for i in 0..n {
                let p = verts[i];
                let q = verts[(i + 1) % n];
                let cross = p.x * q.y - q.x * p.y;
                cx += (p.x + q.x) * cross;
                cy += (p.y + q.y) * cross;
            }
            cx /= 6. * a;
            cy /= 6. * a;
        }

        let mut ixx = ixx0 - a * cy * cy;
        let mut iyy = iyy0 - a * cx * cx;
        let mut ixy = ixy0 - a * cx * cy;

        if ixx < 0. {
            ixx = -ixx;
            iyy = -iyy;
            ixy = -ixy;
        }

        Moments { ixx, iyy, ixy }
    }

    /// Eigenvector of the inertia matrix for the larger eigenvalue. If
    /// the discriminant is below `1e-10`, returns an arbitrary unit
    /// vector drawn uniformly on the circle.
    pub fn short_axis_of(&mut self, elem: Index) -> Point {
        let m = self.moments_of(elem);
        let discriminant = (m.ixx - m.iyy).powi(2) + 4. * m.ixy * m.ixy;

        if discriminant < 1e-10 {
            use rand::Rng;
            let theta: f64 = self.rng.gen_range(0.0..std::f64::consts::TAU);
            return Point::new(theta.cos(), theta.sin());
        }

        let lambda_max = (m.ixx + m.iyy) / 2. + discriminant.sqrt() / 2.;

        let (vx, vy) = if m.ixy.abs() > 1e-15 {
            (m.ixy, lambda_max - m.ixx)
        } else if m.ixx >= m.iyy {
            (1.0, 0.0)
        } else {
            (0.0, 1.0)
        };

        let norm = (vx * vx + vy * vy).sqrt();
        Point::new(vx / norm, vy / norm)
    }

    /// `sqrt(lambda_max / lambda_min)` from the moments.
    pub fn elongation_shape_factor(&self, elem: Index) -> f64 {
        let m = self.moments_of(elem);
        let discriminant = ((m.ixx - m.iyy).powi(2) + 4. * m.ixy * m.ixy).max(0.);
        let mean = (m.ixx + m.iyy) / 2.;
        let half = discriminant.sqrt() / 2.;
        let lambda_max = mean + half;
        let lambda_min = (mean - half).max(1e-300);
        (lambda_max / lambda_min).sqrt()
    }

    /// Total centroid path length over straight-line distance, along the
    /// sequence of non-membrane element centroids.
    pub fn tortuosity(&self) -> f64 {
        let centroids: Vec<Point> = self
            .non_membrane_elements()
            .map(|i| self.centroid_of(i))
            .collect();

        if centroids.len() < 2 {
            return 1.0;
        }

        let mut path = 0.0;
        for w in centroids.windows(2) {
            path += distance(w[0], w[1]);
        }

        let first = centroids[0];
        let last = *centroids.last().unwrap();
        let d = distance(first, last);
        let straight = d.max(1. - d);

        path / straight
    }

    /// Bounding box relative to node 0, using shortest-vector
    /// displacements.
    pub fn bounding_box(&self, elem: Index) -> (Point, Point) {
        let (verts, _) = self.relative_vertices(elem);
        let mut min = verts[0];
        let mut max = verts[0];
        for v in &verts[1..] {
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
        }
        (min, max)
    }

    // -- internal maintenance ----------------------------------------------

    pub(crate) fn recompute_mean_node_spacing(&mut self) {
        let indices: Vec<Index> = self.non_membrane_elements().collect();
        if indices.is_empty() {
            self.mean_node_spacing = self.dx();
            return;
        }
        let sum: f64 = indices
            .iter()
            .map(|&i| self.average_node_spacing_of(i, true))
            .sum();
        self.mean_node_spacing = sum / indices.len() as f64;
    }

    /// Re-establishes invariant 3: every non-membrane element has
    /// exactly one element fluid source, located at its current
    /// centroid.
    pub(crate) fn rebuild_element_fluid_sources(&mut self) {
        let centroids: Vec<(Index, Point)> = self
            .non_membrane_elements()
            .map(|i| (i, self.centroid_of(i)))
            .collect();

        self.element_fluid_sources.clear();
        for (k, (elem, c)) in centroids.into_iter().enumerate() {
            self.element_fluid_sources
                .push(FluidSource::new(k, c, 0.0));
            self.elements[elem].fluid_source = Some(k);
        }
    }

    fn rebuild_balancing_sources(&mut self) {
        let total_element_strength: f64 =
            self.element_fluid_sources.iter().map(|s| s.strength).sum();
        self.balancing_fluid_sources =
            build_balancing_sources(self.dx(), -total_element_strength);
    }
}
