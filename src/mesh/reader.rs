//! The abstract reader interface the core accepts to construct a `Mesh`
//! from a collaborator-owned blob. Any deviation from the shape
//! promised by the getters below is a `MalformedMeshError`.

use crate::errors::*;

/// A single node row: `(x, y, is_boundary)`.
pub type NodeRow = (f64, f64, bool);

/// A single element row: node indices in traversal order, whether this
/// is the membrane element, and an optional scalar attribute.
pub type ElementRow = (Vec<usize>, bool, Option<f64>);

pub trait MeshReader {
    fn num_nodes(&self) -> usize;
    fn node(&self, i: usize) -> NodeRow;

    fn num_elements(&self) -> usize;
    fn element(&self, i: usize) -> ElementRow;

    /// `(Nx, Ny)`.
    fn grid_dims(&self) -> (usize, usize);

    /// `Ny` rows of `Nx` doubles, for the `u` velocity component.
    fn u_rows(&self) -> Vec<Vec<f64>>;
    /// `Ny` rows of `Nx` doubles, for the `v` velocity component.
    fn v_rows(&self) -> Vec<Vec<f64>>;
}

/// Validates the shape invariants a `MeshReader` promises, independent of
/// any particular reader implementation, so `Mesh::from_reader` can fail
/// fast with a precise message.
pub(crate) fn validate<R: MeshReader>(reader: &R) -> Result<()> {
    let (nx, ny) = reader.grid_dims();
    if nx == 0 || ny == 0 {
        bail!(ErrorKind::MalformedMeshError(format!(
            "grid dims must be positive, got ({}, {})",
            nx, ny
        )));
    }

    let u = reader.u_rows();
    let v = reader.v_rows();
    if u.len() != ny || v.len() != ny {
        bail!(ErrorKind::MalformedMeshError(format!(
            "expected {} rows for u/v, got {}/{}",
            ny,
            u.len(),
            v.len()
        )));
    }
    for row in u.iter().chain(v.iter()) {
        if row.len() != nx {
            bail!(ErrorKind::MalformedMeshError(format!(
                "expected {} columns per row, got {}",
                nx,
                row.len()
            )));
        }
    }

    let n_nodes = reader.num_nodes();
    for e in 0..reader.num_elements() {
        let (nodes, is_membrane, _) = reader.element(e);
        if nodes.iter().any(|&i| i >= n_nodes) {
            bail!(ErrorKind::MalformedMeshError(format!(
                "element {} references out-of-range node index",
                e
            )));
        }
        let min_nodes = if is_membrane { 2 } else { 3 };
        if nodes.len() < min_nodes {
            bail!(ErrorKind::MalformedMeshError(format!(
                "element {} has fewer than {} nodes",
                e, min_nodes
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    /// A `MeshReader` built from plain fields, for exercising `validate`
    /// and `Mesh::from_reader` without a real file-format collaborator.
    struct BlobReader {
        nodes: Vec<NodeRow>,
        elements: Vec<ElementRow>,
        nx: usize,
        ny: usize,
        u_rows: Vec<Vec<f64>>,
        v_rows: Vec<Vec<f64>>,
    }

    impl MeshReader for BlobReader {
        fn num_nodes(&self) -> usize {
            self.nodes.len()
        }
        fn node(&self, i: usize) -> NodeRow {
            self.nodes[i]
        }
        fn num_elements(&self) -> usize {
            self.elements.len()
        }
        fn element(&self, i: usize) -> ElementRow {
            self.elements[i].clone()
        }
        fn grid_dims(&self) -> (usize, usize) {
            (self.nx, self.ny)
        }
        fn u_rows(&self) -> Vec<Vec<f64>> {
            self.u_rows.clone()
        }
        fn v_rows(&self) -> Vec<Vec<f64>> {
            self.v_rows.clone()
        }
    }

    /// A well-formed square-cell blob on a 4x4 grid.
    fn good_blob() -> BlobReader {
        BlobReader {
            nodes: vec![
                (0.2, 0.2, true),
                (0.3, 0.2, true),
                (0.3, 0.3, true),
                (0.2, 0.3, true),
            ],
            elements: vec![(vec![0, 1, 2, 3], false, None)],
            nx: 4,
            ny: 4,
            u_rows: vec![vec![0.0; 4]; 4],
            v_rows: vec![vec![0.0; 4]; 4],
        }
    }

    #[test]
    fn well_formed_blob_validates_and_builds() {
        let blob = good_blob();
        assert!(validate(&blob).is_ok());
        assert!(Mesh::from_reader(&blob).is_ok());
    }

    #[test]
    fn zero_grid_dims_are_malformed() {
        let mut blob = good_blob();
        blob.nx = 0;
        assert!(matches!(
            validate(&blob).unwrap_err().kind(),
            ErrorKind::MalformedMeshError(_)
        ));
        assert!(Mesh::from_reader(&blob).is_err());
    }

    #[test]
    fn wrong_row_count_is_malformed() {
        let mut blob = good_blob();
        blob.u_rows.pop();
        assert!(matches!(
            validate(&blob).unwrap_err().kind(),
            ErrorKind::MalformedMeshError(_)
        ));
    }

    #[test]
    fn wrong_column_count_is_malformed() {
        let mut blob = good_blob();
        blob.v_rows[0].pop();
        assert!(matches!(
            validate(&blob).unwrap_err().kind(),
            ErrorKind::MalformedMeshError(_)
        ));
    }

    #[test]
    fn out_of_range_node_index_is_malformed() {
        let mut blob = good_blob();
        blob.elements[0].0[1] = 99;
        assert!(matches!(
            validate(&blob).unwrap_err().kind(),
            ErrorKind::MalformedMeshError(_)
        ));
        assert!(Mesh::from_reader(&blob).is_err());
    }

    #[test]
    fn cell_element_with_fewer_than_three_nodes_is_malformed() {
        let mut blob = good_blob();
        blob.elements[0] = (vec![0, 1], false, None);
        assert!(matches!(
            validate(&blob).unwrap_err().kind(),
            ErrorKind::MalformedMeshError(_)
        ));
    }

    #[test]
    fn membrane_element_with_two_nodes_is_well_formed() {
        let mut blob = good_blob();
        blob.elements[0] = (vec![0, 1], true, None);
        assert!(validate(&blob).is_ok());
    }

    #[test]
    fn membrane_element_with_one_node_is_malformed() {
        let mut blob = good_blob();
        blob.elements[0] = (vec![0], true, None);
        assert!(matches!(
            validate(&blob).unwrap_err().kind(),
            ErrorKind::MalformedMeshError(_)
        ));
    }
}
