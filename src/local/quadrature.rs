//! Quadrature variants of a local discretization.
//!
//! The rule of degree q is interpolatory on the order-q warp-and-blend node
//! set: the weights are ∫ ℓ_i, i.e. the column sums of that set's mass
//! matrix, so polynomials of degree q are integrated exactly. Faces use the
//! same construction one dimension down. Because the node sets are symmetric
//! under vertex permutations, face quadrature nodes of two neighbours are
//! matched exactly like nodal face nodes.

use super::nodes::unit_nodes;
use super::shape::{SimplexShape, barycentric_tuple, node_tuples};
use super::{FaceMatch, match_face_tuples};
use crate::basis::{Vandermonde, invert, matmul, transpose, vandermonde};
use faer::Mat;

/// Quadrature data of one local discretization for one minimum degree.
#[derive(Debug, Clone)]
pub struct LocalQuadratureInfo {
    pub min_degree: usize,
    /// Volume quadrature nodes in unit coordinates.
    pub unit_nodes: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
    /// Nodal values → volume quadrature values, (nq × np).
    pub volume_up_interp: Mat<f64>,
    pub face_node_count: usize,
    /// Face quadrature nodes in unit element coordinates, per face.
    pub face_nodes: Vec<Vec<Vec<f64>>>,
    /// Weights on the unit face.
    pub face_weights: Vec<f64>,
    /// Nodal values → face quadrature values, (nfq × np) per face.
    pub face_up_interp: Vec<Mat<f64>>,
    /// Lattice weights of each face quadrature node, in face-vertex order.
    face_tuples: Vec<Vec<usize>>,
}

/// Interpolatory weights of the order-q nodal set in `dims` dimensions.
fn interpolatory_weights(dims: usize, order: usize, points: &[Vec<f64>]) -> Vec<f64> {
    if dims == 0 {
        return vec![1.0];
    }
    let modes = node_tuples(dims, order);
    let vdm = Vandermonde::new(&modes, points);
    let mass = invert(&matmul(&vdm.v, &transpose(&vdm.v)));
    (0..mass.ncols())
        .map(|j| (0..mass.nrows()).map(|i| mass[(i, j)]).sum())
        .collect()
}

impl LocalQuadratureInfo {
    pub(crate) fn new(
        shape: SimplexShape,
        modes: &[Vec<usize>],
        v_inv: &Mat<f64>,
        min_degree: usize,
    ) -> Self {
        let dims = shape.dimensions();

        let volume_nodes = unit_nodes(dims, min_degree);
        let weights = interpolatory_weights(dims, min_degree, &volume_nodes);
        let volume_up_interp = matmul(&vandermonde(modes, &volume_nodes), v_inv);

        let face_dims = dims - 1;
        let face_points = unit_nodes(face_dims, min_degree);
        let face_tuples: Vec<Vec<usize>> = node_tuples(face_dims, min_degree)
            .iter()
            .map(|t| barycentric_tuple(min_degree, t))
            .collect();
        let face_weights = interpolatory_weights(face_dims, min_degree, &face_points);

        let face_nodes: Vec<Vec<Vec<f64>>> = shape
            .face_vertices()
            .iter()
            .map(|fvi| {
                face_points
                    .iter()
                    .map(|p| embed_face_point(shape, fvi, p))
                    .collect()
            })
            .collect();

        let face_up_interp = face_nodes
            .iter()
            .map(|points| matmul(&vandermonde(modes, points), v_inv))
            .collect();

        Self {
            min_degree,
            unit_nodes: volume_nodes,
            weights,
            volume_up_interp,
            face_node_count: face_points.len(),
            face_nodes,
            face_weights,
            face_up_interp,
            face_tuples,
        }
    }

    pub fn node_count(&self) -> usize {
        self.unit_nodes.len()
    }

    /// Align the neighbour's face quadrature nodes with the local ones.
    pub fn match_faces(&self, vertices: &[usize], neighbor_vertices: &[usize]) -> FaceMatch {
        match_face_tuples(&self.face_tuples, vertices, &self.face_tuples, neighbor_vertices)
    }
}

/// Place a point given in unit coordinates of the face simplex onto the face
/// of the element with local vertex tuple `fvi`.
pub(crate) fn embed_face_point(shape: SimplexShape, fvi: &[usize], face_point: &[f64]) -> Vec<f64> {
    let face_bary: Vec<f64> = match shape.face_shape() {
        Some(face_shape) => face_shape.barycentric(face_point),
        None => vec![1.0],
    };
    let mut point = vec![0.0; shape.dimensions()];
    for (&v, &lambda) in fvi.iter().zip(&face_bary) {
        for (x, u) in point.iter_mut().zip(shape.unit_vertex(v)) {
            *x += lambda * u;
        }
    }
    point
}
