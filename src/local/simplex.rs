//! Nodal discretization of the unit simplex.
//!
//! Given the order-N node set and the orthonormal basis:
//! - M^{-1} = V V^T and M = (V V^T)^{-1}
//! - D_k = V_k V^{-1}, with V_k the gradient Vandermonde along axis k
//! - face f collects the nodes whose barycentric weight vanishes at every
//!   vertex off the face, in node order
//! - the face mass matrices come from the (d-1)-dimensional basis evaluated
//!   at the face nodes, expressed in unit face coordinates

use super::nodes::unit_nodes;
use super::quadrature::LocalQuadratureInfo;
use super::shape::{SimplexShape, barycentric_tuple, node_tuples};
use super::{FaceMatch, LocalDiscretization, match_face_tuples};
use crate::basis::{Vandermonde, invert, matmul, simplex_basis, transpose, vandermonde};
use crate::error::{DiscretizationError, Result};
use faer::Mat;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Order-N nodal discretization of an interval, triangle or tetrahedron.
#[derive(Debug)]
pub struct SimplexDiscretization {
    shape: SimplexShape,
    order: usize,
    /// Node (and mode) identifier tuples.
    node_tuples: Vec<Vec<usize>>,
    unit_nodes: Vec<Vec<f64>>,
    vandermonde: Vandermonde,
    mass: Mat<f64>,
    mass_inv: Mat<f64>,
    diff: Vec<Mat<f64>>,
    face_indices: Vec<Vec<usize>>,
    /// Per face, per face node: lattice weights in face-vertex order.
    face_tuples: Vec<Vec<Vec<usize>>>,
    face_mass: Vec<Mat<f64>>,
    quadrature: Mutex<HashMap<usize, Arc<LocalQuadratureInfo>>>,
}

impl SimplexDiscretization {
    pub fn new(shape: SimplexShape, order: usize) -> Result<Self> {
        if order == 0 {
            return Err(DiscretizationError::InvalidOrder(order));
        }
        let dims = shape.dimensions();

        let tuples = node_tuples(dims, order);
        let nodes = unit_nodes(dims, order);
        let vandermonde = Vandermonde::new(&tuples, &nodes);

        let mass_inv = matmul(&vandermonde.v, &transpose(&vandermonde.v));
        let mass = invert(&mass_inv);
        let diff = vandermonde
            .grad
            .iter()
            .map(|vk| matmul(vk, &vandermonde.v_inv))
            .collect();

        let barys: Vec<Vec<usize>> = tuples.iter().map(|t| barycentric_tuple(order, t)).collect();

        let mut face_indices = Vec::with_capacity(shape.face_count());
        let mut face_tuples = Vec::with_capacity(shape.face_count());
        for fvi in shape.face_vertices() {
            let on_face: Vec<usize> = (0..tuples.len())
                .filter(|&i| {
                    (0..shape.vertex_count())
                        .filter(|v| !fvi.contains(v))
                        .all(|v| barys[i][v] == 0)
                })
                .collect();
            face_tuples.push(
                on_face
                    .iter()
                    .map(|&i| fvi.iter().map(|&v| barys[i][v]).collect())
                    .collect(),
            );
            face_indices.push(on_face);
        }

        let face_mass = shape
            .face_vertices()
            .iter()
            .zip(&face_indices)
            .map(|(fvi, indices)| face_mass_matrix(shape, order, fvi, indices, &nodes))
            .collect();

        Ok(Self {
            shape,
            order,
            node_tuples: tuples,
            unit_nodes: nodes,
            vandermonde,
            mass,
            mass_inv,
            diff,
            face_indices,
            face_tuples,
            face_mass,
            quadrature: Mutex::new(HashMap::new()),
        })
    }

    /// Unit-coordinate point → barycentric coordinates.
    pub fn barycentric(&self, point: &[f64]) -> Vec<f64> {
        self.shape.barycentric(point)
    }
}

/// Mass matrix of one face's nodes on the unit face simplex.
fn face_mass_matrix(
    shape: SimplexShape,
    order: usize,
    fvi: &[usize],
    indices: &[usize],
    nodes: &[Vec<f64>],
) -> Mat<f64> {
    let Some(face_shape) = shape.face_shape() else {
        // point faces
        let mut m = Mat::zeros(1, 1);
        m[(0, 0)] = 1.0;
        return m;
    };

    let face_points: Vec<Vec<f64>> = indices
        .iter()
        .map(|&i| {
            let bary = shape.barycentric(&nodes[i]);
            let mut p = vec![0.0; face_shape.dimensions()];
            for (k, &v) in fvi.iter().enumerate() {
                for (x, u) in p.iter_mut().zip(face_shape.unit_vertex(k)) {
                    *x += bary[v] * u;
                }
            }
            p
        })
        .collect();

    let modes = node_tuples(face_shape.dimensions(), order);
    let v = vandermonde(&modes, &face_points);
    invert(&matmul(&v, &transpose(&v)))
}

impl LocalDiscretization for SimplexDiscretization {
    fn shape(&self) -> SimplexShape {
        self.shape
    }

    fn order(&self) -> usize {
        self.order
    }

    fn node_count(&self) -> usize {
        self.unit_nodes.len()
    }

    fn unit_nodes(&self) -> &[Vec<f64>] {
        &self.unit_nodes
    }

    fn vandermonde(&self) -> &Vandermonde {
        &self.vandermonde
    }

    fn mass_matrix(&self) -> &Mat<f64> {
        &self.mass
    }

    fn inverse_mass_matrix(&self) -> &Mat<f64> {
        &self.mass_inv
    }

    fn differentiation_matrices(&self) -> &[Mat<f64>] {
        &self.diff
    }

    fn face_indices(&self) -> &[Vec<usize>] {
        &self.face_indices
    }

    fn face_node_count(&self) -> usize {
        self.face_indices.first().map_or(0, Vec::len)
    }

    fn face_mass_matrix(&self, face: usize) -> &Mat<f64> {
        &self.face_mass[face]
    }

    fn mode_identifiers(&self) -> &[Vec<usize>] {
        &self.node_tuples
    }

    fn basis_values(&self, point: &[f64]) -> Vec<f64> {
        self.node_tuples
            .iter()
            .map(|mode| simplex_basis(mode, point))
            .collect()
    }

    fn match_faces(
        &self,
        face: usize,
        vertices: &[usize],
        neighbor_face: usize,
        neighbor_vertices: &[usize],
    ) -> FaceMatch {
        match_face_tuples(
            &self.face_tuples[face],
            vertices,
            &self.face_tuples[neighbor_face],
            neighbor_vertices,
        )
    }

    fn quadrature_info(&self, min_degree: usize) -> Arc<LocalQuadratureInfo> {
        let mut cache = self.quadrature.lock();
        cache
            .entry(min_degree)
            .or_insert_with(|| {
                Arc::new(LocalQuadratureInfo::new(
                    self.shape,
                    &self.node_tuples,
                    &self.vandermonde.v_inv,
                    min_degree,
                ))
            })
            .clone()
    }

    fn dt_non_geometric_factor(&self) -> f64 {
        let spacing = |indices: &[usize]| {
            let mut min: f64 = f64::INFINITY;
            for (a, &i) in indices.iter().enumerate() {
                for &j in &indices[a + 1..] {
                    let d: f64 = self.unit_nodes[i]
                        .iter()
                        .zip(&self.unit_nodes[j])
                        .map(|(x, y)| (x - y).powi(2))
                        .sum::<f64>()
                        .sqrt();
                    min = min.min(d);
                }
            }
            min
        };

        let min_spacing = if self.face_node_count() > 1 {
            self.face_indices
                .iter()
                .map(|f| spacing(f))
                .fold(f64::INFINITY, f64::min)
        } else {
            let all: Vec<usize> = (0..self.node_count()).collect();
            spacing(&all)
        };
        2.0 / 3.0 * min_spacing
    }
}
