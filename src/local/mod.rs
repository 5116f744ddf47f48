//! Local (reference-element) discretizations.
//!
//! A local discretization bundles everything about one reference element
//! kind at one polynomial order: nodes, basis, the reference mass and
//! differentiation matrices, face index lists and the rules for matching
//! face nodes between neighbours. The discretization core only consumes the
//! [`LocalDiscretization`] trait; [`SimplexDiscretization`] is the provider
//! for straight-sided intervals, triangles and tetrahedra.

mod nodes;
mod quadrature;
mod shape;
mod simplex;

pub use nodes::unit_nodes;
pub use quadrature::LocalQuadratureInfo;
pub use shape::{SimplexShape, barycentric_tuple, node_tuples, simplex_node_count};
pub use simplex::SimplexDiscretization;

use crate::basis::Vandermonde;
use faer::Mat;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Permutation of face-local node positions.
///
/// `apply` yields, for every local face node i, the neighbour-side entry that
/// sits at the same physical location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceShuffle {
    permutation: Vec<usize>,
}

impl FaceShuffle {
    pub fn new(permutation: Vec<usize>) -> Self {
        Self { permutation }
    }

    pub fn identity(len: usize) -> Self {
        Self {
            permutation: (0..len).collect(),
        }
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    pub fn len(&self) -> usize {
        self.permutation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permutation.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.permutation.iter().enumerate().all(|(i, &p)| i == p)
    }

    /// `result[i] = indices[permutation[i]]`
    pub fn apply<T: Copy>(&self, indices: &[T]) -> Vec<T> {
        self.permutation.iter().map(|&p| indices[p]).collect()
    }
}

/// For two orderings of the same entries, the list `wtm` with
/// `permuted[wtm[i]] == original[i]`.
///
/// Writing value i of the `original` ordering to slot `wtm[i]` puts it in
/// `permuted` order.
pub fn write_to_map(original: &[usize], permuted: &[usize]) -> Vec<usize> {
    let position: HashMap<usize, usize> = permuted.iter().enumerate().map(|(i, &x)| (x, i)).collect();
    original.iter().map(|x| position[x]).collect()
}

/// Outcome of matching two face-vertex tuples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceMatch {
    /// The tuples are permutations of each other; the shuffle aligns the
    /// neighbour's face nodes with the local ones.
    Matched(FaceShuffle),
    /// The vertex sets differ. The faces can only be periodic images.
    NeedsPeriodicResolution,
}

/// Match face nodes by their integer barycentric tuples.
///
/// `local_tuples[i][k]` is the lattice weight of face node i at
/// `local_vertices[k]`, likewise for the neighbour. Two nodes coincide when
/// they carry the same weight at every shared vertex.
pub(crate) fn match_face_tuples(
    local_tuples: &[Vec<usize>],
    local_vertices: &[usize],
    neighbor_tuples: &[Vec<usize>],
    neighbor_vertices: &[usize],
) -> FaceMatch {
    let mut sorted_local = local_vertices.to_vec();
    let mut sorted_neighbor = neighbor_vertices.to_vec();
    sorted_local.sort_unstable();
    sorted_neighbor.sort_unstable();
    if sorted_local != sorted_neighbor || local_tuples.len() != neighbor_tuples.len() {
        return FaceMatch::NeedsPeriodicResolution;
    }

    // position of each local vertex within the neighbour tuple
    let slot: Vec<usize> = local_vertices
        .iter()
        .map(|v| neighbor_vertices.iter().position(|w| w == v).unwrap_or(0))
        .collect();

    let by_weights: HashMap<Vec<usize>, usize> = neighbor_tuples
        .iter()
        .enumerate()
        .map(|(j, tuple)| (slot.iter().map(|&s| tuple[s]).collect(), j))
        .collect();

    let permutation: Option<Vec<usize>> = local_tuples
        .iter()
        .map(|tuple| by_weights.get(tuple).copied())
        .collect();

    match permutation {
        Some(permutation) => FaceMatch::Matched(FaceShuffle::new(permutation)),
        None => FaceMatch::NeedsPeriodicResolution,
    }
}

/// Reference-element data consumed by the discretization core.
pub trait LocalDiscretization: Send + Sync + fmt::Debug {
    fn shape(&self) -> SimplexShape;

    fn dimensions(&self) -> usize {
        self.shape().dimensions()
    }

    fn order(&self) -> usize;

    fn node_count(&self) -> usize;

    /// Node positions in unit coordinates.
    fn unit_nodes(&self) -> &[Vec<f64>];

    fn vandermonde(&self) -> &Vandermonde;

    fn mass_matrix(&self) -> &Mat<f64>;

    fn inverse_mass_matrix(&self) -> &Mat<f64>;

    /// One differentiation matrix per unit coordinate axis.
    fn differentiation_matrices(&self) -> &[Mat<f64>];

    fn face_count(&self) -> usize {
        self.shape().face_count()
    }

    /// Element-local vertex tuple of each face.
    fn face_vertices(&self) -> &'static [&'static [usize]] {
        self.shape().face_vertices()
    }

    /// Element-local node indices of each face.
    fn face_indices(&self) -> &[Vec<usize>];

    fn face_node_count(&self) -> usize;

    /// Mass matrix of `face`'s nodes on the unit face, in `face_indices` order.
    fn face_mass_matrix(&self, face: usize) -> &Mat<f64>;

    /// Whether face values are available at volume nodes.
    fn has_facial_nodes(&self) -> bool {
        true
    }

    /// Basis mode identifiers; equal identifiers denote the same mode across
    /// orders.
    fn mode_identifiers(&self) -> &[Vec<usize>];

    /// All basis functions evaluated at a unit-coordinate point.
    fn basis_values(&self, point: &[f64]) -> Vec<f64>;

    /// Align the nodes of neighbour face `neighbor_face` (whose global vertex
    /// tuple is `neighbor_vertices`) with local face `face`.
    fn match_faces(
        &self,
        face: usize,
        vertices: &[usize],
        neighbor_face: usize,
        neighbor_vertices: &[usize],
    ) -> FaceMatch;

    /// Quadrature data exact to at least `min_degree`.
    fn quadrature_info(&self, min_degree: usize) -> Arc<LocalQuadratureInfo>;

    /// Order-dependent part of the stable time step.
    fn dt_non_geometric_factor(&self) -> f64;
}
