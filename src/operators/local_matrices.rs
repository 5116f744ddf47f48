//! Per-group reference matrices.
//!
//! From the reference mass matrix M and differentiation matrices D_k:
//! - stiffness S_k = M D_k
//! - stiffness transpose S_k^T = D_k^T M^T
//! - weak derivative M^{-1} S_k^T
//! - per-face LIFT matrices
//!
//! No geometry is folded in; physical scaling happens per element.

use super::lift::lift_matrices;
use crate::basis::{matmul, transpose};
use crate::local::LocalDiscretization;
use faer::Mat;

/// Reference matrices shared by all elements of a group.
#[derive(Debug, Clone)]
pub struct LocalMatrices {
    pub mass: Mat<f64>,
    pub inv_mass: Mat<f64>,
    /// D_k per reference axis
    pub diff: Vec<Mat<f64>>,
    /// S_k = M D_k
    pub stiffness: Vec<Mat<f64>>,
    /// S_k^T
    pub stiffness_t: Vec<Mat<f64>>,
    /// M^{-1} S_k^T
    pub minv_st: Vec<Mat<f64>>,
    /// M^{-1} E_f^T M_f per face
    pub lift: Vec<Mat<f64>>,
}

impl LocalMatrices {
    pub fn new(ldis: &dyn LocalDiscretization) -> Self {
        let mass = ldis.mass_matrix().clone();
        let inv_mass = ldis.inverse_mass_matrix().clone();
        let diff: Vec<Mat<f64>> = ldis.differentiation_matrices().to_vec();

        let stiffness: Vec<Mat<f64>> = diff.iter().map(|d| matmul(&mass, d)).collect();
        let stiffness_t: Vec<Mat<f64>> = stiffness.iter().map(transpose).collect();
        let minv_st = stiffness_t.iter().map(|st| matmul(&inv_mass, st)).collect();

        Self {
            mass,
            inv_mass,
            diff,
            stiffness,
            stiffness_t,
            minv_st,
            lift: lift_matrices(ldis),
        }
    }

    pub fn node_count(&self) -> usize {
        self.mass.nrows()
    }
}
