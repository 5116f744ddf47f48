//! DG operators: reference matrices and element-local kernels.
//!
//! This module provides:
//! - the per-group matrix cache (`LocalMatrices`): mass, inverse mass,
//!   differentiation, stiffness and weak-derivative matrices
//! - LIFT matrices mapping face values into the volume
//! - dense matrix-vector kernels applied per element

pub mod kernels;
mod lift;
mod local_matrices;

pub use kernels::{apply, apply_add, apply_transpose, mat_vec};
pub use lift::{lift_matrices, lift_matrix};
pub use local_matrices::LocalMatrices;
