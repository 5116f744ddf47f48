//! Polynomial basis representations on the unit simplices.
//!
//! This module provides:
//! - Orthonormal Dubiner bases for intervals, triangles and tetrahedra
//! - Vandermonde matrices for nodal-modal transformations
//! - Small dense helpers (inverse, product, transpose) on `faer::Mat`

mod simplex;
mod vandermonde;

pub use simplex::{simplex_basis, simplex_basis_gradient};
pub use vandermonde::{Vandermonde, invert, matmul, transpose, vandermonde};
