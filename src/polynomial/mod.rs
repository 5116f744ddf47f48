//! Polynomial evaluation and 1-D node generation.
//!
//! This module provides:
//! - Normalized Jacobi polynomials and their derivatives
//! - Gauss-Lobatto-Legendre points
//! - The 1-D warp function used by the warp-and-blend simplex nodes

mod jacobi;
mod lobatto;
mod warp;

pub use jacobi::{grad_jacobi, jacobi, legendre_and_derivative, legendre_normalized_with_derivative};
pub use lobatto::gauss_lobatto_nodes;
pub use warp::Warp;
