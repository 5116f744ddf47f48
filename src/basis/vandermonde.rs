//! Generalized Vandermonde matrices on the unit simplices.
//!
//! The Vandermonde matrix connects nodal and modal representations:
//! - V[i,j] = φ_j(r_i) where φ_j is the j-th basis function, r_i the i-th node
//! - nodal_values = V * modal_coeffs
//! - modal_coeffs = V^{-1} * nodal_values
//!
//! With an orthonormal basis the modal mass matrix is the identity, so the
//! nodal mass matrix is (V V^T)^{-1}.

use super::simplex::{simplex_basis, simplex_basis_gradient};
use faer::{Mat, linalg::solvers::Solve};

/// Vandermonde matrix, its inverse and the gradient Vandermonde matrices.
#[derive(Clone, Debug)]
pub struct Vandermonde {
    /// V[i,j] = φ_j(r_i)
    pub v: Mat<f64>,
    /// V^{-1}
    pub v_inv: Mat<f64>,
    /// grad[k][i,j] = ∂φ_j/∂r_k (r_i)
    pub grad: Vec<Mat<f64>>,
}

impl Vandermonde {
    /// Build from mode identifiers and unit-coordinate points.
    ///
    /// The number of points must equal the number of modes.
    pub fn new(modes: &[Vec<usize>], points: &[Vec<f64>]) -> Self {
        assert_eq!(modes.len(), points.len(), "square Vandermonde needs one point per mode");
        let v = vandermonde(modes, points);
        let dims = points.first().map_or(0, Vec::len);

        let mut grad = vec![Mat::zeros(points.len(), modes.len()); dims];
        for (i, point) in points.iter().enumerate() {
            for (j, mode) in modes.iter().enumerate() {
                let g = simplex_basis_gradient(mode, point);
                for (k, gk) in g.into_iter().enumerate() {
                    grad[k][(i, j)] = gk;
                }
            }
        }

        let v_inv = invert(&v);
        Self { v, v_inv, grad }
    }
}

/// Rectangular Vandermonde matrix: one row per point, one column per mode.
pub fn vandermonde(modes: &[Vec<usize>], points: &[Vec<f64>]) -> Mat<f64> {
    let mut v = Mat::zeros(points.len(), modes.len());
    for (i, point) in points.iter().enumerate() {
        for (j, mode) in modes.iter().enumerate() {
            v[(i, j)] = simplex_basis(mode, point);
        }
    }
    v
}

/// Inverse of a square, nonsingular matrix via full-pivot LU.
pub fn invert(m: &Mat<f64>) -> Mat<f64> {
    let n = m.nrows();
    let lu = m.as_ref().full_piv_lu();
    let mut inv = Mat::zeros(n, n);

    // Solve M * X = I column by column
    for j in 0..n {
        let mut rhs = Mat::zeros(n, 1);
        rhs[(j, 0)] = 1.0;
        let col = lu.solve(&rhs);
        for i in 0..n {
            inv[(i, j)] = col[(i, 0)];
        }
    }
    inv
}

/// Dense product A * B.
pub fn matmul(a: &Mat<f64>, b: &Mat<f64>) -> Mat<f64> {
    assert_eq!(a.ncols(), b.nrows(), "inner dimensions must agree");
    let mut c = Mat::zeros(a.nrows(), b.ncols());
    for i in 0..a.nrows() {
        for k in 0..a.ncols() {
            let aik = a[(i, k)];
            if aik == 0.0 {
                continue;
            }
            for j in 0..b.ncols() {
                c[(i, j)] += aik * b[(k, j)];
            }
        }
    }
    c
}

/// Transpose of A.
pub fn transpose(a: &Mat<f64>) -> Mat<f64> {
    let mut t = Mat::zeros(a.ncols(), a.nrows());
    for i in 0..a.nrows() {
        for j in 0..a.ncols() {
            t[(j, i)] = a[(i, j)];
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::gauss_lobatto_nodes;

    fn interval_modes(order: usize) -> Vec<Vec<usize>> {
        (0..=order).map(|i| vec![i]).collect()
    }

    #[test]
    fn test_inverse_is_inverse() {
        let order = 4;
        let points: Vec<Vec<f64>> = gauss_lobatto_nodes(order).into_iter().map(|x| vec![x]).collect();
        let vdm = Vandermonde::new(&interval_modes(order), &points);
        let product = matmul(&vdm.v, &vdm.v_inv);
        for i in 0..=order {
            for j in 0..=order {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product[(i, j)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_gll_mass_matrix_integrates_constants() {
        // 1^T M 1 = length of the reference interval
        let order = 3;
        let points: Vec<Vec<f64>> = gauss_lobatto_nodes(order).into_iter().map(|x| vec![x]).collect();
        let vdm = Vandermonde::new(&interval_modes(order), &points);
        let mass = invert(&matmul(&vdm.v, &transpose(&vdm.v)));
        let mut total = 0.0;
        for i in 0..=order {
            for j in 0..=order {
                total += mass[(i, j)];
            }
        }
        assert!((total - 2.0).abs() < 1e-12, "total = {}", total);
    }

    #[test]
    fn test_transpose_shape() {
        let a = Mat::<f64>::zeros(2, 5);
        let t = transpose(&a);
        assert_eq!((t.nrows(), t.ncols()), (5, 2));
    }
}
