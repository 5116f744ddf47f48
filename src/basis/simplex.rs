//! Orthonormal polynomial bases on the unit simplices.
//!
//! The unit simplices are
//! - interval: [-1, 1]
//! - triangle: vertices (-1,-1), (1,-1), (-1,1)
//! - tetrahedron: vertices (-1,-1,-1), (1,-1,-1), (-1,1,-1), (-1,-1,1)
//!
//! A mode is identified by a tuple of non-negative integers (i, j, k) with
//! i + j + k <= N. The basis is the collapsed-coordinate (Dubiner) basis
//!
//! φ_ij(r,s)    = √2 P_i(a) P_j^{(2i+1,0)}(b) (1-b)^i
//! φ_ijk(r,s,t) = 2√2 P_i(a) P_j^{(2i+1,0)}(b) (1-b)^i P_k^{(2i+2j+2,0)}(c) (1-c)^{i+j}
//!
//! with P normalized Jacobi polynomials. Both are orthonormal on their
//! unit simplex.

use crate::polynomial::{grad_jacobi, jacobi};

const COLLAPSE_TOL: f64 = 1e-12;

/// Map triangle coordinates (r, s) to the collapsed square (a, b).
fn rs_to_ab(r: f64, s: f64) -> (f64, f64) {
    let a = if (1.0 - s).abs() > COLLAPSE_TOL {
        2.0 * (1.0 + r) / (1.0 - s) - 1.0
    } else {
        -1.0
    };
    (a, s)
}

/// Map tetrahedron coordinates (r, s, t) to the collapsed cube (a, b, c).
fn rst_to_abc(r: f64, s: f64, t: f64) -> (f64, f64, f64) {
    let a = if (s + t).abs() > COLLAPSE_TOL {
        2.0 * (1.0 + r) / (-s - t) - 1.0
    } else {
        -1.0
    };
    let b = if (1.0 - t).abs() > COLLAPSE_TOL {
        2.0 * (1.0 + s) / (1.0 - t) - 1.0
    } else {
        -1.0
    };
    (a, b, t)
}

/// Evaluate the orthonormal basis function with identifier `mode` at `point`.
///
/// `mode.len()` and `point.len()` are the simplex dimension (1, 2 or 3).
///
/// # Panics
///
/// Panics if the two lengths differ or lie outside 1..=3.
pub fn simplex_basis(mode: &[usize], point: &[f64]) -> f64 {
    match (mode, point) {
        (&[i], &[r]) => jacobi(0, 0, i, r),
        (&[i, j], &[r, s]) => {
            let (a, b) = rs_to_ab(r, s);
            2f64.sqrt() * jacobi(0, 0, i, a) * jacobi(2 * i + 1, 0, j, b) * (1.0 - b).powi(i as i32)
        }
        (&[i, j, k], &[r, s, t]) => {
            let (a, b, c) = rst_to_abc(r, s, t);
            2.0 * 2f64.sqrt()
                * jacobi(0, 0, i, a)
                * jacobi(2 * i + 1, 0, j, b)
                * (1.0 - b).powi(i as i32)
                * jacobi(2 * (i + j) + 2, 0, k, c)
                * (1.0 - c).powi((i + j) as i32)
        }
        _ => panic!(
            "simplex basis needs matching mode/point dimension in 1..=3, got {} and {}",
            mode.len(),
            point.len()
        ),
    }
}

/// Gradient of the orthonormal basis function with respect to the unit
/// coordinates.
///
/// # Panics
///
/// Panics under the same conditions as [`simplex_basis`].
pub fn simplex_basis_gradient(mode: &[usize], point: &[f64]) -> Vec<f64> {
    match (mode, point) {
        (&[i], &[r]) => vec![grad_jacobi(0, 0, i, r)],
        (&[i, j], &[r, s]) => {
            let (a, b) = rs_to_ab(r, s);
            let fa = jacobi(0, 0, i, a);
            let dfa = grad_jacobi(0, 0, i, a);
            let gb = jacobi(2 * i + 1, 0, j, b);
            let dgb = grad_jacobi(2 * i + 1, 0, j, b);
            let half_1mb = 0.5 * (1.0 - b);

            let mut dr = dfa * gb;
            let mut ds = dfa * gb * 0.5 * (1.0 + a);
            if i > 0 {
                dr *= half_1mb.powi(i as i32 - 1);
                ds *= half_1mb.powi(i as i32 - 1);
            }
            let mut tmp = dgb * half_1mb.powi(i as i32);
            if i > 0 {
                tmp -= 0.5 * i as f64 * gb * half_1mb.powi(i as i32 - 1);
            }
            ds += fa * tmp;

            let scale = 2f64.powf(i as f64 + 0.5);
            vec![scale * dr, scale * ds]
        }
        (&[i, j, k], &[r, s, t]) => {
            let (a, b, c) = rst_to_abc(r, s, t);
            let fa = jacobi(0, 0, i, a);
            let dfa = grad_jacobi(0, 0, i, a);
            let gb = jacobi(2 * i + 1, 0, j, b);
            let dgb = grad_jacobi(2 * i + 1, 0, j, b);
            let hc = jacobi(2 * (i + j) + 2, 0, k, c);
            let dhc = grad_jacobi(2 * (i + j) + 2, 0, k, c);
            let half_1mb = 0.5 * (1.0 - b);
            let half_1mc = 0.5 * (1.0 - c);
            let ij = (i + j) as i32;

            let mut dr = dfa * gb * hc;
            if i > 0 {
                dr *= half_1mb.powi(i as i32 - 1);
            }
            if ij > 0 {
                dr *= half_1mc.powi(ij - 1);
            }

            let mut ds = 0.5 * (1.0 + a) * dr;
            let mut tmp = dgb * half_1mb.powi(i as i32);
            if i > 0 {
                tmp -= 0.5 * i as f64 * gb * half_1mb.powi(i as i32 - 1);
            }
            if ij > 0 {
                tmp *= half_1mc.powi(ij - 1);
            }
            let tmp = fa * tmp * hc;
            ds += tmp;

            let mut dt = 0.5 * (1.0 + a) * dr + 0.5 * (1.0 + b) * tmp;
            let mut tmp = dhc * half_1mc.powi(ij);
            if ij > 0 {
                tmp -= 0.5 * ij as f64 * hc * half_1mc.powi(ij - 1);
            }
            dt += fa * gb * tmp * half_1mb.powi(i as i32);

            let scale = 2f64.powf((2 * i + j) as f64 + 1.5);
            vec![scale * dr, scale * ds, scale * dt]
        }
        _ => panic!(
            "simplex basis needs matching mode/point dimension in 1..=3, got {} and {}",
            mode.len(),
            point.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finite_difference(mode: &[usize], point: &[f64]) -> Vec<f64> {
        let eps = 1e-6;
        (0..point.len())
            .map(|d| {
                let mut plus = point.to_vec();
                let mut minus = point.to_vec();
                plus[d] += eps;
                minus[d] -= eps;
                (simplex_basis(mode, &plus) - simplex_basis(mode, &minus)) / (2.0 * eps)
            })
            .collect()
    }

    #[test]
    fn test_constant_mode_normalization() {
        // unit triangle has area 2, unit tetrahedron volume 4/3
        assert!((simplex_basis(&[0], &[0.2]) - (0.5f64).sqrt()).abs() < 1e-14);
        assert!((simplex_basis(&[0, 0], &[-0.3, 0.1]) - (0.5f64).sqrt()).abs() < 1e-14);
        assert!((simplex_basis(&[0, 0, 0], &[-0.5, -0.2, -0.1]) - (0.75f64).sqrt()).abs() < 1e-14);
    }

    #[test]
    fn test_triangle_gradient_matches_finite_difference() {
        let point = [-0.4, -0.1];
        for i in 0..4 {
            for j in 0..(4 - i) {
                let exact = simplex_basis_gradient(&[i, j], &point);
                let fd = finite_difference(&[i, j], &point);
                for d in 0..2 {
                    assert!(
                        (exact[d] - fd[d]).abs() < 1e-6,
                        "mode ({}, {}) axis {}: {} vs {}",
                        i,
                        j,
                        d,
                        exact[d],
                        fd[d]
                    );
                }
            }
        }
    }

    #[test]
    fn test_tetrahedron_gradient_matches_finite_difference() {
        let point = [-0.6, -0.3, -0.4];
        for i in 0..3 {
            for j in 0..(3 - i) {
                for k in 0..(3 - i - j) {
                    let exact = simplex_basis_gradient(&[i, j, k], &point);
                    let fd = finite_difference(&[i, j, k], &point);
                    for d in 0..3 {
                        assert!(
                            (exact[d] - fd[d]).abs() < 1e-6,
                            "mode ({}, {}, {}) axis {}: {} vs {}",
                            i,
                            j,
                            k,
                            d,
                            exact[d],
                            fd[d]
                        );
                    }
                }
            }
        }
    }
}
