//! Gauss-Lobatto-Legendre points.
//!
//! The N+1 GLL points are the roots of (1-x²) P'_N(x). They are the 1-D nodal
//! set and the edge distribution the warp-and-blend construction aims for.

use super::jacobi::legendre_and_derivative;
use std::f64::consts::PI;

/// Gauss-Lobatto-Legendre points for polynomial order N, ascending in [-1, 1].
///
/// Newton iteration on (1-x²) P'_N starting from Chebyshev-Lobatto points.
/// Since d/dx[(1-x²) P'_N] = -N(N+1) P_N, the update is
/// x ← x + (1-x²) P'_N / (N(N+1) P_N).
pub fn gauss_lobatto_nodes(order: usize) -> Vec<f64> {
    match order {
        0 => return vec![0.0],
        1 => return vec![-1.0, 1.0],
        _ => {}
    }

    let n = order;
    let nn1 = (n * (n + 1)) as f64;
    let mut nodes: Vec<f64> = (0..=n).map(|j| -(PI * j as f64 / n as f64).cos()).collect();
    nodes[0] = -1.0;
    nodes[n] = 1.0;

    for x in nodes.iter_mut().take(n).skip(1) {
        for _ in 0..100 {
            let (p, dp) = legendre_and_derivative(n, *x);
            let update = (1.0 - *x * *x) * dp / (nn1 * p);
            *x += update;
            if update.abs() < 1e-15 {
                break;
            }
        }
    }

    // enforce exact symmetry about the origin
    for j in 0..=n / 2 {
        let sym = 0.5 * (nodes[n - j] - nodes[j]);
        nodes[j] = -sym;
        nodes[n - j] = sym;
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nodes_endpoints_and_count() {
        for order in 1..=8 {
            let nodes = gauss_lobatto_nodes(order);
            assert_eq!(nodes.len(), order + 1);
            assert_eq!(nodes[0], -1.0);
            assert_eq!(nodes[order], 1.0);
        }
    }

    #[test]
    fn test_nodes_symmetric_and_sorted() {
        for order in 2..=8 {
            let nodes = gauss_lobatto_nodes(order);
            for i in 0..nodes.len() {
                assert_eq!(nodes[i], -nodes[order - i], "order {} node {}", order, i);
            }
            assert!(nodes.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_interior_nodes_are_roots_of_derivative() {
        for order in 2..=7 {
            let nodes = gauss_lobatto_nodes(order);
            for &x in &nodes[1..order] {
                let (_, dp) = legendre_and_derivative(order, x);
                assert!(dp.abs() < 1e-11, "P'_{}({}) = {}", order, x, dp);
            }
        }
    }
}
