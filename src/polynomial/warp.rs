//! 1-D warp function for the warp-and-blend simplex node sets.
//!
//! The warp w(r) is the Lagrange interpolant, through N+1 equidistant points,
//! of the displacement from equidistant to Gauss-Lobatto-Legendre positions,
//! scaled by 1/(1-r²) so that blending with edge bubbles reproduces the GLL
//! distribution on every edge.

use super::lobatto::gauss_lobatto_nodes;

/// Precomputed warp for a fixed order.
#[derive(Debug, Clone)]
pub struct Warp {
    equidistant: Vec<f64>,
    displacement: Vec<f64>,
}

impl Warp {
    pub fn new(order: usize) -> Self {
        let gll = gauss_lobatto_nodes(order);
        let equidistant: Vec<f64> = if order == 0 {
            vec![0.0]
        } else {
            (0..=order)
                .map(|i| -1.0 + 2.0 * i as f64 / order as f64)
                .collect()
        };
        let displacement = gll
            .iter()
            .zip(&equidistant)
            .map(|(g, e)| g - e)
            .collect();
        Self {
            equidistant,
            displacement,
        }
    }

    /// Evaluate the scaled warp at r. Zero at (and beyond) the interval ends.
    pub fn eval(&self, r: f64) -> f64 {
        if r.abs() >= 1.0 - 1e-10 {
            return 0.0;
        }

        let mut warp = 0.0;
        for (i, (&xi, &di)) in self.equidistant.iter().zip(&self.displacement).enumerate() {
            let mut ell = 1.0;
            for (j, &xj) in self.equidistant.iter().enumerate() {
                if i != j {
                    ell *= (r - xj) / (xi - xj);
                }
            }
            warp += ell * di;
        }

        warp / (1.0 - r * r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warp_vanishes_for_linear_order() {
        let warp = Warp::new(1);
        for &r in &[-0.5, 0.0, 0.7] {
            assert!(warp.eval(r).abs() < 1e-15);
        }
    }

    #[test]
    fn test_warp_moves_equidistant_onto_gll() {
        for order in 2..=6 {
            let warp = Warp::new(order);
            let gll = gauss_lobatto_nodes(order);
            for i in 1..order {
                let r = -1.0 + 2.0 * i as f64 / order as f64;
                let moved = r + warp.eval(r) * (1.0 - r * r);
                assert!(
                    (moved - gll[i]).abs() < 1e-13,
                    "order {}: {} vs {}",
                    order,
                    moved,
                    gll[i]
                );
            }
        }
    }

    #[test]
    fn test_warp_is_odd() {
        let warp = Warp::new(5);
        for &r in &[0.1, 0.45, 0.8] {
            assert!((warp.eval(r) + warp.eval(-r)).abs() < 1e-13);
        }
    }
}
