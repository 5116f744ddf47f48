//! Modal filtering.
//!
//! Per group the nodal values are taken to modal coefficients with V^{-1},
//! each mode is scaled by a response σ(mode), and V maps back:
//! `F = V diag(σ) V^{-1}`.

use super::Discretization;
use crate::basis::matmul;
use crate::error::{DiscretizationError, Result};
use crate::field::FieldArray;
use crate::operators::apply;
use faer::Mat;

/// Amplification of one mode, given its identifier and the local order.
pub trait ModeResponse {
    fn response(&self, mode: &[usize], order: usize) -> f64;
}

impl<F: Fn(&[usize], usize) -> f64> ModeResponse for F {
    fn response(&self, mode: &[usize], order: usize) -> f64 {
        self(mode, order)
    }
}

/// `σ = exp(-α η^s)` with `η = |mode| / N`.
///
/// The constant mode is never damped, the highest modes are scaled by
/// `min_amplification`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialFilterResponse {
    alpha: f64,
    order: i32,
}

impl ExponentialFilterResponse {
    pub fn new(min_amplification: f64, order: i32) -> Result<Self> {
        if !(min_amplification > 0.0 && min_amplification <= 1.0) {
            return Err(DiscretizationError::InvalidConfig(format!(
                "filter min_amplification must lie in (0, 1], got {}",
                min_amplification
            )));
        }
        Ok(Self {
            alpha: -min_amplification.ln(),
            order,
        })
    }
}

impl Default for ExponentialFilterResponse {
    fn default() -> Self {
        Self {
            alpha: -(0.1f64).ln(),
            order: 6,
        }
    }
}

impl ModeResponse for ExponentialFilterResponse {
    fn response(&self, mode: &[usize], order: usize) -> f64 {
        if order == 0 {
            return 1.0;
        }
        let eta = mode.iter().sum::<usize>() as f64 / order as f64;
        (-self.alpha * eta.powi(self.order)).exp()
    }
}

/// Modal filter bound to one discretization.
#[derive(Debug)]
pub struct Filter<'a> {
    discr: &'a Discretization,
    /// Per-group filter matrix.
    matrices: Vec<Mat<f64>>,
}

impl<'a> Filter<'a> {
    pub fn new(discr: &'a Discretization, response: &impl ModeResponse) -> Self {
        let matrices = discr
            .element_groups
            .iter()
            .map(|group| {
                let ldis = group.ldis.as_ref();
                let vdm = ldis.vandermonde();
                let mut scaled = vdm.v_inv.clone();
                for (m, mode) in ldis.mode_identifiers().iter().enumerate() {
                    let sigma = response.response(mode, ldis.order());
                    for j in 0..scaled.ncols() {
                        scaled[(m, j)] *= sigma;
                    }
                }
                matmul(&vdm.v, &scaled)
            })
            .collect();
        Self { discr, matrices }
    }

    pub fn apply(&self, field: &FieldArray<f64>) -> Result<FieldArray<f64>> {
        if field.len() != self.discr.node_count() {
            return Err(DiscretizationError::shape_mismatch(
                format!("volume field on {} nodes", self.discr.node_count()),
                field.describe(),
            ));
        }

        let mut out = FieldArray::zeros(field.shape(), field.len());
        for c in 0..field.component_count() {
            let src = field.component(c);
            let dst = out.component_mut(c);
            for (group, fmat) in self.discr.element_groups.iter().zip(&self.matrices) {
                for range in group.ranges.iter() {
                    apply(fmat, &src[range.clone()], &mut dst[range]);
                }
            }
        }
        Ok(out)
    }
}
