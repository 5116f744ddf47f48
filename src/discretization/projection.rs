//! Projection between discretizations of the same elements.
//!
//! Per group the nodal values are taken to modal coefficients with the
//! source V^{-1}, modes are injected or restricted by identifier, and the
//! target V maps back to nodal values.

use super::Discretization;
use crate::basis::matmul;
use crate::error::{DiscretizationError, Result};
use crate::field::FieldArray;
use crate::operators::apply;
use faer::Mat;

/// Nodal projection from one discretization onto another.
#[derive(Debug)]
pub struct Projector<'a> {
    from: &'a Discretization,
    to: &'a Discretization,
    /// Per-group interpolation matrix, target nodes × source nodes.
    matrices: Vec<Mat<f64>>,
}

impl<'a> Projector<'a> {
    pub fn new(from: &'a Discretization, to: &'a Discretization) -> Result<Self> {
        if from.element_groups.len() != to.element_groups.len() {
            return Err(DiscretizationError::ProjectionMismatch(format!(
                "{} groups vs {} groups",
                from.element_groups.len(),
                to.element_groups.len()
            )));
        }

        let mut matrices = Vec::with_capacity(from.element_groups.len());
        for (i, (fg, tg)) in from.element_groups.iter().zip(&to.element_groups).enumerate() {
            if fg.members != tg.members {
                return Err(DiscretizationError::ProjectionMismatch(format!(
                    "member elements of group {} differ",
                    i
                )));
            }

            let from_ids = fg.ldis.mode_identifiers();
            let to_ids = tg.ldis.mode_identifiers();
            let mut selection = Mat::zeros(to_ids.len(), from_ids.len());
            for (t, tid) in to_ids.iter().enumerate() {
                if let Some(f) = from_ids.iter().position(|fid| fid == tid) {
                    selection[(t, f)] = 1.0;
                }
            }

            let modal = matmul(&selection, &fg.ldis.vandermonde().v_inv);
            matrices.push(matmul(&tg.ldis.vandermonde().v, &modal));
        }

        Ok(Self { from, to, matrices })
    }

    pub fn project(&self, field: &FieldArray<f64>) -> Result<FieldArray<f64>> {
        if field.len() != self.from.node_count() {
            return Err(DiscretizationError::shape_mismatch(
                format!("field on {} nodes", self.from.node_count()),
                field.describe(),
            ));
        }

        let mut out = FieldArray::zeros(field.shape(), self.to.node_count());
        for c in 0..field.component_count() {
            let src = field.component(c);
            let dst = out.component_mut(c);
            for ((fg, tg), imat) in self
                .from
                .element_groups
                .iter()
                .zip(&self.to.element_groups)
                .zip(&self.matrices)
            {
                for (fr, tr) in fg.ranges.iter().zip(tg.ranges.iter()) {
                    apply(imat, &src[fr], &mut dst[tr]);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{make_rect_mesh, make_uniform_interval_mesh};
    use std::sync::Arc;

    #[test]
    fn test_identity_projection() {
        let mesh = Arc::new(make_rect_mesh([0.0, 0.0], [1.0, 1.0], [2, 2], [false; 2]).unwrap());
        let a = Discretization::builder(mesh.clone()).order(3).build().unwrap();
        let b = Discretization::builder(mesh).order(3).build().unwrap();
        let u = a.interpolate_volume_function(|x, _| (3.0 * x[0]).sin() * x[1]);
        let projected = Projector::new(&a, &b).unwrap().project(&u).unwrap();
        for (p, q) in projected.data().iter().zip(u.data()) {
            assert!((p - q).abs() < 1e-12);
        }
    }

    #[test]
    fn test_projection_preserves_low_order_polynomials() {
        let mesh = Arc::new(make_uniform_interval_mesh(0.0, 2.0, 3, false).unwrap());
        let coarse = Discretization::builder(mesh.clone()).order(2).build().unwrap();
        let fine = Discretization::builder(mesh).order(5).build().unwrap();
        let f = |x: &[f64]| 1.0 - x[0] + 0.5 * x[0] * x[0];

        let up = Projector::new(&coarse, &fine)
            .unwrap()
            .project(&coarse.interpolate_volume_function(|x, _| f(x)))
            .unwrap();
        let expected = fine.interpolate_volume_function(|x, _| f(x));
        for (p, q) in up.data().iter().zip(expected.data()) {
            assert!((p - q).abs() < 1e-11);
        }

        let down = Projector::new(&fine, &coarse).unwrap().project(&expected).unwrap();
        let expected = coarse.interpolate_volume_function(|x, _| f(x));
        for (p, q) in down.data().iter().zip(expected.data()) {
            assert!((p - q).abs() < 1e-11);
        }
    }

    #[test]
    fn test_projection_between_meshes_rejected() {
        let a = Discretization::builder(make_uniform_interval_mesh(0.0, 1.0, 3, false).unwrap())
            .order(1)
            .build()
            .unwrap();
        let b = Discretization::builder(make_uniform_interval_mesh(0.0, 1.0, 4, false).unwrap())
            .order(1)
            .build()
            .unwrap();
        assert!(matches!(
            Projector::new(&a, &b).unwrap_err(),
            DiscretizationError::ProjectionMismatch(_)
        ));
    }
}
