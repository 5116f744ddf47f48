//! Evaluation of nodal fields at arbitrary points.

use super::Discretization;
use crate::error::{DiscretizationError, Result};
use crate::field::{FieldArray, VectorKind};
use std::ops::Range;

/// Barycentric slack when locating the containing element.
const CONTAINMENT_THRESHOLD: f64 = 1e-10;

/// Interpolation weights of one point within its element.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEvaluator {
    pub element: usize,
    /// Node range of the element.
    pub range: Range<usize>,
    /// `value = Σ_j coefficients[j] u[range.start + j]`
    pub coefficients: Vec<f64>,
    node_count: usize,
}

impl PointEvaluator {
    /// Interpolated value of every component of `field`.
    pub fn evaluate(&self, field: &FieldArray<f64>) -> Result<Vec<f64>> {
        if field.len() != self.node_count {
            return Err(DiscretizationError::shape_mismatch(
                format!("volume field on {} nodes", self.node_count),
                field.describe(),
            ));
        }
        Ok(field
            .components()
            .map(|values| {
                self.coefficients
                    .iter()
                    .zip(&values[self.range.clone()])
                    .map(|(w, u)| w * u)
                    .sum()
            })
            .collect())
    }
}

impl Discretization {
    /// Evaluator for `point`; the first element containing it is used.
    pub fn get_point_evaluator(&self, point: &[f64]) -> Result<PointEvaluator> {
        if point.len() != self.dimensions() {
            return Err(DiscretizationError::shape_mismatch(
                format!("point with {} coordinates", self.dimensions()),
                format!("{:?}", point),
            ));
        }
        let el = self
            .mesh
            .elements
            .iter()
            .find(|el| el.contains_point(point, CONTAINMENT_THRESHOLD))
            .ok_or_else(|| DiscretizationError::PointNotFound(point.to_vec()))?;

        let ldis = self.find_el_discretization(el.id);
        let unit_point = el.inverse_map.apply(point);
        let phi = ldis.basis_values(&unit_point);
        let v_inv = &ldis.vandermonde().v_inv;
        let coefficients = (0..ldis.node_count())
            .map(|j| phi.iter().enumerate().map(|(m, p)| p * v_inv[(m, j)]).sum())
            .collect();

        Ok(PointEvaluator {
            element: el.id,
            range: self.find_el_range(el.id),
            coefficients,
            node_count: self.node_count(),
        })
    }

    /// Values of `field` interpolated at every node of `new_discr`.
    ///
    /// Every node of `new_discr` must lie inside this mesh.
    pub fn regrid_values(&self, field: &FieldArray<f64>, new_discr: &Discretization) -> Result<FieldArray<f64>> {
        if field.len() != self.node_count() {
            return Err(DiscretizationError::shape_mismatch(
                format!("volume field on {} nodes", self.node_count()),
                field.describe(),
            ));
        }
        if field.kind() != VectorKind::Host {
            return Err(DiscretizationError::KindConversion {
                from: field.kind().to_string(),
                to: VectorKind::Host.to_string(),
            });
        }

        let mut out = FieldArray::zeros(field.shape(), new_discr.node_count());
        for i in 0..new_discr.node_count() {
            let values = self.get_point_evaluator(new_discr.node(i))?.evaluate(field)?;
            for (c, value) in values.into_iter().enumerate() {
                out.component_mut(c)[i] = value;
            }
        }
        Ok(out)
    }
}
