//! Scalar reductions over volume fields.
//!
//! Each reduction is a small template over the fields `arg_0`, `arg_1`,
//! compiled once per operand shape. Sums and maxima run over all nodes and
//! all components.

use super::Discretization;
use super::cache::ReductionKind;
use crate::error::{DiscretizationError, Result};
use crate::executor::{OperatorArgs, Value};
use crate::field::FieldArray;
use crate::optemplate::{Expr, Program, lower, normalize};
use ordered_float::OrderedFloat;
use std::sync::Arc;

fn arg(i: usize) -> String {
    format!("arg_{}", i)
}

fn reduction_expr(kind: ReductionKind) -> Expr {
    let a = Expr::field(arg(0));
    match kind {
        ReductionKind::Integral => Expr::mass(a).nodal_sum(),
        ReductionKind::InnerProduct => (a * Expr::mass(Expr::field(arg(1)))).nodal_sum(),
        ReductionKind::Norm(p) if p.0.is_infinite() => a.abs().nodal_max(),
        ReductionKind::Norm(p) if p.0 == 2.0 => (a.clone() * Expr::mass(a))
            .nodal_sum()
            .pow(Expr::constant(0.5)),
        ReductionKind::Norm(p) => Expr::mass(a.abs().pow(Expr::constant(p.0)))
            .nodal_sum()
            .pow(Expr::constant(1.0 / p.0)),
    }
}

impl Discretization {
    fn reduction_program(&self, kind: ReductionKind, operands: &[&FieldArray<f64>]) -> Result<Arc<Program>> {
        let shapes = operands.iter().map(|f| f.shape().to_vec()).collect();
        self.cache.reduction(kind, shapes, || {
            let dims = self.dimensions();
            let normalized = normalize(&[reduction_expr(kind)], &self.config, dims)?;
            self.cache
                .program(normalized.clone(), || lower(&normalized, &self.config, dims))
        })
    }

    fn reduce(&self, kind: ReductionKind, operands: &[&FieldArray<f64>]) -> Result<f64> {
        let program = self.reduction_program(kind, operands)?;
        let args = operands
            .iter()
            .enumerate()
            .fold(OperatorArgs::new(), |args, (i, f)| args.field(arg(i), f));
        let value = self.backend.execute(self, &program, &args)?;
        match value.first() {
            Some(Value::Scalar(v)) => Ok(*v),
            _ => Err(DiscretizationError::shape_mismatch("scalar result", "field")),
        }
    }

    /// ∫ u dx, summed over components.
    pub fn integral(&self, u: &FieldArray<f64>) -> Result<f64> {
        self.reduce(ReductionKind::Integral, &[u])
    }

    /// Lp norm for `p >= 1` or `p = ∞`.
    pub fn norm(&self, u: &FieldArray<f64>, p: f64) -> Result<f64> {
        if p.is_nan() || p < 1.0 {
            return Err(DiscretizationError::InvalidConfig(format!("norm order {} below 1", p)));
        }
        self.reduce(ReductionKind::Norm(OrderedFloat(p)), &[u])
    }

    /// ∫ a · b dx.
    pub fn inner_product(&self, a: &FieldArray<f64>, b: &FieldArray<f64>) -> Result<f64> {
        if !a.same_layout(b) {
            return Err(DiscretizationError::shape_mismatch(a.describe(), b.describe()));
        }
        self.reduce(ReductionKind::InnerProduct, &[a, b])
    }
}

#[cfg(test)]
mod tests {
    use crate::discretization::Discretization;
    use crate::error::DiscretizationError;
    use crate::field::FieldArray;
    use crate::mesh::make_rect_mesh;

    fn square() -> Discretization {
        let mesh = make_rect_mesh([0.0, 0.0], [2.0, 1.0], [2, 2], [false; 2]).unwrap();
        Discretization::builder(mesh).order(3).build().unwrap()
    }

    #[test]
    fn test_integral_of_polynomial() {
        let discr = square();
        let u = discr.interpolate_volume_function(|x, _| x[0] * x[1]);
        // ∫_0^2 ∫_0^1 x y = 2 * 0.5
        assert!((discr.integral(&u).unwrap() - 1.0).abs() < 1e-12);
        assert!((discr.integral(&discr.ones_on_volume()).unwrap() - discr.mesh_volume()).abs() < 1e-12);
    }

    #[test]
    fn test_norms() {
        let discr = square();
        let u = discr.interpolate_volume_function(|x, _| x[1] - 0.5);
        // ∫ (y - 1/2)^2 = 2 / 12
        let l2 = discr.norm(&u, 2.0).unwrap();
        assert!((l2 - (2.0f64 / 12.0).sqrt()).abs() < 1e-12);
        assert!((discr.norm(&u, f64::INFINITY).unwrap() - 0.5).abs() < 1e-14);

        let c = FieldArray::from_values(vec![3.0; discr.node_count()]);
        // ∫ 3 = 6, L1 norm
        assert!((discr.norm(&c, 1.0).unwrap() - 6.0).abs() < 1e-12);
        assert!(matches!(discr.norm(&c, 0.5), Err(DiscretizationError::InvalidConfig(_))));
    }

    #[test]
    fn test_inner_product_and_shape_mismatch() {
        let discr = square();
        let a = discr.interpolate_volume_function(|x, _| x[0]);
        let b = discr.ones_on_volume();
        // ∫ x = 2
        assert!((discr.inner_product(&a, &b).unwrap() - 2.0).abs() < 1e-12);

        let v = discr.volume_zeros::<f64>(&[2]);
        assert!(matches!(
            discr.inner_product(&a, &v),
            Err(DiscretizationError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_reductions_compiled_once_per_shape() {
        let discr = square();
        let u = discr.ones_on_volume();
        let v = discr.interpolate_volume_function(|x, _| x[0]);
        discr.integral(&u).unwrap();
        let count = discr.compile_count();
        discr.integral(&v).unwrap();
        assert_eq!(discr.compile_count(), count);

        let w = discr.volume_zeros::<f64>(&[3]);
        assert_eq!(discr.integral(&w).unwrap(), 0.0);
        assert_eq!(discr.compile_count(), count);
    }
}
