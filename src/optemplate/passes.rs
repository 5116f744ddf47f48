//! Rewrite passes over operator templates.
//!
//! Run in order by the compiler:
//! 1. quadrature marker resolution
//! 2. downsample-of-upsample cancellation
//! 3. simplification into a normal form
//! 4. domain inference, which also validates the template

use super::expr::{Expr, FluxBinding, Operator};
use crate::config::DiscretizationConfig;
use crate::error::{DiscretizationError, Result};
use log::warn;
use ordered_float::OrderedFloat;
use std::convert::Infallible;
use std::fmt;

/// Where the values of an expression live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Domain {
    Scalar,
    /// Volume nodes.
    Volume,
    /// Nodes of a boundary tag.
    Boundary(String),
    /// Volume quadrature nodes of a quadrature tag.
    QuadratureVolume(String),
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Scalar => write!(f, "scalar"),
            Domain::Volume => write!(f, "volume"),
            Domain::Boundary(tag) => write!(f, "boundary[{}]", tag),
            Domain::QuadratureVolume(tag) => write!(f, "quadrature[{}]", tag),
        }
    }
}

fn map_children(expr: &Expr, mut f: impl FnMut(&Expr) -> Expr) -> Expr {
    match expr.try_map_children::<Infallible>(|c| Ok(f(c))) {
        Ok(e) => e,
        Err(never) => match never {},
    }
}

/// Check quadrature tags against the configuration.
///
/// Unknown tags are an error. Tags registered without a minimum degree are
/// nodal: their markers are removed and their fluxes evaluated on nodes.
pub fn resolve_quadrature(expr: &Expr, config: &DiscretizationConfig) -> Result<Expr> {
    match expr {
        Expr::Apply {
            op: op @ (Operator::QuadratureUpsample(tag) | Operator::QuadratureDownsample(tag)),
            operand,
        } => {
            let inner = resolve_quadrature(operand, config)?;
            match config.quadrature_degree(tag)? {
                Some(_) => Ok(Expr::apply(op.clone(), inner)),
                None => {
                    warn!("quadrature tag '{}' is nodal, dropping {}", tag, op);
                    Ok(inner)
                }
            }
        }
        Expr::Flux(_) => {
            let mut binding = match expr.try_map_children(|c| resolve_quadrature(c, config))? {
                Expr::Flux(binding) => binding,
                other => return Ok(other),
            };
            if let Some(tag) = binding.quadrature_tag.clone() {
                match config.quadrature_degree(&tag)? {
                    None => {
                        warn!("quadrature tag '{}' is nodal, evaluating flux on nodes", tag);
                        binding.quadrature_tag = None;
                    }
                    Some(_) if binding.boundary.is_some() => {
                        return Err(DiscretizationError::InvalidConfig(format!(
                            "boundary flux cannot use quadrature tag '{}'",
                            tag
                        )));
                    }
                    Some(_) => {}
                }
            }
            Ok(Expr::Flux(binding))
        }
        _ => expr.try_map_children(|c| resolve_quadrature(c, config)),
    }
}

/// Remove `Down[q](Up[q](x))` pairs.
pub fn cancel_quadrature_pairs(expr: &Expr) -> Expr {
    let expr = map_children(expr, cancel_quadrature_pairs);
    if let Expr::Apply {
        op: Operator::QuadratureDownsample(down),
        operand,
    } = &expr
    {
        if let Expr::Apply {
            op: Operator::QuadratureUpsample(up),
            operand: inner,
        } = operand.as_ref()
        {
            if up == down {
                return inner.as_ref().clone();
            }
        }
    }
    expr
}

fn as_constant(expr: &Expr) -> Option<f64> {
    match expr {
        Expr::Constant(c) => Some(c.0),
        _ => None,
    }
}

/// Flatten sums and products, fold constants and sort operands of
/// commutative nodes.
pub fn simplify(expr: &Expr) -> Expr {
    let expr = map_children(expr, simplify);
    match expr {
        Expr::Sum(terms) => {
            let mut flat = Vec::with_capacity(terms.len());
            let mut constant = 0.0;
            for term in terms {
                match term {
                    Expr::Sum(inner) => flat.extend(inner),
                    Expr::Constant(c) => constant += c.0,
                    other => flat.push(other),
                }
            }
            // nested sums were simplified already, so their constants are
            // folded into a single trailing term
            let (constants, mut rest): (Vec<Expr>, Vec<Expr>) =
                flat.into_iter().partition(|e| matches!(e, Expr::Constant(_)));
            constant += constants.iter().filter_map(as_constant).sum::<f64>();
            if constant != 0.0 || rest.is_empty() {
                rest.push(Expr::Constant(OrderedFloat(constant)));
            }
            rest.sort();
            if rest.len() == 1 { rest.remove(0) } else { Expr::Sum(rest) }
        }
        Expr::Product(factors) => {
            let mut flat = Vec::with_capacity(factors.len());
            let mut constant = 1.0;
            for factor in factors {
                match factor {
                    Expr::Product(inner) => {
                        for f in inner {
                            match as_constant(&f) {
                                Some(c) => constant *= c,
                                None => flat.push(f),
                            }
                        }
                    }
                    Expr::Constant(c) => constant *= c.0,
                    other => flat.push(other),
                }
            }
            if constant != 1.0 || flat.is_empty() {
                flat.push(Expr::Constant(OrderedFloat(constant)));
            }
            flat.sort();
            if flat.len() == 1 { flat.remove(0) } else { Expr::Product(flat) }
        }
        Expr::Power(base, exponent) => match (as_constant(&base), as_constant(&exponent)) {
            (Some(b), Some(e)) => Expr::constant(b.powf(e)),
            (_, Some(e)) if e == 1.0 => *base,
            _ => Expr::Power(base, exponent),
        },
        Expr::Abs(inner) => match as_constant(&inner) {
            Some(c) => Expr::constant(c.abs()),
            None => Expr::Abs(inner),
        },
        Expr::Max(a, b) => match (as_constant(&a), as_constant(&b)) {
            (Some(x), Some(y)) => Expr::constant(x.max(y)),
            _ if a == b => *a,
            _ => Expr::Max(a, b),
        },
        other => other,
    }
}

fn unify(a: &Domain, b: &Domain, context: &Expr) -> Result<Domain> {
    match (a, b) {
        (Domain::Scalar, other) | (other, Domain::Scalar) => Ok(other.clone()),
        (x, y) if x == y => Ok(x.clone()),
        (x, y) => Err(DiscretizationError::shape_mismatch(
            format!("matching domains in {}", context),
            format!("{} and {}", x, y),
        )),
    }
}

fn expect_domain(found: &Domain, expected: &Domain, context: &Expr) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(DiscretizationError::shape_mismatch(
            format!("{} operand in {}", expected, context),
            found.to_string(),
        ))
    }
}

fn check_axis(axis: usize, dims: usize, context: &Expr) -> Result<()> {
    if axis < dims {
        Ok(())
    } else {
        Err(DiscretizationError::InvalidConfig(format!(
            "axis {} out of range for dimension {} in {}",
            axis, dims, context
        )))
    }
}

fn check_flux(binding: &FluxBinding, dims: usize, context: &Expr) -> Result<()> {
    if let Some(i) = binding.flux.max_operand() {
        if i >= binding.operands.len() {
            return Err(DiscretizationError::InvalidConfig(format!(
                "flux references operand {} of {} in {}",
                i,
                binding.operands.len(),
                context
            )));
        }
    }
    if let Some(axis) = binding.flux.max_normal_axis() {
        check_axis(axis, dims, context)?;
    }
    if let Some(b) = &binding.boundary {
        if b.values.len() != binding.operands.len() {
            return Err(DiscretizationError::InvalidConfig(format!(
                "boundary flux on '{}' has {} values for {} operands",
                b.tag,
                b.values.len(),
                binding.operands.len()
            )));
        }
    }
    Ok(())
}

/// Domain of `expr` given the domains of its children (in
/// [`Expr::children`] order).
pub(crate) fn node_domain(expr: &Expr, children: &[Domain], dims: usize) -> Result<Domain> {
    match expr {
        Expr::Field(_) => Ok(Domain::Volume),
        Expr::BoundaryField { tag, .. } => Ok(Domain::Boundary(tag.clone())),
        Expr::ScalarParameter(_) | Expr::Constant(_) => Ok(Domain::Scalar),
        Expr::Sum(_) | Expr::Product(_) | Expr::Power(..) | Expr::Max(..) | Expr::Abs(_) => children
            .iter()
            .try_fold(Domain::Scalar, |acc, d| unify(&acc, d, expr)),
        Expr::NodalSum(_) | Expr::NodalMax(_) => Ok(Domain::Scalar),
        Expr::Apply { op, .. } => {
            let operand = &children[0];
            match op {
                Operator::Mass
                | Operator::InverseMass
                | Operator::Diff(_)
                | Operator::MInvST(_)
                | Operator::Stiffness(_)
                | Operator::StiffnessT(_) => {
                    if let Operator::Diff(axis)
                    | Operator::MInvST(axis)
                    | Operator::Stiffness(axis)
                    | Operator::StiffnessT(axis) = op
                    {
                        check_axis(*axis, dims, expr)?;
                    }
                    expect_domain(operand, &Domain::Volume, expr)?;
                    Ok(Domain::Volume)
                }
                Operator::Boundarize(tag) => {
                    expect_domain(operand, &Domain::Volume, expr)?;
                    Ok(Domain::Boundary(tag.clone()))
                }
                Operator::QuadratureUpsample(tag) => {
                    expect_domain(operand, &Domain::Volume, expr)?;
                    Ok(Domain::QuadratureVolume(tag.clone()))
                }
                Operator::QuadratureDownsample(tag) => {
                    expect_domain(operand, &Domain::QuadratureVolume(tag.clone()), expr)?;
                    Ok(Domain::Volume)
                }
            }
        }
        Expr::Flux(binding) => {
            check_flux(binding, dims, expr)?;
            let (operands, values) = children.split_at(binding.operands.len());
            for d in operands {
                expect_domain(d, &Domain::Volume, expr)?;
            }
            if let Some(b) = &binding.boundary {
                let boundary = Domain::Boundary(b.tag.clone());
                for d in values {
                    if *d != Domain::Scalar {
                        expect_domain(d, &boundary, expr)?;
                    }
                }
            }
            Ok(Domain::Volume)
        }
    }
}

/// Domain of `expr`; fails on inconsistent templates.
pub fn infer_domain(expr: &Expr, dims: usize) -> Result<Domain> {
    let children = expr
        .children()
        .into_iter()
        .map(|c| infer_domain(c, dims))
        .collect::<Result<Vec<_>>>()?;
    node_domain(expr, &children, dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DiscretizationConfig {
        DiscretizationConfig::new()
            .with_quadrature("q", Some(4))
            .with_quadrature("nodal", None)
    }

    #[test]
    fn test_undefined_quadrature_tag() {
        let e = Expr::upsample("missing", Expr::field("u"));
        assert_eq!(
            resolve_quadrature(&e, &config()),
            Err(DiscretizationError::UndefinedQuadratureTag("missing".into()))
        );
    }

    #[test]
    fn test_nodal_tag_markers_dropped() {
        let e = Expr::downsample("nodal", Expr::upsample("nodal", Expr::field("u")) * Expr::field("v"));
        let resolved = resolve_quadrature(&e, &config()).unwrap();
        assert_eq!(resolved, Expr::field("u") * Expr::field("v"));
    }

    #[test]
    fn test_cancel_pairs() {
        let e = Expr::mass(Expr::downsample("q", Expr::upsample("q", Expr::field("u"))));
        assert_eq!(cancel_quadrature_pairs(&e), Expr::mass(Expr::field("u")));
        // a product in between keeps both markers
        let kept = Expr::downsample("q", Expr::upsample("q", Expr::field("u")) * Expr::upsample("q", Expr::field("u")));
        assert_eq!(cancel_quadrature_pairs(&kept), kept);
    }

    #[test]
    fn test_simplify_normal_form() {
        let a = (Expr::field("v") + (Expr::field("u") + 1.0)) + 2.0;
        let b = Expr::field("u") + (Expr::constant(3.0) + Expr::field("v"));
        assert_eq!(simplify(&a), simplify(&b));

        let p = (Expr::field("u") * 2.0) * (Expr::constant(0.5) * Expr::field("w"));
        assert_eq!(simplify(&p), Expr::Product(vec![Expr::field("u"), Expr::field("w")]));

        assert_eq!(simplify(&Expr::constant(2.0).pow(Expr::constant(3.0))), Expr::constant(8.0));
    }

    #[test]
    fn test_domains() {
        let u = Expr::field("u");
        assert_eq!(infer_domain(&(u.clone() * 2.0), 2).unwrap(), Domain::Volume);
        assert_eq!(
            infer_domain(&Expr::boundarize("wall", u.clone()), 2).unwrap(),
            Domain::Boundary("wall".into())
        );
        assert_eq!(infer_domain(&Expr::mass(u.clone()).nodal_sum(), 2).unwrap(), Domain::Scalar);

        let mixed = u.clone() + Expr::boundary_field("g", "wall");
        assert!(matches!(
            infer_domain(&mixed, 2),
            Err(DiscretizationError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            infer_domain(&Expr::diff(2, u), 2),
            Err(DiscretizationError::InvalidConfig(_))
        ));
    }
}
