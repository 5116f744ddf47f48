//! Operator template expressions.
//!
//! Expressions are plain trees with structural equality, hashing and
//! ordering, so they can key caches and be sorted into a normal form.
//! Physical scaling is implied by the operators:
//! - `Mass`: |J| M u
//! - `InverseMass`: M^{-1} u / |J|
//! - `Diff(i)`: Σ_k (∂r_k/∂x_i) D_k u
//! - `Stiffness(i)` / `StiffnessT(i)`: |J| Σ_k (∂r_k/∂x_i) S_k u, resp. S_k^T
//! - `MInvST(i)`: Σ_k (∂r_k/∂x_i) M^{-1} S_k^T u
//! - `Flux`: surface integral Σ_f E_f^T M_f J_f flux, so that
//!   `InverseMass(Flux(..))` is the lifted flux

use ordered_float::OrderedFloat;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Linear operator applied to a subexpression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Mass,
    InverseMass,
    /// Strong derivative along a physical axis.
    Diff(usize),
    /// Weak derivative M^{-1} S^T along a physical axis.
    MInvST(usize),
    Stiffness(usize),
    StiffnessT(usize),
    /// Restrict a volume field to the nodes of a boundary tag.
    Boundarize(String),
    /// Interpolate a volume field to the volume quadrature nodes of a tag.
    QuadratureUpsample(String),
    /// Project a quadrature field back onto the nodal basis.
    QuadratureDownsample(String),
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Mass => write!(f, "M"),
            Operator::InverseMass => write!(f, "Minv"),
            Operator::Diff(axis) => write!(f, "d/dx{}", axis),
            Operator::MInvST(axis) => write!(f, "MinvST{}", axis),
            Operator::Stiffness(axis) => write!(f, "S{}", axis),
            Operator::StiffnessT(axis) => write!(f, "ST{}", axis),
            Operator::Boundarize(tag) => write!(f, "Boundarize[{}]", tag),
            Operator::QuadratureUpsample(tag) => write!(f, "Up[{}]", tag),
            Operator::QuadratureDownsample(tag) => write!(f, "Down[{}]", tag),
        }
    }
}

/// Pointwise flux expression evaluated at matched face nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FluxExpr {
    /// Interior value of operand i.
    Int(usize),
    /// Exterior value of operand i (boundary value i on boundary faces).
    Ext(usize),
    /// Component of the outward normal of the evaluating side.
    Normal(usize),
    /// (order² / h)^power
    PenaltyTerm(OrderedFloat<f64>),
    Constant(OrderedFloat<f64>),
    Sum(Vec<FluxExpr>),
    Product(Vec<FluxExpr>),
    /// `then` where the condition is positive, `otherwise` elsewhere.
    IfPositive {
        condition: Box<FluxExpr>,
        then: Box<FluxExpr>,
        otherwise: Box<FluxExpr>,
    },
}

impl FluxExpr {
    pub fn constant(value: f64) -> Self {
        FluxExpr::Constant(OrderedFloat(value))
    }

    pub fn penalty(power: f64) -> Self {
        FluxExpr::PenaltyTerm(OrderedFloat(power))
    }

    pub fn if_positive(condition: FluxExpr, then: FluxExpr, otherwise: FluxExpr) -> Self {
        FluxExpr::IfPositive {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// The same flux seen from the other side: interior and exterior
    /// values trade places.
    pub fn swap_sides(&self) -> Self {
        match self {
            FluxExpr::Int(i) => FluxExpr::Ext(*i),
            FluxExpr::Ext(i) => FluxExpr::Int(*i),
            FluxExpr::Sum(terms) => FluxExpr::Sum(terms.iter().map(FluxExpr::swap_sides).collect()),
            FluxExpr::Product(factors) => {
                FluxExpr::Product(factors.iter().map(FluxExpr::swap_sides).collect())
            }
            FluxExpr::IfPositive {
                condition,
                then,
                otherwise,
            } => FluxExpr::if_positive(condition.swap_sides(), then.swap_sides(), otherwise.swap_sides()),
            other => other.clone(),
        }
    }

    /// Largest operand index referenced, if any.
    pub fn max_operand(&self) -> Option<usize> {
        match self {
            FluxExpr::Int(i) | FluxExpr::Ext(i) => Some(*i),
            FluxExpr::Sum(children) | FluxExpr::Product(children) => {
                children.iter().filter_map(FluxExpr::max_operand).max()
            }
            FluxExpr::IfPositive {
                condition,
                then,
                otherwise,
            } => [condition, then, otherwise]
                .iter()
                .filter_map(|e| e.max_operand())
                .max(),
            _ => None,
        }
    }

    /// Largest normal component referenced, if any.
    pub fn max_normal_axis(&self) -> Option<usize> {
        match self {
            FluxExpr::Normal(axis) => Some(*axis),
            FluxExpr::Sum(children) | FluxExpr::Product(children) => {
                children.iter().filter_map(FluxExpr::max_normal_axis).max()
            }
            FluxExpr::IfPositive {
                condition,
                then,
                otherwise,
            } => [condition, then, otherwise]
                .iter()
                .filter_map(|e| e.max_normal_axis())
                .max(),
            _ => None,
        }
    }
}

impl fmt::Display for FluxExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FluxExpr::Int(i) => write!(f, "int[{}]", i),
            FluxExpr::Ext(i) => write!(f, "ext[{}]", i),
            FluxExpr::Normal(axis) => write!(f, "n[{}]", axis),
            FluxExpr::PenaltyTerm(p) => write!(f, "penalty^{}", p),
            FluxExpr::Constant(c) => write!(f, "{}", c),
            FluxExpr::Sum(terms) => write_joined(f, terms, " + "),
            FluxExpr::Product(factors) => write_joined(f, factors, " * "),
            FluxExpr::IfPositive {
                condition,
                then,
                otherwise,
            } => write!(f, "if({} > 0, {}, {})", condition, then, otherwise),
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

macro_rules! flux_arith {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl $trait for FluxExpr {
            type Output = FluxExpr;
            fn $method(self, rhs: FluxExpr) -> FluxExpr {
                FluxExpr::$variant(vec![self, rhs])
            }
        }
    };
}

flux_arith!(Add, add, Sum);
flux_arith!(Mul, mul, Product);

impl Sub for FluxExpr {
    type Output = FluxExpr;
    fn sub(self, rhs: FluxExpr) -> FluxExpr {
        FluxExpr::Sum(vec![self, -rhs])
    }
}

impl Neg for FluxExpr {
    type Output = FluxExpr;
    fn neg(self) -> FluxExpr {
        FluxExpr::Product(vec![FluxExpr::constant(-1.0), self])
    }
}

impl Mul<f64> for FluxExpr {
    type Output = FluxExpr;
    fn mul(self, rhs: f64) -> FluxExpr {
        FluxExpr::Product(vec![FluxExpr::constant(rhs), self])
    }
}

/// Boundary values injected as the exterior side of a boundary flux.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoundaryInjection {
    pub tag: String,
    /// One boundary-domain expression per flux operand.
    pub values: Vec<Expr>,
}

/// A flux applied to volume operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FluxBinding {
    pub flux: FluxExpr,
    /// Volume-domain operands referenced by `Int(i)` / `Ext(i)`.
    pub operands: Vec<Expr>,
    /// Evaluate on the faces of this boundary instead of the interior faces.
    pub boundary: Option<BoundaryInjection>,
    /// Evaluate interior faces on the face quadrature nodes of this tag.
    pub quadrature_tag: Option<String>,
}

impl FluxBinding {
    /// Flux over all interior faces.
    pub fn interior(flux: FluxExpr, operands: Vec<Expr>) -> Self {
        Self {
            flux,
            operands,
            boundary: None,
            quadrature_tag: None,
        }
    }

    /// Flux over the faces of `tag`, with `values` as exterior data.
    pub fn boundary(flux: FluxExpr, operands: Vec<Expr>, tag: impl Into<String>, values: Vec<Expr>) -> Self {
        Self {
            flux,
            operands,
            boundary: Some(BoundaryInjection {
                tag: tag.into(),
                values,
            }),
            quadrature_tag: None,
        }
    }

    pub fn with_quadrature(mut self, tag: impl Into<String>) -> Self {
        self.quadrature_tag = Some(tag.into());
        self
    }
}

/// Operator template expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expr {
    /// Named volume field operand.
    Field(String),
    /// Named boundary field operand on the nodes of `tag`.
    BoundaryField { name: String, tag: String },
    /// Named scalar operand.
    ScalarParameter(String),
    Constant(OrderedFloat<f64>),
    Sum(Vec<Expr>),
    Product(Vec<Expr>),
    Power(Box<Expr>, Box<Expr>),
    Abs(Box<Expr>),
    Max(Box<Expr>, Box<Expr>),
    Apply { op: Operator, operand: Box<Expr> },
    Flux(Box<FluxBinding>),
    /// Sum over all nodes and components.
    NodalSum(Box<Expr>),
    /// Maximum over all nodes and components.
    NodalMax(Box<Expr>),
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field(name.into())
    }

    pub fn boundary_field(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Expr::BoundaryField {
            name: name.into(),
            tag: tag.into(),
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Expr::ScalarParameter(name.into())
    }

    pub fn constant(value: f64) -> Self {
        Expr::Constant(OrderedFloat(value))
    }

    pub fn apply(op: Operator, operand: Expr) -> Self {
        Expr::Apply {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn mass(operand: Expr) -> Self {
        Expr::apply(Operator::Mass, operand)
    }

    pub fn inverse_mass(operand: Expr) -> Self {
        Expr::apply(Operator::InverseMass, operand)
    }

    pub fn diff(axis: usize, operand: Expr) -> Self {
        Expr::apply(Operator::Diff(axis), operand)
    }

    pub fn boundarize(tag: impl Into<String>, operand: Expr) -> Self {
        Expr::apply(Operator::Boundarize(tag.into()), operand)
    }

    pub fn upsample(tag: impl Into<String>, operand: Expr) -> Self {
        Expr::apply(Operator::QuadratureUpsample(tag.into()), operand)
    }

    pub fn downsample(tag: impl Into<String>, operand: Expr) -> Self {
        Expr::apply(Operator::QuadratureDownsample(tag.into()), operand)
    }

    pub fn flux(binding: FluxBinding) -> Self {
        Expr::Flux(Box::new(binding))
    }

    /// M^{-1} applied to the flux surface integral.
    pub fn lift(binding: FluxBinding) -> Self {
        Expr::inverse_mass(Expr::flux(binding))
    }

    pub fn pow(self, exponent: Expr) -> Self {
        Expr::Power(Box::new(self), Box::new(exponent))
    }

    pub fn abs(self) -> Self {
        Expr::Abs(Box::new(self))
    }

    pub fn max(self, other: Expr) -> Self {
        Expr::Max(Box::new(self), Box::new(other))
    }

    pub fn nodal_sum(self) -> Self {
        Expr::NodalSum(Box::new(self))
    }

    pub fn nodal_max(self) -> Self {
        Expr::NodalMax(Box::new(self))
    }

    /// Direct subexpressions, flux operands and boundary values included.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Field(_) | Expr::BoundaryField { .. } | Expr::ScalarParameter(_) | Expr::Constant(_) => {
                Vec::new()
            }
            Expr::Sum(children) | Expr::Product(children) => children.iter().collect(),
            Expr::Power(a, b) | Expr::Max(a, b) => vec![a.as_ref(), b.as_ref()],
            Expr::Abs(a) | Expr::NodalSum(a) | Expr::NodalMax(a) => vec![a.as_ref()],
            Expr::Apply { operand, .. } => vec![operand.as_ref()],
            Expr::Flux(binding) => binding
                .operands
                .iter()
                .chain(binding.boundary.iter().flat_map(|b| b.values.iter()))
                .collect(),
        }
    }

    /// Rebuild with every direct subexpression replaced by `f(child)`.
    pub fn try_map_children<E>(&self, mut f: impl FnMut(&Expr) -> Result<Expr, E>) -> Result<Expr, E> {
        Ok(match self {
            Expr::Field(_) | Expr::BoundaryField { .. } | Expr::ScalarParameter(_) | Expr::Constant(_) => {
                self.clone()
            }
            Expr::Sum(children) => Expr::Sum(children.iter().map(&mut f).collect::<Result<_, E>>()?),
            Expr::Product(children) => Expr::Product(children.iter().map(&mut f).collect::<Result<_, E>>()?),
            Expr::Power(a, b) => Expr::Power(Box::new(f(a)?), Box::new(f(b)?)),
            Expr::Max(a, b) => Expr::Max(Box::new(f(a)?), Box::new(f(b)?)),
            Expr::Abs(a) => Expr::Abs(Box::new(f(a)?)),
            Expr::NodalSum(a) => Expr::NodalSum(Box::new(f(a)?)),
            Expr::NodalMax(a) => Expr::NodalMax(Box::new(f(a)?)),
            Expr::Apply { op, operand } => Expr::Apply {
                op: op.clone(),
                operand: Box::new(f(operand)?),
            },
            Expr::Flux(binding) => {
                let operands = binding.operands.iter().map(&mut f).collect::<Result<_, E>>()?;
                let boundary = match &binding.boundary {
                    Some(b) => Some(BoundaryInjection {
                        tag: b.tag.clone(),
                        values: b.values.iter().map(&mut f).collect::<Result<_, E>>()?,
                    }),
                    None => None,
                };
                Expr::flux(FluxBinding {
                    flux: binding.flux.clone(),
                    operands,
                    boundary,
                    quadrature_tag: binding.quadrature_tag.clone(),
                })
            }
        })
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Field(name) => write!(f, "{}", name),
            Expr::BoundaryField { name, tag } => write!(f, "{}@{}", name, tag),
            Expr::ScalarParameter(name) => write!(f, "${}", name),
            Expr::Constant(c) => write!(f, "{}", c),
            Expr::Sum(terms) => write_joined(f, terms, " + "),
            Expr::Product(factors) => write_joined(f, factors, " * "),
            Expr::Power(a, b) => write!(f, "({})**({})", a, b),
            Expr::Abs(a) => write!(f, "|{}|", a),
            Expr::Max(a, b) => write!(f, "max({}, {})", a, b),
            Expr::Apply { op, operand } => write!(f, "{}({})", op, operand),
            Expr::Flux(binding) => {
                write!(f, "Flux[{}](", binding.flux)?;
                for (i, operand) in binding.operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", operand)?;
                }
                write!(f, ")")?;
                if let Some(b) = &binding.boundary {
                    write!(f, " on {}", b.tag)?;
                }
                if let Some(q) = &binding.quadrature_tag {
                    write!(f, " quad {}", q)?;
                }
                Ok(())
            }
            Expr::NodalSum(a) => write!(f, "sum({})", a),
            Expr::NodalMax(a) => write!(f, "max_nodes({})", a),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::constant(value)
    }
}

macro_rules! expr_arith {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl $trait for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::$variant(vec![self, rhs])
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                Expr::$variant(vec![self, Expr::constant(rhs)])
            }
        }
    };
}

expr_arith!(Add, add, Sum);
expr_arith!(Mul, mul, Product);

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sum(vec![self, -rhs])
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::Product(vec![Expr::constant(-1.0), self])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Expr::diff(0, Expr::field("u")) + Expr::field("v") * 2.0;
        let b = Expr::diff(0, Expr::field("u")) + Expr::field("v") * 2.0;
        assert_eq!(a, b);
        assert_ne!(a, Expr::diff(1, Expr::field("u")) + Expr::field("v") * 2.0);
        assert_eq!(a.size(), 6);
    }

    #[test]
    fn test_flux_swap_sides() {
        let central = (FluxExpr::Int(0) + FluxExpr::Ext(0)) * 0.5;
        assert_eq!(central.swap_sides().max_operand(), Some(0));
        let jump = FluxExpr::Int(0) - FluxExpr::Ext(1);
        assert_eq!(
            jump.swap_sides(),
            FluxExpr::Sum(vec![
                FluxExpr::Ext(0),
                FluxExpr::Product(vec![FluxExpr::constant(-1.0), FluxExpr::Int(1)])
            ])
        );
    }

    #[test]
    fn test_display() {
        let e = Expr::inverse_mass(Expr::field("u")) * Expr::scalar("dt");
        assert_eq!(e.to_string(), "(Minv(u) * $dt)");
    }
}
