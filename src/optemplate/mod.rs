//! Operator templates and their compiler.
//!
//! Templates are symbolic [`Expr`] trees over a fixed operator vocabulary.
//! The compiler normalizes them through a few rewrite passes and lowers the
//! result into a linear [`Program`] that an execution backend evaluates
//! against a discretization.

pub mod compiler;
mod expr;
pub mod passes;
mod program;

pub use compiler::{compile, lower, normalize};
pub use expr::{BoundaryInjection, Expr, FluxBinding, FluxExpr, Operator};
pub use passes::{Domain, infer_domain};
pub use program::{Instruction, Op, Program, Register};
