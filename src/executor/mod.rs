//! Execution of compiled programs.
//!
//! A [`BoundOperator`] pairs a compiled [`Program`] with the discretization
//! it was compiled for. Calling it hands the program, the discretization and
//! the named operands to the discretization's [`ExecutionBackend`].
//! [`HostBackend`] is the built-in interpreter; accelerated backends
//! implement the same trait and honour the same node ordering.

mod flux;
mod host;

pub use host::HostBackend;

use crate::discretization::Discretization;
use crate::error::{DiscretizationError, Result};
use crate::field::{FieldArray, VectorKind};
use crate::optemplate::Program;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result of evaluating one expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Field(FieldArray<f64>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Field(_) => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldArray<f64>> {
        match self {
            Value::Field(f) => Some(f),
            Value::Scalar(_) => None,
        }
    }

    pub fn into_field(self) -> Option<FieldArray<f64>> {
        match self {
            Value::Field(f) => Some(f),
            Value::Scalar(_) => None,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Value::Scalar(_) => "scalar".to_string(),
            Value::Field(f) => f.describe(),
        }
    }
}

/// Named operands of one call.
///
/// Volume and boundary fields share one namespace; boundary fields are
/// checked against the node count of the tag they are loaded for.
#[derive(Debug, Clone, Default)]
pub struct OperatorArgs<'a> {
    fields: HashMap<String, &'a FieldArray<f64>>,
    scalars: HashMap<String, f64>,
}

impl<'a> OperatorArgs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: &'a FieldArray<f64>) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.scalars.insert(name.into(), value);
        self
    }

    pub fn get_field(&self, name: &str) -> Result<&'a FieldArray<f64>> {
        self.fields
            .get(name)
            .copied()
            .ok_or_else(|| DiscretizationError::MissingOperand(name.to_string()))
    }

    pub fn get_scalar(&self, name: &str) -> Result<f64> {
        self.scalars
            .get(name)
            .copied()
            .ok_or_else(|| DiscretizationError::MissingOperand(name.to_string()))
    }
}

/// Evaluates compiled programs against a discretization.
pub trait ExecutionBackend: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Storage kind of the fields this backend evaluates.
    fn kind(&self) -> VectorKind;

    /// Run `program`, returning one value per program output.
    fn execute(&self, discr: &Discretization, program: &Program, args: &OperatorArgs<'_>) -> Result<Vec<Value>>;

    /// Move `field` to storage kind `to`.
    fn convert(&self, field: FieldArray<f64>, to: VectorKind) -> Result<FieldArray<f64>>;
}

/// A compiled operator bound to its discretization.
#[derive(Debug, Clone)]
pub struct BoundOperator<'d> {
    discr: &'d Discretization,
    program: Arc<Program>,
}

impl<'d> BoundOperator<'d> {
    pub(crate) fn new(discr: &'d Discretization, program: Arc<Program>) -> Self {
        Self { discr, program }
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Evaluate all outputs.
    pub fn call(&self, args: &OperatorArgs<'_>) -> Result<Vec<Value>> {
        self.discr.backend().execute(self.discr, &self.program, args)
    }

    /// Evaluate an operator with exactly one output.
    pub fn call_single(&self, args: &OperatorArgs<'_>) -> Result<Value> {
        let mut values = self.call(args)?;
        if values.len() != 1 {
            return Err(DiscretizationError::shape_mismatch(
                "one output",
                format!("{} outputs", values.len()),
            ));
        }
        Ok(values.remove(0))
    }

    /// Evaluate an operator whose single output is a field.
    pub fn call_field(&self, args: &OperatorArgs<'_>) -> Result<FieldArray<f64>> {
        match self.call_single(args)? {
            Value::Field(f) => Ok(f),
            Value::Scalar(_) => Err(DiscretizationError::shape_mismatch("field", "scalar")),
        }
    }
}
