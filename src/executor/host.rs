//! Built-in interpreter.
//!
//! Instructions run in program order. Pointwise operations broadcast scalars
//! and scalar fields; element operators loop over the element groups and
//! apply the group's reference matrices with each element's geometric
//! scaling. With the `parallel` feature the element loops run on rayon.

use super::flux::{FaceOperands, boundary_flux, interior_flux, quadrature_flux};
use super::{ExecutionBackend, OperatorArgs, Value};
use crate::discretization::{Discretization, ElementGroup, UniformElementRanges};
use crate::error::{DiscretizationError, Result};
use crate::field::{FieldArray, VectorKind};
use crate::mesh::Element;
use crate::operators::{apply, apply_add};
use crate::optemplate::{Instruction, Op, Operator, Program, Register};
use log::trace;

/// Interpreter for host memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostBackend;

impl ExecutionBackend for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    fn kind(&self) -> VectorKind {
        VectorKind::Host
    }

    fn execute(&self, discr: &Discretization, program: &Program, args: &OperatorArgs<'_>) -> Result<Vec<Value>> {
        let mut registers: Vec<Option<Value>> = vec![None; program.register_count];
        for instruction in &program.instructions {
            trace!("r{} <- {}", instruction.result, instruction.op);
            let value = evaluate(discr, args, instruction, &registers)?;
            registers[instruction.result] = Some(value);
            for &r in &instruction.release {
                registers[r] = None;
            }
        }
        program
            .outputs
            .iter()
            .map(|&r| register(&registers, r).cloned())
            .collect()
    }

    fn convert(&self, field: FieldArray<f64>, to: VectorKind) -> Result<FieldArray<f64>> {
        if field.kind() == to {
            return Ok(field);
        }
        Err(DiscretizationError::KindConversion {
            from: field.kind().to_string(),
            to: to.to_string(),
        })
    }
}

fn register(registers: &[Option<Value>], r: Register) -> Result<&Value> {
    registers
        .get(r)
        .and_then(Option::as_ref)
        .ok_or_else(|| DiscretizationError::InvalidConfig(format!("register r{} read before it is written", r)))
}

fn load<'a>(args: &OperatorArgs<'a>, name: &str, expected_len: usize, what: &str) -> Result<&'a FieldArray<f64>> {
    let field = args.get_field(name)?;
    if field.kind() != VectorKind::Host {
        return Err(DiscretizationError::KindConversion {
            from: field.kind().to_string(),
            to: VectorKind::Host.to_string(),
        });
    }
    if field.len() != expected_len {
        return Err(DiscretizationError::shape_mismatch(
            format!("{} field '{}' on {} nodes", what, name, expected_len),
            field.describe(),
        ));
    }
    Ok(field)
}

fn evaluate(
    discr: &Discretization,
    args: &OperatorArgs<'_>,
    instruction: &Instruction,
    registers: &[Option<Value>],
) -> Result<Value> {
    let reg = |r: Register| register(registers, r);
    match &instruction.op {
        Op::LoadField(name) => Ok(Value::Field(load(args, name, discr.node_count(), "volume")?.clone())),
        Op::LoadBoundaryField { name, tag } => {
            let len = discr.get_boundary(tag).node_count();
            Ok(Value::Field(load(args, name, len, &format!("boundary '{}'", tag))?.clone()))
        }
        Op::LoadScalar(name) => Ok(Value::Scalar(args.get_scalar(name)?)),
        Op::Constant(c) => Ok(Value::Scalar(*c)),
        Op::Sum(regs) => fold(regs, reg, |a, b| a + b),
        Op::Product(regs) => fold(regs, reg, |a, b| a * b),
        Op::Power(a, b) => binary(reg(*a)?, reg(*b)?, f64::powf),
        Op::Max(a, b) => binary(reg(*a)?, reg(*b)?, f64::max),
        Op::Abs(a) => Ok(match reg(*a)? {
            Value::Scalar(v) => Value::Scalar(v.abs()),
            Value::Field(f) => Value::Field(f.map(f64::abs)),
        }),
        Op::NodalSum(a) => Ok(match reg(*a)? {
            Value::Scalar(v) => Value::Scalar(*v),
            Value::Field(f) => Value::Scalar(f.data().iter().sum()),
        }),
        Op::NodalMax(a) => Ok(match reg(*a)? {
            Value::Scalar(v) => Value::Scalar(*v),
            Value::Field(f) => Value::Scalar(f.data().iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        }),
        Op::Apply { op, operand } => {
            let field = expect_field(reg(*operand)?, op)?;
            apply_operator(discr, op, field).map(Value::Field)
        }
        Op::Flux {
            flux,
            operands,
            boundary,
            quadrature_tag,
        } => {
            let volume = operands
                .iter()
                .map(|&r| scalar_field(reg(r)?, discr.node_count()))
                .collect::<Result<Vec<_>>>()?;
            let result = match (boundary, quadrature_tag) {
                (Some((tag, values)), _) => {
                    let len = discr.get_boundary(tag).node_count();
                    let exterior = values
                        .iter()
                        .map(|&r| match reg(r)? {
                            Value::Scalar(v) => Ok(FaceOperands::Constant(*v)),
                            value => scalar_field(value, len).map(FaceOperands::Nodes),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    boundary_flux(discr, flux, &volume, tag, &exterior)
                }
                (None, Some(tag)) => quadrature_flux(discr, flux, &volume, tag)?,
                (None, None) => interior_flux(discr, flux, &volume),
            };
            Ok(Value::Field(FieldArray::from_values(result)))
        }
    }
}

fn expect_field<'v>(value: &'v Value, op: &Operator) -> Result<&'v FieldArray<f64>> {
    value
        .as_field()
        .ok_or_else(|| DiscretizationError::shape_mismatch(format!("field operand of {}", op), "scalar"))
}

/// Values of a scalar field on `len` nodes.
fn scalar_field(value: &Value, len: usize) -> Result<&[f64]> {
    match value {
        Value::Field(f) if f.is_scalar() && f.len() == len => Ok(f.data()),
        other => Err(DiscretizationError::shape_mismatch(
            format!("scalar field on {} nodes", len),
            other.describe(),
        )),
    }
}

fn fold<'r>(
    regs: &[Register],
    reg: impl Fn(Register) -> Result<&'r Value>,
    f: impl Fn(f64, f64) -> f64 + Copy,
) -> Result<Value> {
    let (first, rest) = regs
        .split_first()
        .ok_or_else(|| DiscretizationError::InvalidConfig("empty sum or product".to_string()))?;
    rest.iter()
        .try_fold(reg(*first)?.clone(), |acc, &r| binary(&acc, reg(r)?, f))
}

/// Pointwise `f(a, b)`. Scalars broadcast to fields, scalar fields to
/// vector fields on the same nodes.
fn binary(a: &Value, b: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
    Ok(match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Value::Scalar(f(*x, *y)),
        (Value::Field(u), Value::Scalar(y)) => Value::Field(u.map(|x| f(x, *y))),
        (Value::Scalar(x), Value::Field(v)) => Value::Field(v.map(|y| f(*x, y))),
        (Value::Field(u), Value::Field(v)) => {
            if u.same_layout(v) {
                let mut out = u.clone();
                for (o, &y) in out.data_mut().iter_mut().zip(v.data()) {
                    *o = f(*o, y);
                }
                Value::Field(out)
            } else if u.is_scalar() && u.len() == v.len() {
                let mut out = v.clone();
                for c in 0..out.component_count() {
                    for (o, &x) in out.component_mut(c).iter_mut().zip(u.data()) {
                        *o = f(x, *o);
                    }
                }
                Value::Field(out)
            } else if v.is_scalar() && u.len() == v.len() {
                let mut out = u.clone();
                for c in 0..out.component_count() {
                    for (o, &y) in out.component_mut(c).iter_mut().zip(v.data()) {
                        *o = f(*o, y);
                    }
                }
                Value::Field(out)
            } else {
                return Err(DiscretizationError::shape_mismatch(u.describe(), v.describe()));
            }
        }
    })
}

/// Run `kernel(position, input, output)` for every element of a group.
fn for_each_element<K>(
    input: &[f64],
    in_ranges: UniformElementRanges,
    output: &mut [f64],
    out_ranges: UniformElementRanges,
    kernel: K,
) where
    K: Fn(usize, &[f64], &mut [f64]) + Sync + Send,
{
    let chunk = out_ranges.el_size.max(1);
    let output = &mut output[out_ranges.total_range()];

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        output
            .par_chunks_mut(chunk)
            .enumerate()
            .for_each(|(p, out)| kernel(p, &input[in_ranges.range(p)], out));
    }

    #[cfg(not(feature = "parallel"))]
    for (p, out) in output.chunks_mut(chunk).enumerate() {
        kernel(p, &input[in_ranges.range(p)], out);
    }
}

/// Mass, inverse mass and derivative operators on one element.
fn element_operator(op: &Operator, group: &ElementGroup, el: &Element, u: &[f64], out: &mut [f64]) {
    let m = &group.matrices;
    let jac = el.jacobian().abs();
    let inv = &el.inverse_map.matrix;
    let dims = m.diff.len();
    match op {
        Operator::Mass => {
            apply(&m.mass, u, out);
            out.iter_mut().for_each(|o| *o *= jac);
        }
        Operator::InverseMass => {
            apply(&m.inv_mass, u, out);
            out.iter_mut().for_each(|o| *o /= jac);
        }
        Operator::Diff(i) => {
            out.fill(0.0);
            for k in 0..dims {
                apply_add(&m.diff[k], inv[k][*i], u, out);
            }
        }
        Operator::Stiffness(i) => {
            out.fill(0.0);
            for k in 0..dims {
                apply_add(&m.stiffness[k], jac * inv[k][*i], u, out);
            }
        }
        Operator::StiffnessT(i) => {
            out.fill(0.0);
            for k in 0..dims {
                apply_add(&m.stiffness_t[k], jac * inv[k][*i], u, out);
            }
        }
        Operator::MInvST(i) => {
            out.fill(0.0);
            for k in 0..dims {
                apply_add(&m.minv_st[k], inv[k][*i], u, out);
            }
        }
        // node-set transfers, see apply_operator
        Operator::Boundarize(_) | Operator::QuadratureUpsample(_) | Operator::QuadratureDownsample(_) => {}
    }
}

fn expect_len(field: &FieldArray<f64>, len: usize, op: &Operator) -> Result<()> {
    if field.len() != len {
        return Err(DiscretizationError::shape_mismatch(
            format!("operand of {} on {} nodes", op, len),
            field.describe(),
        ));
    }
    Ok(())
}

fn apply_operator(discr: &Discretization, op: &Operator, field: &FieldArray<f64>) -> Result<FieldArray<f64>> {
    let groups = discr.element_groups();
    match op {
        Operator::Boundarize(tag) => discr.boundarize_volume_field(field, tag),
        Operator::QuadratureUpsample(tag) => {
            expect_len(field, discr.node_count(), op)?;
            let info = discr.get_quadrature_info(tag)?;
            let mut out = FieldArray::zeros(field.shape(), info.node_count);
            for c in 0..field.component_count() {
                let input = field.component(c);
                let output = out.component_mut(c);
                for (g, group) in groups.iter().enumerate() {
                    let interp = &info.local[g].volume_up_interp;
                    for_each_element(input, group.ranges, output, info.ranges[g], |_, u, o| {
                        apply(interp, u, o)
                    });
                }
            }
            Ok(out)
        }
        Operator::QuadratureDownsample(tag) => {
            let info = discr.get_quadrature_info(tag)?;
            expect_len(field, info.node_count, op)?;
            let mut out = FieldArray::zeros(field.shape(), discr.node_count());
            for c in 0..field.component_count() {
                let input = field.component(c);
                let output = out.component_mut(c);
                for (g, group) in groups.iter().enumerate() {
                    let projection = &info.downsample[g];
                    for_each_element(input, info.ranges[g], output, group.ranges, |_, u, o| {
                        apply(projection, u, o)
                    });
                }
            }
            Ok(out)
        }
        Operator::Mass
        | Operator::InverseMass
        | Operator::Diff(_)
        | Operator::MInvST(_)
        | Operator::Stiffness(_)
        | Operator::StiffnessT(_) => {
            expect_len(field, discr.node_count(), op)?;
            let elements = &discr.mesh().elements;
            let mut out = FieldArray::zeros(field.shape(), discr.node_count());
            for c in 0..field.component_count() {
                let input = field.component(c);
                let output = out.component_mut(c);
                for group in groups {
                    for_each_element(input, group.ranges, output, group.ranges, |p, u, o| {
                        element_operator(op, group, &elements[group.members[p]], u, o)
                    });
                }
            }
            Ok(out)
        }
    }
}
