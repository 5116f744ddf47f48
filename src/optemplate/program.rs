//! Lowered operator programs.
//!
//! A [`Program`] is a linear SSA schedule: every instruction writes a fresh
//! register, identical subexpressions share one register, and each
//! instruction lists the registers whose last use it is so the executor can
//! release them.

use super::expr::{Expr, FluxExpr, Operator};
use super::passes::{Domain, node_domain};
use crate::error::Result;
use std::collections::HashMap;
use std::fmt;

pub type Register = usize;

/// One scheduled operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    LoadField(String),
    LoadBoundaryField { name: String, tag: String },
    LoadScalar(String),
    Constant(f64),
    Sum(Vec<Register>),
    Product(Vec<Register>),
    Power(Register, Register),
    Abs(Register),
    Max(Register, Register),
    Apply { op: Operator, operand: Register },
    Flux {
        flux: FluxExpr,
        operands: Vec<Register>,
        /// Boundary tag and exterior values.
        boundary: Option<(String, Vec<Register>)>,
        quadrature_tag: Option<String>,
    },
    NodalSum(Register),
    NodalMax(Register),
}

impl Op {
    /// Registers read by this operation.
    pub fn inputs(&self) -> Vec<Register> {
        match self {
            Op::LoadField(_) | Op::LoadBoundaryField { .. } | Op::LoadScalar(_) | Op::Constant(_) => Vec::new(),
            Op::Sum(regs) | Op::Product(regs) => regs.clone(),
            Op::Power(a, b) | Op::Max(a, b) => vec![*a, *b],
            Op::Abs(a) | Op::NodalSum(a) | Op::NodalMax(a) => vec![*a],
            Op::Apply { operand, .. } => vec![*operand],
            Op::Flux { operands, boundary, .. } => operands
                .iter()
                .chain(boundary.iter().flat_map(|(_, values)| values.iter()))
                .copied()
                .collect(),
        }
    }
}

fn fmt_regs(regs: &[Register]) -> String {
    regs.iter().map(|r| format!("r{}", r)).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::LoadField(name) => write!(f, "load {}", name),
            Op::LoadBoundaryField { name, tag } => write!(f, "load {}@{}", name, tag),
            Op::LoadScalar(name) => write!(f, "load ${}", name),
            Op::Constant(c) => write!(f, "const {}", c),
            Op::Sum(regs) => write!(f, "sum({})", fmt_regs(regs)),
            Op::Product(regs) => write!(f, "product({})", fmt_regs(regs)),
            Op::Power(a, b) => write!(f, "pow(r{}, r{})", a, b),
            Op::Abs(a) => write!(f, "abs(r{})", a),
            Op::Max(a, b) => write!(f, "max(r{}, r{})", a, b),
            Op::Apply { op, operand } => write!(f, "{}(r{})", op, operand),
            Op::Flux {
                flux,
                operands,
                boundary,
                quadrature_tag,
            } => {
                write!(f, "flux[{}]({})", flux, fmt_regs(operands))?;
                if let Some((tag, values)) = boundary {
                    write!(f, " on {} with ({})", tag, fmt_regs(values))?;
                }
                if let Some(tag) = quadrature_tag {
                    write!(f, " quad {}", tag)?;
                }
                Ok(())
            }
            Op::NodalSum(a) => write!(f, "nodal_sum(r{})", a),
            Op::NodalMax(a) => write!(f, "nodal_max(r{})", a),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub result: Register,
    pub op: Op,
    pub domain: Domain,
    /// Registers dead after this instruction.
    pub release: Vec<Register>,
}

/// Compiled schedule of one or more output expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub outputs: Vec<Register>,
    pub register_count: usize,
    /// Normalized expressions this program evaluates.
    pub expressions: Vec<Expr>,
}

struct Lowering {
    dims: usize,
    instructions: Vec<Instruction>,
    seen: HashMap<Expr, (Register, Domain)>,
}

impl Lowering {
    fn emit(&mut self, op: Op, domain: Domain) -> Register {
        let result = self.instructions.len();
        self.instructions.push(Instruction {
            result,
            op,
            domain,
            release: Vec::new(),
        });
        result
    }

    fn lower(&mut self, expr: &Expr) -> Result<(Register, Domain)> {
        if let Some(hit) = self.seen.get(expr) {
            return Ok(hit.clone());
        }
        let lowered: Vec<(Register, Domain)> = expr
            .children()
            .into_iter()
            .map(|c| self.lower(c))
            .collect::<Result<_>>()?;
        let (regs, domains): (Vec<Register>, Vec<Domain>) = lowered.into_iter().unzip();
        let domain = node_domain(expr, &domains, self.dims)?;

        let op = match expr {
            Expr::Field(name) => Op::LoadField(name.clone()),
            Expr::BoundaryField { name, tag } => Op::LoadBoundaryField {
                name: name.clone(),
                tag: tag.clone(),
            },
            Expr::ScalarParameter(name) => Op::LoadScalar(name.clone()),
            Expr::Constant(c) => Op::Constant(c.0),
            Expr::Sum(_) => Op::Sum(regs),
            Expr::Product(_) => Op::Product(regs),
            Expr::Power(..) => Op::Power(regs[0], regs[1]),
            Expr::Max(..) => Op::Max(regs[0], regs[1]),
            Expr::Abs(_) => Op::Abs(regs[0]),
            Expr::NodalSum(_) => Op::NodalSum(regs[0]),
            Expr::NodalMax(_) => Op::NodalMax(regs[0]),
            Expr::Apply { op, .. } => Op::Apply {
                op: op.clone(),
                operand: regs[0],
            },
            Expr::Flux(binding) => {
                let (operands, values) = regs.split_at(binding.operands.len());
                Op::Flux {
                    flux: binding.flux.clone(),
                    operands: operands.to_vec(),
                    boundary: binding
                        .boundary
                        .as_ref()
                        .map(|b| (b.tag.clone(), values.to_vec())),
                    quadrature_tag: binding.quadrature_tag.clone(),
                }
            }
        };
        let result = self.emit(op, domain.clone());
        self.seen.insert(expr.clone(), (result, domain.clone()));
        Ok((result, domain))
    }
}

impl Program {
    /// Lower normalized expressions into a schedule.
    pub fn lower(expressions: &[Expr], dims: usize) -> Result<Self> {
        let mut lowering = Lowering {
            dims,
            instructions: Vec::new(),
            seen: HashMap::new(),
        };
        let outputs = expressions
            .iter()
            .map(|e| lowering.lower(e).map(|(r, _)| r))
            .collect::<Result<Vec<_>>>()?;

        let mut instructions = lowering.instructions;
        let mut last_use: HashMap<Register, usize> = HashMap::new();
        for (i, instruction) in instructions.iter().enumerate() {
            for r in instruction.op.inputs() {
                last_use.insert(r, i);
            }
        }
        for (r, i) in last_use {
            if !outputs.contains(&r) {
                instructions[i].release.push(r);
            }
        }
        for instruction in &mut instructions {
            instruction.release.sort_unstable();
        }

        Ok(Self {
            register_count: instructions.len(),
            instructions,
            outputs,
            expressions: expressions.to_vec(),
        })
    }

    /// Graphviz rendering of the dataflow graph.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph dataflow {\n");
        for instruction in &self.instructions {
            let label = instruction.op.to_string().replace('"', "'");
            out.push_str(&format!(
                "  r{} [label=\"r{}: {}\\n{}\"];\n",
                instruction.result, instruction.result, label, instruction.domain
            ));
            for input in instruction.op.inputs() {
                out.push_str(&format!("  r{} -> r{};\n", input, instruction.result));
            }
        }
        for (i, output) in self.outputs.iter().enumerate() {
            out.push_str(&format!("  out{} [shape=box];\n  r{} -> out{};\n", i, output, i));
        }
        out.push_str("}\n");
        out
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            write!(
                f,
                "r{} <- {} [{}]",
                instruction.result, instruction.op, instruction.domain
            )?;
            if !instruction.release.is_empty() {
                write!(f, " free {}", fmt_regs(&instruction.release))?;
            }
            writeln!(f)?;
        }
        write!(f, "return {}", fmt_regs(&self.outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_subexpressions_shared() {
        let du = Expr::diff(0, Expr::field("u"));
        let e = du.clone() * du.clone() + du;
        let program = Program::lower(&[e], 2).unwrap();
        // load u, diff, product, sum
        assert_eq!(program.instructions.len(), 4);
        assert_eq!(program.outputs, vec![3]);
    }

    #[test]
    fn test_registers_released_after_last_use() {
        let u = Expr::field("u");
        let e = Expr::mass(u.clone()) + u;
        let program = Program::lower(&[e], 1).unwrap();
        // r0 = u, r1 = M(r0), r2 = r0 + r1 (or r1 + r0)
        let last = &program.instructions[2];
        assert_eq!(last.release, vec![0, 1]);
        assert!(program.instructions[1].release.is_empty());
        assert!(program.to_string().contains("free r0, r1"));
    }

    #[test]
    fn test_outputs_are_kept() {
        let u = Expr::field("u");
        let program = Program::lower(&[u.clone(), Expr::mass(u)], 1).unwrap();
        assert_eq!(program.outputs, vec![0, 1]);
        assert!(program.instructions.iter().all(|i| i.release.is_empty()));
        assert!(program.to_dot().starts_with("digraph"));
    }
}
