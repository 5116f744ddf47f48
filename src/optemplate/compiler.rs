//! Compiler pipeline: passes, lowering and debug dumps.

use super::expr::Expr;
use super::passes::{cancel_quadrature_pairs, infer_domain, resolve_quadrature, simplify};
use super::program::Program;
use crate::config::{DebugFlag, DiscretizationConfig};
use crate::error::Result;
use log::debug;

fn dump_stage(config: &DiscretizationConfig, stage: &str, exprs: &[Expr]) {
    if config.is_debug(DebugFlag::DumpOptemplateStages) {
        for (i, e) in exprs.iter().enumerate() {
            debug!("optemplate [{}] #{}: {}", stage, i, e);
        }
    }
}

/// Run the rewrite passes. The result is the normal form used as cache key.
pub fn normalize(exprs: &[Expr], config: &DiscretizationConfig, dims: usize) -> Result<Vec<Expr>> {
    dump_stage(config, "input", exprs);

    let resolved = exprs
        .iter()
        .map(|e| resolve_quadrature(e, config))
        .collect::<Result<Vec<_>>>()?;
    dump_stage(config, "quadrature resolved", &resolved);

    let cancelled: Vec<Expr> = resolved.iter().map(cancel_quadrature_pairs).collect();
    dump_stage(config, "quadrature pairs cancelled", &cancelled);

    let simplified: Vec<Expr> = cancelled.iter().map(simplify).collect();
    dump_stage(config, "simplified", &simplified);

    for e in &simplified {
        infer_domain(e, dims)?;
    }
    Ok(simplified)
}

/// Lower normalized expressions, dumping the result when requested.
pub fn lower(normalized: &[Expr], config: &DiscretizationConfig, dims: usize) -> Result<Program> {
    let program = Program::lower(normalized, dims)?;
    if config.is_debug(DebugFlag::DumpOpCode) {
        debug!("op code:\n{}", program);
    }
    if config.is_debug(DebugFlag::DumpDataflowGraph) {
        debug!("dataflow graph:\n{}", program.to_dot());
    }
    Ok(program)
}

/// Normalize and lower in one step.
pub fn compile(exprs: &[Expr], config: &DiscretizationConfig, dims: usize) -> Result<Program> {
    let normalized = normalize(exprs, config, dims)?;
    lower(&normalized, config, dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscretizationError;

    #[test]
    fn test_equivalent_templates_normalize_equally() {
        let config = DiscretizationConfig::new();
        let a = Expr::field("u") + Expr::field("v") * 1.0;
        let b = Expr::field("v") + Expr::field("u");
        assert_eq!(normalize(&[a], &config, 2).unwrap(), normalize(&[b], &config, 2).unwrap());
    }

    #[test]
    fn test_undefined_quadrature_tag_fails_at_compile() {
        let config = DiscretizationConfig::new();
        let e = Expr::downsample("q", Expr::upsample("q", Expr::field("u")));
        assert_eq!(
            compile(&[e], &config, 2).unwrap_err(),
            DiscretizationError::UndefinedQuadratureTag("q".into())
        );
    }

    #[test]
    fn test_quadrature_product_survives() {
        let config = DiscretizationConfig::new().with_quadrature("q", Some(4));
        let u = Expr::upsample("q", Expr::field("u"));
        let e = Expr::downsample("q", u.clone() * u);
        let program = compile(&[e], &config, 2).unwrap();
        assert_eq!(program.instructions.len(), 4);
    }
}
