//! Memoization owned by a discretization.
//!
//! Every lazily built structure is keyed by a stable identifier (tag,
//! quadrature tag, normalized expression, reduction and operand shape) and
//! never changes once inserted.

use super::boundary::Boundary;
use super::quadrature::QuadratureInfo;
use crate::error::Result;
use crate::optemplate::{Expr, Program};
use log::debug;
use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Prebuilt scalar reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionKind {
    Integral,
    /// Lp norm; infinity for the max norm.
    Norm(OrderedFloat<f64>),
    InnerProduct,
}

/// Lazily populated maps of one discretization.
#[derive(Debug, Default)]
pub(crate) struct DiscretizationCache {
    boundaries: Mutex<HashMap<String, Arc<Boundary>>>,
    quadrature: Mutex<HashMap<String, Arc<QuadratureInfo>>>,
    programs: Mutex<HashMap<Vec<Expr>, Arc<Program>>>,
    reductions: Mutex<HashMap<(ReductionKind, Vec<Vec<usize>>), Arc<Program>>>,
    compile_count: AtomicUsize,
}

/// Look up `key`, building and inserting the value on a miss.
///
/// The lock is not held while building. If two callers race, the first
/// inserted value wins and both receive it.
fn get_or_try_insert<K, V>(
    map: &Mutex<HashMap<K, Arc<V>>>,
    key: K,
    what: &str,
    build: impl FnOnce() -> Result<V>,
) -> Result<Arc<V>>
where
    K: Eq + Hash + std::fmt::Debug,
{
    if let Some(value) = map.lock().get(&key) {
        return Ok(value.clone());
    }
    debug!("{} cache miss: {:?}", what, key);
    let value = Arc::new(build()?);
    Ok(map.lock().entry(key).or_insert(value).clone())
}

impl DiscretizationCache {
    pub(crate) fn boundary(&self, tag: &str, build: impl FnOnce() -> Boundary) -> Arc<Boundary> {
        if let Some(value) = self.boundaries.lock().get(tag) {
            return value.clone();
        }
        debug!("boundary cache miss: {:?}", tag);
        let value = Arc::new(build());
        self.boundaries
            .lock()
            .entry(tag.to_string())
            .or_insert(value)
            .clone()
    }

    pub(crate) fn quadrature(
        &self,
        tag: &str,
        build: impl FnOnce() -> Result<QuadratureInfo>,
    ) -> Result<Arc<QuadratureInfo>> {
        get_or_try_insert(&self.quadrature, tag.to_string(), "quadrature info", build)
    }

    /// Compiled program for normalized expressions; counts misses.
    pub(crate) fn program(
        &self,
        key: Vec<Expr>,
        build: impl FnOnce() -> Result<Program>,
    ) -> Result<Arc<Program>> {
        get_or_try_insert(&self.programs, key, "operator", || {
            self.compile_count.fetch_add(1, Ordering::Relaxed);
            build()
        })
    }

    pub(crate) fn reduction(
        &self,
        kind: ReductionKind,
        shapes: Vec<Vec<usize>>,
        build: impl FnOnce() -> Result<Arc<Program>>,
    ) -> Result<Arc<Program>> {
        if let Some(value) = self.reductions.lock().get(&(kind, shapes.clone())) {
            return Ok(value.clone());
        }
        debug!("reduction cache miss: {:?} {:?}", kind, shapes);
        let value = build()?;
        Ok(self
            .reductions
            .lock()
            .entry((kind, shapes))
            .or_insert(value)
            .clone())
    }

    pub(crate) fn compile_count(&self) -> usize {
        self.compile_count.load(Ordering::Relaxed)
    }
}
