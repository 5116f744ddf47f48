//! The discretization: element groups, node layout, face connectivity and
//! the operator compiler front-end.
//!
//! A [`Discretization`] is built once from a [`Mesh`] and is immutable
//! afterwards. Boundaries, quadrature layouts and compiled operators are
//! built lazily on first request and memoized in a cache owned by the
//! discretization.
//!
//! ```ignore
//! let mesh = make_rect_mesh([0.0, 0.0], [1.0, 1.0], [4, 4], [false; 2])?;
//! let discr = Discretization::builder(mesh).order(3).build()?;
//! let u = discr.interpolate_volume_function(|x, _| x[0].sin());
//! let dx = discr.compile(&Expr::diff(0, Expr::field("u")))?;
//! let du = dx.call(&OperatorArgs::new().field("u", &u))?;
//! ```

mod boundary;
mod cache;
mod faces;
mod fields;
mod filter;
mod groups;
mod point;
mod projection;
mod quadrature;
mod reductions;

pub use boundary::Boundary;
pub use cache::ReductionKind;
pub use faces::{FaceGeometry, FaceGroup, FacePair, FaceSide, IndexListId};
pub use filter::{ExponentialFilterResponse, Filter, ModeResponse};
pub use groups::{ElementGroup, UniformElementRanges};
pub use point::PointEvaluator;
pub use projection::Projector;
pub use quadrature::QuadratureInfo;

use crate::config::{DebugFlag, DiscretizationConfig, MatchTolerances};
use crate::error::{DiscretizationError, Result};
use crate::executor::{BoundOperator, ExecutionBackend, HostBackend};
use crate::local::{LocalDiscretization, SimplexDiscretization};
use crate::mesh::Mesh;
use crate::optemplate::{Expr, lower, normalize};
use cache::DiscretizationCache;
use faces::{ConnectivityContext, FaceNodeLayout};
use groups::{build_element_groups, common_shape};
use log::info;
use std::ops::Range;
use std::sync::Arc;

/// DG discretization of one mesh.
#[derive(Debug)]
pub struct Discretization {
    mesh: Arc<Mesh>,
    config: DiscretizationConfig,
    element_groups: Vec<ElementGroup>,
    /// Element id → (group, position in group).
    group_map: Vec<(usize, usize)>,
    /// Node coordinates, `dimensions` values per node.
    nodes: Vec<f64>,
    interior_face_groups: Vec<FaceGroup>,
    backend: Arc<dyn ExecutionBackend>,
    cache: DiscretizationCache,
}

/// Builder for [`Discretization`].
pub struct DiscretizationBuilder {
    mesh: Arc<Mesh>,
    config: DiscretizationConfig,
    local_discretization: Option<Arc<dyn LocalDiscretization>>,
    debug_names: Vec<String>,
    backend: Option<Arc<dyn ExecutionBackend>>,
}

impl DiscretizationBuilder {
    /// Polynomial order of the default simplex discretization.
    pub fn order(mut self, order: usize) -> Self {
        self.config.order = Some(order);
        self
    }

    /// Use an explicit local discretization instead of an order.
    pub fn local_discretization(mut self, ldis: Arc<dyn LocalDiscretization>) -> Self {
        self.local_discretization = Some(ldis);
        self
    }

    /// Register a quadrature tag. `None` marks the tag as nodal.
    pub fn quadrature(mut self, tag: impl Into<String>, min_degree: Option<usize>) -> Self {
        self.config = self.config.with_quadrature(tag, min_degree);
        self
    }

    pub fn debug(mut self, flag: DebugFlag) -> Self {
        self.config = self.config.with_debug(flag);
        self
    }

    /// Enable a debug flag by name. Unknown names fail in [`build`](Self::build).
    pub fn debug_flag(mut self, name: impl Into<String>) -> Self {
        self.debug_names.push(name.into());
        self
    }

    pub fn tolerances(mut self, tolerances: MatchTolerances) -> Self {
        self.config.tolerances = tolerances;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: DiscretizationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ExecutionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<Discretization> {
        let mut config = self.config;
        for name in &self.debug_names {
            config.debug.insert(name.parse()?);
        }
        if config.is_debug(DebugFlag::Help) {
            for flag in DebugFlag::ALL {
                info!("debug flag {}: {}", flag, flag.description());
            }
        }

        let mesh = self.mesh;
        let shape = common_shape(&mesh)?;
        let ldis: Arc<dyn LocalDiscretization> = match (self.local_discretization, config.order) {
            (Some(_), Some(_)) => return Err(DiscretizationError::BothOrderAndLocalDiscretization),
            (None, None) => return Err(DiscretizationError::NeitherOrderNorLocalDiscretization),
            (Some(ldis), None) => {
                if ldis.shape() != shape {
                    return Err(DiscretizationError::MixedElementKinds(format!(
                        "local discretization for {} on a mesh of {}s",
                        ldis.shape(),
                        shape
                    )));
                }
                ldis
            }
            (None, Some(order)) => Arc::new(SimplexDiscretization::new(shape, order)?),
        };

        let (element_groups, group_map, nodes) = build_element_groups(&mesh, ldis);
        let ctx = ConnectivityContext {
            mesh: &mesh,
            group_map: &group_map,
            tolerances: config.tolerances,
            check_nodes: config
                .is_debug(DebugFlag::NodePermutation)
                .then_some(nodes.as_slice()),
            log_index_lists: config.is_debug(DebugFlag::IlistGeneration),
        };
        let layouts: Vec<FaceNodeLayout<'_>> = element_groups.iter().map(FaceNodeLayout::nodal).collect();
        let interior_face_groups = vec![ctx.interior_face_group(&layouts)?];

        info!(
            "discretization: {} elements in {} group(s), {} nodes, {} interior face pairs",
            mesh.element_count(),
            element_groups.len(),
            nodes.len() / mesh.dimensions.max(1),
            interior_face_groups.iter().map(FaceGroup::len).sum::<usize>()
        );

        Ok(Discretization {
            mesh,
            config,
            element_groups,
            group_map,
            nodes,
            interior_face_groups,
            backend: self.backend.unwrap_or_else(|| Arc::new(HostBackend)),
            cache: DiscretizationCache::default(),
        })
    }
}

impl Discretization {
    pub fn builder(mesh: impl Into<Arc<Mesh>>) -> DiscretizationBuilder {
        DiscretizationBuilder {
            mesh: mesh.into(),
            config: DiscretizationConfig::default(),
            local_discretization: None,
            debug_names: Vec::new(),
            backend: None,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn config(&self) -> &DiscretizationConfig {
        &self.config
    }

    pub fn dimensions(&self) -> usize {
        self.mesh.dimensions
    }

    pub fn element_groups(&self) -> &[ElementGroup] {
        &self.element_groups
    }

    /// (group, position) of every element.
    pub fn group_map(&self) -> &[(usize, usize)] {
        &self.group_map
    }

    /// Node coordinates, `dimensions()` values per node.
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn node(&self, i: usize) -> &[f64] {
        let d = self.dimensions();
        &self.nodes[i * d..(i + 1) * d]
    }

    /// Number of volume nodes.
    pub fn node_count(&self) -> usize {
        self.element_groups.iter().map(ElementGroup::node_count).sum()
    }

    pub fn interior_face_groups(&self) -> &[FaceGroup] {
        &self.interior_face_groups
    }

    pub fn backend(&self) -> &Arc<dyn ExecutionBackend> {
        &self.backend
    }

    fn connectivity(&self) -> ConnectivityContext<'_> {
        ConnectivityContext {
            mesh: &self.mesh,
            group_map: &self.group_map,
            tolerances: self.config.tolerances,
            check_nodes: self
                .config
                .is_debug(DebugFlag::NodePermutation)
                .then_some(self.nodes.as_slice()),
            log_index_lists: self.config.is_debug(DebugFlag::IlistGeneration),
        }
    }

    /// Boundary of `tag`. Tags without faces give an empty boundary.
    pub fn get_boundary(&self, tag: &str) -> Arc<Boundary> {
        self.cache.boundary(tag, || {
            Boundary::build(tag, &self.connectivity(), &self.element_groups, &self.nodes)
        })
    }

    /// Quadrature layout of `tag`.
    pub fn get_quadrature_info(&self, tag: &str) -> Result<Arc<QuadratureInfo>> {
        let min_degree = self.config.quadrature_degree(tag)?.ok_or_else(|| {
            DiscretizationError::InvalidConfig(format!(
                "quadrature tag '{}' is registered as nodal",
                tag
            ))
        })?;
        self.cache.quadrature(tag, || {
            QuadratureInfo::build(tag, min_degree, &self.connectivity(), &self.element_groups)
        })
    }

    // Lookups

    /// Node range of element `el`.
    pub fn find_el_range(&self, el: usize) -> Range<usize> {
        let (g, p) = self.group_map[el];
        self.element_groups[g].ranges.range(p)
    }

    pub fn find_el_discretization(&self, el: usize) -> &Arc<dyn LocalDiscretization> {
        &self.element_groups[self.group_map[el].0].ldis
    }

    /// Element `el`'s slice of a nodal component.
    pub fn find_el_data<'f, T>(&self, el: usize, values: &'f [T]) -> &'f [T] {
        &values[self.find_el_range(el)]
    }

    /// Element owning volume node `node`.
    pub fn find_element_of_node(&self, node: usize) -> Option<usize> {
        self.element_groups
            .iter()
            .find_map(|g| g.ranges.position_of(node).map(|p| g.members[p]))
    }

    // Compilation

    /// Compile one expression; see [`compile_many`](Self::compile_many).
    pub fn compile(&self, expr: &Expr) -> Result<BoundOperator<'_>> {
        self.compile_many(std::slice::from_ref(expr))
    }

    /// Compile expressions into one operator returning one value each.
    ///
    /// Structurally identical templates share one program: the cache key is
    /// the normalized expression list.
    pub fn compile_many(&self, exprs: &[Expr]) -> Result<BoundOperator<'_>> {
        let dims = self.dimensions();
        let normalized = normalize(exprs, &self.config, dims)?;
        let program = self
            .cache
            .program(normalized.clone(), || lower(&normalized, &self.config, dims))?;
        Ok(BoundOperator::new(self, program))
    }

    /// Number of programs built so far.
    pub fn compile_count(&self) -> usize {
        self.cache.compile_count()
    }
}
