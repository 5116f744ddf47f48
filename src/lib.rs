//! # dg-discretization
//!
//! The discretization core of a nodal discontinuous Galerkin framework.
//!
//! This crate provides:
//! - Reference-element data for intervals, triangles and tetrahedra
//!   (warp-and-blend nodes, Dubiner bases, mass and differentiation matrices)
//! - Simplicial meshes with conformal and periodic face connectivity
//! - Element groups, face groups with matched node index lists and tagged
//!   boundaries
//! - Volume and boundary field helpers, geometric fields and reductions
//! - An operator template language compiled into cached programs and run by
//!   a pluggable execution backend
//!
//! ```no_run
//! use dg_discretization::{Discretization, Expr, OperatorArgs, generators};
//!
//! let mesh = generators::make_rect_mesh([0.0, 0.0], [1.0, 1.0], [4, 4], [true, true])?;
//! let discr = Discretization::builder(mesh).order(3).build()?;
//! let u = discr.interpolate_volume_function(|x, _| x[0].sin());
//! let dx = discr.compile(&Expr::diff(0, Expr::field("u")))?;
//! let du = dx.call_field(&OperatorArgs::new().field("u", &u))?;
//! # Ok::<(), dg_discretization::DiscretizationError>(())
//! ```

pub mod basis;
pub mod config;
pub mod discretization;
pub mod error;
pub mod executor;
pub mod field;
pub mod local;
pub mod mesh;
pub mod operators;
pub mod optemplate;
pub mod polynomial;

// Re-export main types for convenience
pub use config::{DebugFlag, DiscretizationConfig, MatchTolerances};
pub use discretization::{
    Boundary, Discretization, DiscretizationBuilder, ElementGroup, ExponentialFilterResponse, FaceGroup,
    Filter, ModeResponse, PointEvaluator, Projector, QuadratureInfo,
};
pub use error::{DiscretizationError, ErrorCategory, Result};
pub use executor::{BoundOperator, ExecutionBackend, HostBackend, OperatorArgs, Value};
pub use field::{FieldArray, VectorKind};
pub use local::{LocalDiscretization, SimplexDiscretization};
pub use mesh::{Mesh, MeshBuilder, generators};
pub use optemplate::{Expr, FluxBinding, FluxExpr, Operator, Program};
