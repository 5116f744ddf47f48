//! Mesh representation.
//!
//! Provides the simplicial mesh consumed by the discretization core:
//! - affine element maps with outward normals and face jacobians
//! - conformal connectivity: interfaces, tagged boundary faces and
//!   periodic face identification
//! - structured interval, rectangle and box generators

mod affine;
mod boundary_tags;
mod conformal;
mod element;
pub mod generators;

pub use affine::AffineMap;
pub use boundary_tags::{Side, TAG_ALL, TAG_NONE, periodic_tags, side_tag};
pub use conformal::{BoundaryTagger, Mesh, MeshBuilder};
pub use element::{Element, ElementFace, ElementKind};
pub use generators::{make_box_mesh, make_rect_mesh, make_uniform_interval_mesh};
