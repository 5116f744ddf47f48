//! Nodal field storage.

mod array;

pub use array::{FieldArray, VectorKind};
