//! Field arrays over node sets.

use crate::error::{DiscretizationError, Result};
use num::{NumCast, Zero};
use std::fmt;

/// Storage kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VectorKind {
    /// Plain host memory, evaluated by the built-in executor.
    #[default]
    Host,
    /// Memory owned by an accelerated backend.
    Accelerated,
}

impl fmt::Display for VectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorKind::Host => write!(f, "host"),
            VectorKind::Accelerated => write!(f, "accelerated"),
        }
    }
}

/// Values of a (possibly multi-component) field at `len` nodes.
///
/// `shape` is the trailing component shape, `[]` for scalar fields. Data is
/// component-major: component `c` occupies `data[c * len..(c + 1) * len]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArray<T> {
    shape: Vec<usize>,
    len: usize,
    kind: VectorKind,
    data: Vec<T>,
}

impl<T: Copy + Zero> FieldArray<T> {
    /// Zero field with component shape `shape` on `len` nodes.
    pub fn zeros(shape: &[usize], len: usize) -> Self {
        let components: usize = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            len,
            kind: VectorKind::Host,
            data: vec![T::zero(); components * len],
        }
    }
}

impl<T: Copy> FieldArray<T> {
    /// Scalar field from nodal values.
    pub fn from_values(values: Vec<T>) -> Self {
        Self {
            shape: Vec::new(),
            len: values.len(),
            kind: VectorKind::Host,
            data: values,
        }
    }

    /// Vector field from equally long components.
    pub fn from_components(components: Vec<Vec<T>>) -> Result<Self> {
        let len = components.first().map_or(0, Vec::len);
        if let Some(bad) = components.iter().find(|c| c.len() != len) {
            return Err(DiscretizationError::shape_mismatch(
                format!("components of length {}", len),
                format!("component of length {}", bad.len()),
            ));
        }
        let count = components.len();
        Ok(Self {
            shape: vec![count],
            len,
            kind: VectorKind::Host,
            data: components.into_iter().flatten().collect(),
        })
    }

    /// Rebuild from raw component-major data.
    pub fn from_raw(shape: Vec<usize>, len: usize, kind: VectorKind, data: Vec<T>) -> Result<Self> {
        let components: usize = shape.iter().product();
        if data.len() != components * len {
            return Err(DiscretizationError::shape_mismatch(
                format!("{} values", components * len),
                format!("{} values", data.len()),
            ));
        }
        Ok(Self {
            shape,
            len,
            kind,
            data,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> VectorKind {
        self.kind
    }

    /// Number of scalar components (1 for scalar fields).
    pub fn component_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn component(&self, c: usize) -> &[T] {
        &self.data[c * self.len..(c + 1) * self.len]
    }

    pub fn component_mut(&mut self, c: usize) -> &mut [T] {
        let len = self.len;
        &mut self.data[c * len..(c + 1) * len]
    }

    pub fn components(&self) -> impl Iterator<Item = &[T]> {
        // chunks(0) panics
        self.data.chunks(self.len.max(1))
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Same shape and node count.
    pub fn same_layout<U>(&self, other: &FieldArray<U>) -> bool {
        self.shape == other.shape && self.len == other.len
    }

    /// Human-readable layout, used in error messages.
    pub fn describe(&self) -> String {
        format!("{:?} x {} nodes ({})", self.shape, self.len, self.kind)
    }

    /// Apply `f` to every value.
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> FieldArray<U> {
        FieldArray {
            shape: self.shape.clone(),
            len: self.len,
            kind: self.kind,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Retag the storage kind, as an accelerated backend does for its output.
    pub fn with_kind(mut self, kind: VectorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl<T: Copy + NumCast> FieldArray<T> {
    /// Convert the numeric type of every value.
    pub fn cast<U: Copy + NumCast>(&self) -> Result<FieldArray<U>> {
        let data = self
            .data
            .iter()
            .map(|&x| num::cast::<T, U>(x))
            .collect::<Option<Vec<U>>>()
            .ok_or_else(|| DiscretizationError::KindConversion {
                from: std::any::type_name::<T>().to_string(),
                to: std::any::type_name::<U>().to_string(),
            })?;
        Ok(FieldArray {
            shape: self.shape.clone(),
            len: self.len,
            kind: self.kind,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_layout() {
        let f: FieldArray<f64> = FieldArray::zeros(&[3], 5);
        assert_eq!(f.component_count(), 3);
        assert_eq!(f.len(), 5);
        assert_eq!(f.data().len(), 15);
        assert!(!f.is_scalar());

        let s: FieldArray<f32> = FieldArray::zeros(&[], 4);
        assert_eq!(s.component_count(), 1);
        assert!(s.is_scalar());
    }

    #[test]
    fn test_components_are_contiguous() {
        let f = FieldArray::from_components(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(f.component(1), &[3.0, 4.0]);
        assert_eq!(f.components().count(), 2);
        assert!(FieldArray::from_components(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_cast() {
        let f = FieldArray::from_values(vec![1.5f64, -2.0]);
        let g: FieldArray<f32> = f.cast().unwrap();
        assert_eq!(g.data(), &[1.5f32, -2.0]);

        let neg = FieldArray::from_values(vec![-1.0f64]);
        assert!(neg.cast::<u32>().is_err());
    }
}
