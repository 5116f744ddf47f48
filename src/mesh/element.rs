//! Mesh elements and their geometry.
//!
//! Face convention (element-local vertex tuples):
//! - interval: (0), (1)
//! - triangle: (0,1), (1,2), (0,2)
//! - tetrahedron: (0,1,2), (0,1,3), (0,3,2), (1,3,2)
//!
//! Outward normals are the reference normals pushed forward by J^{-T} and
//! normalized, which keeps them outward for either orientation of the map.
//! Face jacobians are the ratio of physical face measure to the measure of
//! the unit face simplex.

use super::affine::AffineMap;
use crate::error::{DiscretizationError, Result};
use crate::local::SimplexShape;

/// Reference to an element and one of its faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementFace {
    /// Element id
    pub element: usize,
    /// Element-local face index
    pub face: usize,
}

impl ElementFace {
    pub fn new(element: usize, face: usize) -> Self {
        Self { element, face }
    }
}

/// Geometric kind of an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Straight-sided simplex with an affine reference map.
    Simplex(SimplexShape),
    /// Element with a non-affine (curved) reference map.
    Curved,
}

/// One mesh element.
#[derive(Clone, Debug)]
pub struct Element {
    pub id: usize,
    /// Global vertex indices, in reference vertex order.
    pub vertex_indices: Vec<usize>,
    pub kind: ElementKind,
    /// Unit → physical map.
    pub map: AffineMap,
    /// Physical → unit map.
    pub inverse_map: AffineMap,
    /// Outward unit normal per face.
    pub face_normals: Vec<Vec<f64>>,
    /// Physical over unit face measure, per face.
    pub face_jacobians: Vec<f64>,
}

/// Outward normal of `face` on the unit simplex.
fn reference_normal(shape: SimplexShape, face: usize) -> Vec<f64> {
    let dims = shape.dimensions();
    let fvi = shape.face_vertices()[face];
    let opposite = (0..shape.vertex_count())
        .find(|v| !fvi.contains(v))
        .unwrap_or(0);
    if opposite == 0 {
        // the slanted face Σ r_k = 2 - d
        vec![1.0 / (dims as f64).sqrt(); dims]
    } else {
        let mut n = vec![0.0; dims];
        n[opposite - 1] = -1.0;
        n
    }
}

/// Measure of the simplex spanned by `vertices` (1 for a single point).
fn simplex_measure(vertices: &[&[f64]]) -> f64 {
    let edge = |k: usize| -> Vec<f64> {
        vertices[k]
            .iter()
            .zip(vertices[0])
            .map(|(a, b)| a - b)
            .collect()
    };
    match vertices.len() {
        1 => 1.0,
        2 => edge(1).iter().map(|x| x * x).sum::<f64>().sqrt(),
        3 => {
            // |a|^2 |b|^2 - (a.b)^2 = |a x b|^2, valid in any ambient dimension
            let (a, b) = (edge(1), edge(2));
            let aa: f64 = a.iter().map(|x| x * x).sum();
            let bb: f64 = b.iter().map(|x| x * x).sum();
            let ab: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
            0.5 * (aa * bb - ab * ab).max(0.0).sqrt()
        }
        _ => {
            let (a, b, c) = (edge(1), edge(2), edge(3));
            let det = a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
                + a[2] * (b[0] * c[1] - b[1] * c[0]);
            det.abs() / 6.0
        }
    }
}

impl Element {
    /// Build a straight-sided simplex from its vertex coordinates.
    pub fn simplex(id: usize, vertex_indices: Vec<usize>, points: &[Vec<f64>]) -> Result<Self> {
        let shape = SimplexShape::from_dimensions(vertex_indices.len().saturating_sub(1))
            .ok_or_else(|| {
                DiscretizationError::Topology(format!(
                    "element {} has {} vertices",
                    id,
                    vertex_indices.len()
                ))
            })?;
        let coords: Vec<&[f64]> = vertex_indices.iter().map(|&v| points[v].as_slice()).collect();
        if coords.iter().any(|c| c.len() != shape.dimensions()) {
            return Err(DiscretizationError::Topology(format!(
                "element {} is a {} in a mesh of dimension {}",
                id,
                shape,
                coords[0].len()
            )));
        }

        let map = AffineMap::from_simplex_vertices(&coords);
        let inverse_map = map
            .inverse()
            .ok_or_else(|| DiscretizationError::Topology(format!("element {} is degenerate", id)))?;

        let mut face_normals = Vec::with_capacity(shape.face_count());
        let mut face_jacobians = Vec::with_capacity(shape.face_count());
        for (face, fvi) in shape.face_vertices().iter().enumerate() {
            let n_ref = reference_normal(shape, face);
            // J^{-T} n_ref
            let raw: Vec<f64> = (0..shape.dimensions())
                .map(|i| {
                    (0..shape.dimensions())
                        .map(|k| inverse_map.matrix[k][i] * n_ref[k])
                        .sum()
                })
                .collect();
            let norm = raw.iter().map(|x| x * x).sum::<f64>().sqrt();
            face_normals.push(raw.iter().map(|x| x / norm).collect());

            let face_coords: Vec<&[f64]> = fvi.iter().map(|&v| coords[v]).collect();
            face_jacobians.push(simplex_measure(&face_coords) / shape.unit_face_measure());
        }

        Ok(Self {
            id,
            vertex_indices,
            kind: ElementKind::Simplex(shape),
            map,
            inverse_map,
            face_normals,
            face_jacobians,
        })
    }

    /// Simplex shape, `None` for curved elements.
    pub fn shape(&self) -> Option<SimplexShape> {
        match self.kind {
            ElementKind::Simplex(shape) => Some(shape),
            ElementKind::Curved => None,
        }
    }

    /// Determinant of the unit → physical map.
    pub fn jacobian(&self) -> f64 {
        self.map.jacobian()
    }

    pub fn face_count(&self) -> usize {
        self.face_normals.len()
    }

    /// Global vertex tuple of `face`.
    pub fn face_vertices(&self, face: usize) -> Vec<usize> {
        match self.shape() {
            Some(shape) => shape.face_vertices()[face]
                .iter()
                .map(|&v| self.vertex_indices[v])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Global vertex tuples of all faces.
    pub fn faces(&self) -> Vec<Vec<usize>> {
        (0..self.face_count()).map(|f| self.face_vertices(f)).collect()
    }

    /// Physical measure (length, area, volume).
    pub fn volume(&self) -> f64 {
        self.shape()
            .map_or(0.0, |shape| self.jacobian().abs() * shape.unit_measure())
    }

    /// Whether `point` lies in the element, allowing barycentric coordinates
    /// down to `-threshold`.
    pub fn contains_point(&self, point: &[f64], threshold: f64) -> bool {
        match self.shape() {
            Some(shape) => shape
                .barycentric(&self.inverse_map.apply(point))
                .iter()
                .all(|&b| b >= -threshold),
            None => false,
        }
    }
}
