//! Reference simplex shapes and their combinatorics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The straight-sided simplex shapes with a local discretization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SimplexShape {
    Interval,
    Triangle,
    Tetrahedron,
}

impl SimplexShape {
    /// Shape of the given dimension, if any.
    pub fn from_dimensions(dims: usize) -> Option<Self> {
        match dims {
            1 => Some(Self::Interval),
            2 => Some(Self::Triangle),
            3 => Some(Self::Tetrahedron),
            _ => None,
        }
    }

    pub fn dimensions(self) -> usize {
        match self {
            Self::Interval => 1,
            Self::Triangle => 2,
            Self::Tetrahedron => 3,
        }
    }

    pub fn vertex_count(self) -> usize {
        self.dimensions() + 1
    }

    pub fn face_count(self) -> usize {
        self.dimensions() + 1
    }

    /// Element-local vertex tuples of each face.
    pub fn face_vertices(self) -> &'static [&'static [usize]] {
        match self {
            Self::Interval => &[&[0], &[1]],
            Self::Triangle => &[&[0, 1], &[1, 2], &[0, 2]],
            Self::Tetrahedron => &[&[0, 1, 2], &[0, 1, 3], &[0, 3, 2], &[1, 3, 2]],
        }
    }

    /// Vertex k of the unit simplex: vertex 0 is (-1, ..., -1), vertex k+1
    /// moves coordinate k to +1.
    pub fn unit_vertex(self, k: usize) -> Vec<f64> {
        let mut v = vec![-1.0; self.dimensions()];
        if k > 0 {
            v[k - 1] = 1.0;
        }
        v
    }

    /// Measure (length, area, volume) of the unit simplex.
    pub fn unit_measure(self) -> f64 {
        match self {
            Self::Interval => 2.0,
            Self::Triangle => 2.0,
            Self::Tetrahedron => 4.0 / 3.0,
        }
    }

    /// Measure of the unit simplex one dimension down; 1 for point faces.
    pub fn unit_face_measure(self) -> f64 {
        match self {
            Self::Interval => 1.0,
            Self::Triangle => 2.0,
            Self::Tetrahedron => 2.0,
        }
    }

    /// The shape of a face, `None` for the point faces of an interval.
    pub fn face_shape(self) -> Option<Self> {
        Self::from_dimensions(self.dimensions() - 1)
    }

    /// Number of nodes of an order-N nodal set: C(N + d, d).
    pub fn node_count(self, order: usize) -> usize {
        simplex_node_count(self.dimensions(), order)
    }

    /// Barycentric coordinates of a unit-coordinate point, vertex 0 first.
    pub fn barycentric(self, point: &[f64]) -> Vec<f64> {
        let mut bary: Vec<f64> = Vec::with_capacity(point.len() + 1);
        let tail: Vec<f64> = point.iter().map(|x| (x + 1.0) / 2.0).collect();
        bary.push(1.0 - tail.iter().sum::<f64>());
        bary.extend(tail);
        bary
    }
}

impl fmt::Display for SimplexShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interval => "interval",
            Self::Triangle => "triangle",
            Self::Tetrahedron => "tetrahedron",
        };
        write!(f, "{}", name)
    }
}

/// Number of non-negative integer `dims`-tuples summing to at most `order`.
pub fn simplex_node_count(dims: usize, order: usize) -> usize {
    // C(order + dims, dims)
    (1..=dims).fold(1, |acc, k| acc * (order + k) / k)
}

/// All non-negative integer `dims`-tuples with sum at most `order`.
///
/// The first component varies fastest. This ordering fixes the node and mode
/// numbering of every simplex discretization.
pub fn node_tuples(dims: usize, order: usize) -> Vec<Vec<usize>> {
    if dims == 0 {
        return vec![Vec::new()];
    }
    let mut tuples = Vec::with_capacity(simplex_node_count(dims, order));
    for last in 0..=order {
        for mut head in node_tuples(dims - 1, order - last) {
            head.push(last);
            tuples.push(head);
        }
    }
    tuples
}

/// Integer barycentric weights of a node tuple: (N - Σ idx, idx...).
pub fn barycentric_tuple(order: usize, tuple: &[usize]) -> Vec<usize> {
    let mut bary = Vec::with_capacity(tuple.len() + 1);
    bary.push(order - tuple.iter().sum::<usize>());
    bary.extend_from_slice(tuple);
    bary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_counts() {
        assert_eq!(SimplexShape::Interval.node_count(4), 5);
        assert_eq!(SimplexShape::Triangle.node_count(3), 10);
        assert_eq!(SimplexShape::Tetrahedron.node_count(3), 20);
        for order in 0..6 {
            assert_eq!(node_tuples(2, order).len(), (order + 1) * (order + 2) / 2);
            assert_eq!(node_tuples(3, order).len(), simplex_node_count(3, order));
        }
    }

    #[test]
    fn test_tuple_ordering_first_component_fastest() {
        let tuples = node_tuples(2, 2);
        assert_eq!(
            tuples,
            vec![
                vec![0, 0],
                vec![1, 0],
                vec![2, 0],
                vec![0, 1],
                vec![1, 1],
                vec![0, 2]
            ]
        );
    }

    #[test]
    fn test_unit_vertices_and_barycentric() {
        let shape = SimplexShape::Tetrahedron;
        for k in 0..4 {
            let bary = shape.barycentric(&shape.unit_vertex(k));
            for (j, b) in bary.iter().enumerate() {
                let expected = if j == k { 1.0 } else { 0.0 };
                assert!((b - expected).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn test_faces_cover_vertices_twice_in_triangle() {
        let mut counts = [0; 3];
        for face in SimplexShape::Triangle.face_vertices() {
            for &v in face.iter() {
                counts[v] += 1;
            }
        }
        assert_eq!(counts, [2, 2, 2]);
    }
}
