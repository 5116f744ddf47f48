//! Affine maps x = A r + b between unit and physical coordinates.

/// An affine map in up to three dimensions.
///
/// Only the leading `dims × dims` block of `matrix` and the leading `dims`
/// entries of `vector` are meaningful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    pub dims: usize,
    pub matrix: [[f64; 3]; 3],
    pub vector: [f64; 3],
}

impl AffineMap {
    pub fn identity(dims: usize) -> Self {
        let mut matrix = [[0.0; 3]; 3];
        for (i, row) in matrix.iter_mut().enumerate().take(dims) {
            row[i] = 1.0;
        }
        Self {
            dims,
            matrix,
            vector: [0.0; 3],
        }
    }

    /// Map from the unit simplex onto the simplex with the given vertices.
    ///
    /// Unit vertex 0 is (-1, ..., -1) and unit vertex k+1 is -1 + 2 e_k, so
    /// column k of the matrix is (v_{k+1} - v_0) / 2 and the offset is the
    /// image of the unit origin.
    pub fn from_simplex_vertices(vertices: &[&[f64]]) -> Self {
        let dims = vertices.len() - 1;
        let v0 = vertices[0];
        let mut matrix = [[0.0; 3]; 3];
        let mut vector = [0.0; 3];
        for i in 0..dims {
            vector[i] = v0[i];
            for k in 0..dims {
                let column = (vertices[k + 1][i] - v0[i]) / 2.0;
                matrix[i][k] = column;
                vector[i] += column;
            }
        }
        Self {
            dims,
            matrix,
            vector,
        }
    }

    pub fn apply(&self, r: &[f64]) -> Vec<f64> {
        (0..self.dims)
            .map(|i| {
                self.vector[i]
                    + (0..self.dims)
                        .map(|k| self.matrix[i][k] * r[k])
                        .sum::<f64>()
            })
            .collect()
    }

    /// Apply only the linear part.
    pub fn apply_linear(&self, r: &[f64]) -> Vec<f64> {
        (0..self.dims)
            .map(|i| (0..self.dims).map(|k| self.matrix[i][k] * r[k]).sum())
            .collect()
    }

    /// Determinant of the linear part.
    pub fn jacobian(&self) -> f64 {
        let m = &self.matrix;
        match self.dims {
            0 => 1.0,
            1 => m[0][0],
            2 => m[0][0] * m[1][1] - m[0][1] * m[1][0],
            _ => {
                m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
                    - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
                    + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
            }
        }
    }

    /// Inverse map. Returns `None` when the map is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.jacobian();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let m = &self.matrix;
        let mut inv = [[0.0; 3]; 3];
        match self.dims {
            1 => inv[0][0] = 1.0 / m[0][0],
            2 => {
                inv[0][0] = m[1][1] / det;
                inv[0][1] = -m[0][1] / det;
                inv[1][0] = -m[1][0] / det;
                inv[1][1] = m[0][0] / det;
            }
            3 => {
                for i in 0..3 {
                    for j in 0..3 {
                        // cofactor of (j, i)
                        let (r0, r1) = ((j + 1) % 3, (j + 2) % 3);
                        let (c0, c1) = ((i + 1) % 3, (i + 2) % 3);
                        inv[i][j] = (m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]) / det;
                    }
                }
            }
            _ => return None,
        }

        let mut vector = [0.0; 3];
        for i in 0..self.dims {
            vector[i] = -(0..self.dims).map(|k| inv[i][k] * self.vector[k]).sum::<f64>();
        }
        Some(Self {
            dims: self.dims,
            matrix: inv,
            vector,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_map_hits_vertices() {
        let v = [[0.0, 0.0], [2.0, 0.0], [0.5, 1.5]];
        let map = AffineMap::from_simplex_vertices(&[&v[0], &v[1], &v[2]]);
        let unit = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0]];
        for (u, p) in unit.iter().zip(v.iter()) {
            let x = map.apply(u);
            assert!((x[0] - p[0]).abs() < 1e-14 && (x[1] - p[1]).abs() < 1e-14);
        }
        // area 1.5 over unit area 2
        assert!((map.jacobian() - 0.75).abs() < 1e-14);
    }

    #[test]
    fn test_inverse_roundtrip_3d() {
        let v = [
            [0.1, 0.0, 0.2],
            [1.0, 0.3, 0.0],
            [0.2, 1.1, 0.1],
            [0.0, 0.2, 0.9],
        ];
        let map = AffineMap::from_simplex_vertices(&[&v[0], &v[1], &v[2], &v[3]]);
        let inv = map.inverse().unwrap();
        let r = [0.3, -0.2, -0.5];
        let back = inv.apply(&map.apply(&r));
        for k in 0..3 {
            assert!((back[k] - r[k]).abs() < 1e-13, "{:?}", back);
        }
        assert!((map.jacobian() * inv.jacobian() - 1.0).abs() < 1e-13);
    }

    #[test]
    fn test_singular_map_has_no_inverse() {
        let v = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        let map = AffineMap::from_simplex_vertices(&[&v[0], &v[1], &v[2]]);
        assert!(map.inverse().is_none());
    }
}
