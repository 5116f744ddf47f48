//! Structured simplicial mesh generators.
//!
//! Each generator tags the sides of its box-shaped domain with
//! [`side_tag`] names (`minus_x`, `plus_x`, ...) and optionally identifies
//! opposite sides periodically. Periodic sides disappear from every tag,
//! including [`TAG_ALL`](super::TAG_ALL).

use super::boundary_tags::{Side, periodic_tags, side_tag};
use super::conformal::{Mesh, MeshBuilder};
use crate::error::{DiscretizationError, Result};
use itertools::Itertools;

/// Tagger that marks faces lying entirely on a side of `[a, b]`.
fn box_tagger(a: Vec<f64>, b: Vec<f64>) -> impl Fn(&[usize], &[Vec<f64>]) -> Vec<String> {
    move |face, points| {
        let mut tags = Vec::new();
        for axis in 0..a.len() {
            let tol = 1e-12 * (b[axis] - a[axis]).abs().max(1.0);
            for (side, value) in [(Side::Minus, a[axis]), (Side::Plus, b[axis])] {
                if face.iter().all(|&v| (points[v][axis] - value).abs() <= tol) {
                    tags.push(side_tag(axis, side));
                }
            }
        }
        tags
    }
}

fn check_extent(a: &[f64], b: &[f64], n: &[usize]) -> Result<()> {
    for axis in 0..a.len() {
        if n[axis] == 0 {
            return Err(DiscretizationError::InvalidConfig(format!(
                "axis {} needs at least one cell",
                axis
            )));
        }
        if b[axis] <= a[axis] {
            return Err(DiscretizationError::InvalidConfig(format!(
                "axis {}: upper bound {} not above lower bound {}",
                axis, b[axis], a[axis]
            )));
        }
    }
    Ok(())
}

fn finish(builder: MeshBuilder, a: &[f64], b: &[f64], periodic: &[bool]) -> Result<Mesh> {
    let mut builder = builder.with_boundary_tagger(box_tagger(a.to_vec(), b.to_vec()));
    for (axis, _) in periodic.iter().enumerate().filter(|(_, p)| **p) {
        let (minus, plus) = periodic_tags(axis);
        builder = builder.with_periodic_axis(axis, minus, plus);
    }
    builder.build()
}

/// `n` equal intervals on `[a, b]`.
pub fn make_uniform_interval_mesh(a: f64, b: f64, n: usize, periodic: bool) -> Result<Mesh> {
    check_extent(&[a], &[b], &[n])?;
    let dx = (b - a) / n as f64;
    let points = (0..=n).map(|i| vec![a + i as f64 * dx]).collect();
    let elements = (0..n).map(|i| vec![i, i + 1]).collect();
    finish(MeshBuilder::new(points, elements), &[a], &[b], &[periodic])
}

/// `[a, b]` split into `n[0] × n[1]` cells of two counter-clockwise triangles.
pub fn make_rect_mesh(a: [f64; 2], b: [f64; 2], n: [usize; 2], periodic: [bool; 2]) -> Result<Mesh> {
    check_extent(&a, &b, &n)?;
    let [nx, ny] = n;
    let points = (0..=ny)
        .cartesian_product(0..=nx)
        .map(|(j, i)| {
            vec![
                a[0] + (b[0] - a[0]) * i as f64 / nx as f64,
                a[1] + (b[1] - a[1]) * j as f64 / ny as f64,
            ]
        })
        .collect();
    let vertex = |i: usize, j: usize| j * (nx + 1) + i;

    let mut elements = Vec::with_capacity(2 * nx * ny);
    for (j, i) in (0..ny).cartesian_product(0..nx) {
        let (v00, v10, v11, v01) = (vertex(i, j), vertex(i + 1, j), vertex(i + 1, j + 1), vertex(i, j + 1));
        elements.push(vec![v00, v10, v11]);
        elements.push(vec![v00, v11, v01]);
    }
    finish(MeshBuilder::new(points, elements), &a, &b, &periodic)
}

/// `[a, b]` split into `n[0] × n[1] × n[2]` cubes of six Kuhn tetrahedra.
///
/// Every cube is cut along its main diagonal the same way, so the face
/// triangulations of neighbouring and of opposite periodic cubes agree.
pub fn make_box_mesh(a: [f64; 3], b: [f64; 3], n: [usize; 3], periodic: [bool; 3]) -> Result<Mesh> {
    check_extent(&a, &b, &n)?;
    let [nx, ny, nz] = n;
    let points = (0..=nz)
        .cartesian_product(0..=ny)
        .cartesian_product(0..=nx)
        .map(|((k, j), i)| {
            vec![
                a[0] + (b[0] - a[0]) * i as f64 / nx as f64,
                a[1] + (b[1] - a[1]) * j as f64 / ny as f64,
                a[2] + (b[2] - a[2]) * k as f64 / nz as f64,
            ]
        })
        .collect();
    let vertex = |c: [usize; 3]| (c[2] * (ny + 1) + c[1]) * (nx + 1) + c[0];

    let mut elements = Vec::with_capacity(6 * nx * ny * nz);
    for ((k, j), i) in (0..nz).cartesian_product(0..ny).cartesian_product(0..nx) {
        for axes in (0..3).permutations(3) {
            let mut corner = [i, j, k];
            let mut tet = vec![vertex(corner)];
            for &axis in &axes {
                corner[axis] += 1;
                tet.push(vertex(corner));
            }
            elements.push(tet);
        }
    }
    finish(MeshBuilder::new(points, elements), &a, &b, &periodic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TAG_ALL;

    #[test]
    fn test_interval_mesh() {
        let mesh = make_uniform_interval_mesh(0.0, 1.0, 4, false).unwrap();
        assert_eq!(mesh.element_count(), 4);
        assert_eq!(mesh.interfaces.len(), 3);
        assert_eq!(mesh.boundary_faces(TAG_ALL).len(), 2);
        assert_eq!(mesh.boundary_faces("minus_x").len(), 1);

        let periodic = make_uniform_interval_mesh(0.0, 1.0, 4, true).unwrap();
        assert_eq!(periodic.interfaces.len(), 4);
        assert!(periodic.boundary_faces(TAG_ALL).is_empty());
    }

    #[test]
    fn test_rect_mesh_counts() {
        let mesh = make_rect_mesh([0.0, 0.0], [2.0, 1.0], [3, 2], [false, false]).unwrap();
        assert_eq!(mesh.element_count(), 12);
        assert_eq!(mesh.boundary_faces(TAG_ALL).len(), 10);
        assert_eq!(mesh.boundary_faces("plus_y").len(), 3);
        let area: f64 = mesh.elements.iter().map(|e| e.volume()).sum();
        assert!((area - 2.0).abs() < 1e-12);
        assert!(mesh.elements.iter().all(|e| e.jacobian() > 0.0));
    }

    #[test]
    fn test_rect_mesh_periodic_x() {
        let mesh = make_rect_mesh([0.0, 0.0], [1.0, 1.0], [2, 2], [true, false]).unwrap();
        assert!(mesh.boundary_faces("minus_x").is_empty());
        assert_eq!(mesh.boundary_faces("minus_y").len(), 2);
        assert_eq!(mesh.boundary_faces(TAG_ALL).len(), 4);
        assert_eq!(mesh.periodic_opposite_faces.len(), 4);
    }

    #[test]
    fn test_box_mesh_volume_and_faces() {
        let mesh = make_box_mesh([0.0; 3], [1.0, 2.0, 1.0], [2, 2, 2], [false; 3]).unwrap();
        assert_eq!(mesh.element_count(), 48);
        let volume: f64 = mesh.elements.iter().map(|e| e.volume()).sum();
        assert!((volume - 2.0).abs() < 1e-12);
        // 6 sides × 4 cells × 2 triangles
        assert_eq!(mesh.boundary_faces(TAG_ALL).len(), 48);
    }

    #[test]
    fn test_fully_periodic_box_has_no_boundary() {
        let mesh = make_box_mesh([0.0; 3], [1.0; 3], [2, 2, 2], [true; 3]).unwrap();
        assert!(mesh.boundary_faces(TAG_ALL).is_empty());
        // every face is an interface
        assert_eq!(mesh.interfaces.len() * 2, 4 * mesh.element_count());
    }

    #[test]
    fn test_rejects_empty_axis() {
        assert!(make_rect_mesh([0.0, 0.0], [1.0, 1.0], [0, 2], [false, false]).is_err());
    }
}
