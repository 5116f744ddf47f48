//! Warp-and-blend interpolation nodes on the unit simplices.
//!
//! Start from the equidistant lattice, move every edge onto the
//! Gauss-Lobatto-Legendre distribution with the 1-D warp, and blend that
//! displacement into the interior. Nodes are built in equilateral coordinates
//! and mapped back to unit coordinates with the affine map that takes the
//! unit vertices onto the equilateral ones.
//!
//! The blend parameters α are the interpolation-optimal values; beyond the
//! tabulated orders a fixed value is used.

use super::shape::{SimplexShape, node_tuples};
use crate::mesh::AffineMap;
use crate::polynomial::{Warp, gauss_lobatto_nodes};

const TRIANGLE_ALPHA: [f64; 15] = [
    0.0000, 0.0000, 1.4152, 0.1001, 0.2751, 0.9800, 1.0999, 1.2832, 1.3648, 1.4773, 1.4959,
    1.5743, 1.5770, 1.6223, 1.6258,
];

const TETRAHEDRON_ALPHA: [f64; 15] = [
    0.0, 0.0, 0.0, 0.1002, 1.1332, 1.5608, 1.3413, 1.2577, 1.1603, 1.10153, 0.6080, 0.4523,
    0.8856, 0.8717, 0.9655,
];

const ON_FACE_TOL: f64 = 1e-10;

/// Unit-coordinate nodes of the order-N nodal set, in `node_tuples` order.
///
/// Dimension zero yields the single empty point. Order zero yields the
/// centroid.
pub fn unit_nodes(dims: usize, order: usize) -> Vec<Vec<f64>> {
    let Some(shape) = SimplexShape::from_dimensions(dims) else {
        return vec![Vec::new()];
    };

    if order == 0 {
        let centroid: f64 = -1.0 + 2.0 / (dims + 1) as f64;
        return vec![vec![centroid; dims]];
    }

    match shape {
        SimplexShape::Interval => gauss_lobatto_nodes(order).into_iter().map(|x| vec![x]).collect(),
        SimplexShape::Triangle => triangle_nodes(order),
        SimplexShape::Tetrahedron => tetrahedron_nodes(order),
    }
}

/// Equidistant barycentric coordinates (vertex 0 first) in tuple order.
fn equidistant_barycentrics(dims: usize, order: usize) -> Vec<Vec<f64>> {
    let n = order as f64;
    node_tuples(dims, order)
        .into_iter()
        .map(|tuple| {
            let mut bary = Vec::with_capacity(dims + 1);
            bary.push((order - tuple.iter().sum::<usize>()) as f64 / n);
            bary.extend(tuple.iter().map(|&i| i as f64 / n));
            bary
        })
        .collect()
}

fn to_unit(equilateral_vertices: &[&[f64]], points: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    // unit -> equilateral is affine; invert it
    let map = AffineMap::from_simplex_vertices(equilateral_vertices);
    let inverse = map
        .inverse()
        .unwrap_or_else(|| AffineMap::identity(map.dims));
    points.iter().map(|p| inverse.apply(p)).collect()
}

/// Warp of one triangle edge family, evaluated for barycentrics (l1, l2, l3).
///
/// Returns the displacement in the triangle's equilateral frame, whose x axis
/// runs from the l2 vertex to the l3 vertex.
fn triangle_shift(warp: &Warp, alpha: f64, l1: f64, l2: f64, l3: f64) -> (f64, f64) {
    let blend1 = 4.0 * l2 * l3;
    let blend2 = 4.0 * l1 * l3;
    let blend3 = 4.0 * l1 * l2;

    let warp1 = blend1 * warp.eval(l3 - l2) * (1.0 + (alpha * l1).powi(2));
    let warp2 = blend2 * warp.eval(l1 - l3) * (1.0 + (alpha * l2).powi(2));
    let warp3 = blend3 * warp.eval(l2 - l1) * (1.0 + (alpha * l3).powi(2));

    let (c2, s2) = ((2.0 * std::f64::consts::PI / 3.0).cos(), (2.0 * std::f64::consts::PI / 3.0).sin());
    let (c4, s4) = ((4.0 * std::f64::consts::PI / 3.0).cos(), (4.0 * std::f64::consts::PI / 3.0).sin());
    (warp1 + c2 * warp2 + c4 * warp3, s2 * warp2 + s4 * warp3)
}

fn triangle_nodes(order: usize) -> Vec<Vec<f64>> {
    let alpha = TRIANGLE_ALPHA.get(order - 1).copied().unwrap_or(5.0 / 3.0);
    let warp = Warp::new(order);
    let sqrt3 = 3f64.sqrt();

    // equilateral vertices of unit vertices 0, 1, 2
    let va = [-1.0, -1.0 / sqrt3];
    let vb = [1.0, -1.0 / sqrt3];
    let vc = [0.0, 2.0 / sqrt3];

    let points = equidistant_barycentrics(2, order)
        .into_iter()
        .map(|bary| {
            // l1 at vertex c, l2 at vertex a, l3 at vertex b
            let (l1, l2, l3) = (bary[2], bary[0], bary[1]);
            let x = -l2 + l3;
            let y = (-l2 - l3 + 2.0 * l1) / sqrt3;
            let (dx, dy) = triangle_shift(&warp, alpha, l1, l2, l3);
            vec![x + dx, y + dy]
        })
        .collect();

    to_unit(&[&va, &vb, &vc], points)
}

fn tetrahedron_nodes(order: usize) -> Vec<Vec<f64>> {
    let alpha = TETRAHEDRON_ALPHA.get(order - 1).copied().unwrap_or(1.0);
    let warp = Warp::new(order);
    let sqrt3 = 3f64.sqrt();
    let sqrt6 = 6f64.sqrt();

    let v1 = [-1.0, -1.0 / sqrt3, -1.0 / sqrt6];
    let v2 = [1.0, -1.0 / sqrt3, -1.0 / sqrt6];
    let v3 = [0.0, 2.0 / sqrt3, -1.0 / sqrt6];
    let v4 = [0.0, 0.0, 3.0 / sqrt6];

    let sub = |a: &[f64; 3], b: &[f64; 3]| [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    let mid = |a: &[f64; 3], b: &[f64; 3]| [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0];
    let normalize = |v: [f64; 3]| {
        let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        [v[0] / n, v[1] / n, v[2] / n]
    };

    // face tangents, one frame per face
    let t1 = [sub(&v2, &v1), sub(&v2, &v1), sub(&v3, &v2), sub(&v3, &v1)].map(normalize);
    let t2 = [
        sub(&v3, &mid(&v1, &v2)),
        sub(&v4, &mid(&v1, &v2)),
        sub(&v4, &mid(&v2, &v3)),
        sub(&v4, &mid(&v1, &v3)),
    ]
    .map(normalize);

    let points = equidistant_barycentrics(3, order)
        .into_iter()
        .map(|bary| {
            // l1 at vertex d, l2 at c, l3 at a, l4 at b
            let (l1, l2, l3, l4) = (bary[3], bary[2], bary[0], bary[1]);
            let mut xyz = [0.0; 3];
            for k in 0..3 {
                xyz[k] = l3 * v1[k] + l4 * v2[k] + l2 * v3[k] + l1 * v4[k];
            }

            let mut shift = [0.0; 3];
            for face in 0..4 {
                let (la, lb, lc, ld) = match face {
                    0 => (l1, l2, l3, l4),
                    1 => (l2, l1, l3, l4),
                    2 => (l3, l1, l4, l2),
                    _ => (l4, l1, l3, l2),
                };
                let (warp1, warp2) = triangle_shift(&warp, alpha, lb, lc, ld);

                let mut blend = lb * lc * ld;
                let denom = (lb + 0.5 * la) * (lc + 0.5 * la) * (ld + 0.5 * la);
                if denom > ON_FACE_TOL {
                    blend = (1.0 + (alpha * la).powi(2)) * blend / denom;
                }

                for k in 0..3 {
                    shift[k] += blend * warp1 * t1[face][k] + blend * warp2 * t2[face][k];
                }

                let positive = [lb, lc, ld].iter().filter(|&&l| l > ON_FACE_TOL).count();
                if la < ON_FACE_TOL && positive < 3 {
                    for k in 0..3 {
                        shift[k] = warp1 * t1[face][k] + warp2 * t2[face][k];
                    }
                }
            }

            (0..3).map(|k| xyz[k] + shift[k]).collect()
        })
        .collect();

    to_unit(&[&v1, &v2, &v3, &v4], points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::gauss_lobatto_nodes;

    fn contains(points: &[Vec<f64>], p: &[f64], tol: f64) -> bool {
        points
            .iter()
            .any(|q| q.iter().zip(p).all(|(a, b)| (a - b).abs() < tol))
    }

    #[test]
    fn test_triangle_vertices_are_nodes() {
        let nodes = unit_nodes(2, 4);
        assert_eq!(nodes.len(), 15);
        assert!((nodes[0][0] + 1.0).abs() < 1e-14 && (nodes[0][1] + 1.0).abs() < 1e-14);
        assert!(contains(&nodes, &[1.0, -1.0], 1e-13));
        assert!(contains(&nodes, &[-1.0, 1.0], 1e-13));
    }

    #[test]
    fn test_triangle_edge_nodes_are_gll() {
        let order = 5;
        let nodes = unit_nodes(2, order);
        let gll = gauss_lobatto_nodes(order);
        // edge s = -1 holds the first order+1 nodes, running from r = -1 to 1
        for i in 0..=order {
            assert!((nodes[i][1] + 1.0).abs() < 1e-13);
            assert!(
                (nodes[i][0] - gll[i]).abs() < 1e-13,
                "node {}: {} vs {}",
                i,
                nodes[i][0],
                gll[i]
            );
        }
    }

    #[test]
    fn test_triangle_nodes_symmetric_under_reflection() {
        // swapping r and s maps the node set onto itself
        let nodes = unit_nodes(2, 6);
        for p in &nodes {
            assert!(contains(&nodes, &[p[1], p[0]], 1e-12), "missing mirror of {:?}", p);
        }
    }

    #[test]
    fn test_tetrahedron_face_and_edge_nodes() {
        let order = 4;
        let tet = unit_nodes(3, order);
        let face: Vec<&Vec<f64>> = tet.iter().filter(|p| (p[2] + 1.0).abs() < 1e-12).collect();
        assert_eq!(face.len(), SimplexShape::Triangle.node_count(order));

        // edge r-axis carries the GLL points
        let gll = gauss_lobatto_nodes(order);
        for i in 0..=order {
            assert!((tet[i][0] - gll[i]).abs() < 1e-13);
            assert!((tet[i][1] + 1.0).abs() < 1e-13 && (tet[i][2] + 1.0).abs() < 1e-13);
        }
    }

    #[test]
    fn test_tetrahedron_nodes_symmetric_under_vertex_swap() {
        // swapping r and s exchanges vertices 1 and 2
        let nodes = unit_nodes(3, 4);
        for p in &nodes {
            assert!(contains(&nodes, &[p[1], p[0], p[2]], 1e-12), "missing mirror of {:?}", p);
        }
    }

    #[test]
    fn test_tetrahedron_nodes_inside() {
        let nodes = unit_nodes(3, 5);
        assert_eq!(nodes.len(), 56);
        for p in &nodes {
            let bary = SimplexShape::Tetrahedron.barycentric(p);
            assert!(bary.iter().all(|&b| b > -1e-12), "{:?} outside", p);
        }
    }
}
