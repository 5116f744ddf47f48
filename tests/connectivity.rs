//! Face connectivity tests.
//!
//! Verifies matched face node index lists, boundary node sets and the
//! interface consistency checks on small hand-built and generated meshes.

use dg_discretization::mesh::{TAG_ALL, side_tag, Side};
use dg_discretization::{
    DebugFlag, Discretization, DiscretizationError, ErrorCategory, MatchTolerances, MeshBuilder,
    generators,
};

fn two_triangles() -> dg_discretization::Mesh {
    MeshBuilder::new(
        vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
        vec![vec![0, 1, 2], vec![1, 3, 2]],
    )
    .build()
    .unwrap()
}

fn max_matched_distance(discr: &Discretization) -> f64 {
    let mut worst: f64 = 0.0;
    for group in discr.interior_face_groups() {
        for pair in &group.face_pairs {
            if pair.periodic_axis.is_some() {
                continue;
            }
            let int_list = group.index_list(pair.int_side.face_index_list_number);
            let ext_list = group.index_list(pair.ext_side.face_index_list_number);
            for (&i, &j) in int_list.iter().zip(ext_list) {
                let xi = discr.node(pair.int_side.el_base_index + i);
                let xj = discr.node(pair.ext_side.el_base_index + j);
                let d = xi
                    .iter()
                    .zip(xj)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                worst = worst.max(d);
            }
        }
    }
    worst
}

#[test]
fn test_two_triangles_single_interior_pair() {
    let discr = Discretization::builder(two_triangles()).order(2).build().unwrap();

    let groups = discr.interior_face_groups();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert!(group.double_sided);
    assert_eq!(group.len(), 1);
    assert_eq!(group.face_node_count, 3);

    let pair = &group.face_pairs[0];
    let int_geom = pair.int_side.geometry.as_ref().unwrap();
    let ext_geom = pair.ext_side.geometry.as_ref().unwrap();
    assert_eq!(int_geom.h, ext_geom.h);
    assert_eq!(group.index_list(pair.int_side.face_index_list_number).len(), 3);
    assert_eq!(group.index_list(pair.ext_side.face_index_list_number).len(), 3);

    // the shared diagonal points out of one element and into the other
    for (a, b) in int_geom.normal.iter().zip(&ext_geom.normal) {
        assert!((a + b).abs() < 1e-14);
    }
    assert!(max_matched_distance(&discr) < 1e-14);
}

#[test]
fn test_matched_nodes_coincide_on_generated_meshes() {
    let rect = generators::make_rect_mesh([0.0, 0.0], [1.0, 2.0], [3, 2], [false; 2]).unwrap();
    let cube = generators::make_box_mesh([0.0; 3], [1.0; 3], [2, 2, 2], [false; 3]).unwrap();
    for (mesh, order) in [(rect, 4), (cube, 3)] {
        let discr = Discretization::builder(mesh)
            .order(order)
            .debug(DebugFlag::NodePermutation)
            .build()
            .unwrap();
        assert!(max_matched_distance(&discr) < 1e-13);
    }
}

#[test]
fn test_periodic_box_has_empty_all_boundary() {
    let mesh = generators::make_box_mesh([0.0; 3], [1.0; 3], [2, 2, 2], [true; 3]).unwrap();
    let discr = Discretization::builder(mesh)
        .order(2)
        .debug(DebugFlag::NodePermutation)
        .build()
        .unwrap();

    let all = discr.get_boundary(TAG_ALL);
    assert!(all.is_empty());
    assert!(all.face_groups.is_empty());

    let periodic_pairs = discr.interior_face_groups()[0]
        .face_pairs
        .iter()
        .filter(|p| p.periodic_axis.is_some())
        .count();
    // 2 x 2 faces per cube side, 2 triangles each, one side per axis
    assert_eq!(periodic_pairs, 3 * 4 * 2);
}

#[test]
fn test_boundary_node_sets() {
    let mesh = generators::make_rect_mesh([0.0, 0.0], [1.0, 1.0], [2, 2], [false; 2]).unwrap();
    let discr = Discretization::builder(mesh).order(3).build().unwrap();

    let all = discr.get_boundary(TAG_ALL);
    // 8 boundary edges, 4 nodes each
    assert_eq!(all.node_count(), 32);
    assert_eq!(all.face_groups.len(), 1);
    assert_eq!(all.face_groups[0].len(), 8);
    for i in 0..all.node_count() {
        let x = all.node(i);
        let on_edge = [x[0], x[1], 1.0 - x[0], 1.0 - x[1]]
            .iter()
            .any(|d| d.abs() < 1e-13);
        assert!(on_edge, "boundary node {:?} not on the square's edge", x);
    }

    let left = discr.get_boundary(&side_tag(0, Side::Minus));
    assert_eq!(left.node_count(), 8);
    for i in 0..left.node_count() {
        assert!(left.node(i)[0].abs() < 1e-14);
    }

    // repeated lookups share one boundary
    assert!(std::sync::Arc::ptr_eq(&left, &discr.get_boundary(&side_tag(0, Side::Minus))));
}

#[test]
fn test_unknown_tag_gives_empty_boundary() {
    let discr = Discretization::builder(two_triangles()).order(1).build().unwrap();
    let boundary = discr.get_boundary("no_such_tag");
    assert!(boundary.is_empty());
    assert_eq!(boundary.node_count(), 0);
    assert!(boundary.face_groups.is_empty());
    assert!(discr.boundary_zeros::<f64>("no_such_tag", &[]).is_empty());
}

#[test]
fn test_consistency_checks_report_violations() {
    let strict_jacobian = MatchTolerances {
        face_jacobian_relative: -1.0,
        ..MatchTolerances::default()
    };
    let err = Discretization::builder(two_triangles())
        .order(1)
        .tolerances(strict_jacobian)
        .build()
        .unwrap_err();
    assert!(matches!(err, DiscretizationError::FaceJacobianMismatch { .. }));
    assert_eq!(err.category(), ErrorCategory::Consistency);

    let strict_nodes = MatchTolerances {
        node_distance: -1.0,
        ..MatchTolerances::default()
    };
    // the node check only runs when requested
    assert!(
        Discretization::builder(two_triangles())
            .order(1)
            .tolerances(strict_nodes)
            .build()
            .is_ok()
    );
    let err = Discretization::builder(two_triangles())
        .order(1)
        .tolerances(strict_nodes)
        .debug(DebugFlag::NodePermutation)
        .build()
        .unwrap_err();
    assert!(matches!(err, DiscretizationError::NodePermutationMismatch { .. }));
}

#[test]
fn test_index_lists_shared_between_pairs() {
    let mesh = generators::make_rect_mesh([0.0, 0.0], [1.0, 1.0], [4, 4], [true, true]).unwrap();
    let discr = Discretization::builder(mesh).order(2).build().unwrap();
    let group = &discr.interior_face_groups()[0];
    // every edge of the periodic 4 x 4 grid is interior
    assert_eq!(group.len(), 3 * 32 / 2);
    // lists depend on face number and shuffle only
    assert!(group.index_lists.len() <= 3 + 2 * 3 * 2);
    for pair in &group.face_pairs {
        let wm = pair.ext_native_write_map.unwrap();
        assert_eq!(group.index_list(wm).len(), group.face_node_count);
    }
}
