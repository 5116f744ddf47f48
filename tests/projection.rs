//! Projection and point evaluation tests.

use dg_discretization::{Discretization, DiscretizationError, ErrorCategory, Projector, generators};
use proptest::prelude::*;
use std::sync::Arc;

fn pair(low: usize, high: usize) -> (Discretization, Discretization) {
    let mesh = Arc::new(generators::make_rect_mesh([-1.0, 0.0], [1.0, 1.0], [2, 2], [false; 2]).unwrap());
    (
        Discretization::builder(mesh.clone()).order(low).build().unwrap(),
        Discretization::builder(mesh).order(high).build().unwrap(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_up_then_down_is_identity(c in prop::collection::vec(-10.0f64..10.0, 6)) {
        let (coarse, fine) = pair(2, 4);
        let f = |x: &[f64]| {
            c[0] + c[1] * x[0] + c[2] * x[1] + c[3] * x[0] * x[0] + c[4] * x[0] * x[1] + c[5] * x[1] * x[1]
        };
        let u = coarse.interpolate_volume_function(|x, _| f(x));
        let up = Projector::new(&coarse, &fine).unwrap().project(&u).unwrap();
        let down = Projector::new(&fine, &coarse).unwrap().project(&up).unwrap();
        for (p, q) in down.data().iter().zip(u.data()) {
            prop_assert!((p - q).abs() < 1e-10 * (1.0 + q.abs()));
        }
    }

    #[test]
    fn prop_point_evaluation_matches_polynomial(x in -1.0f64..1.0, y in 0.0f64..1.0) {
        let (discr, _) = pair(2, 3);
        let f = |p: &[f64]| 1.0 + p[0] * p[1] - 2.0 * p[1] * p[1];
        let u = discr.interpolate_volume_function(|p, _| f(p));
        let evaluator = discr.get_point_evaluator(&[x, y]).unwrap();
        let value = evaluator.evaluate(&u).unwrap();
        prop_assert_eq!(value.len(), 1);
        prop_assert!((value[0] - f(&[x, y])).abs() < 1e-11);
    }
}

#[test]
fn test_projection_keeps_vector_components() {
    let (coarse, fine) = pair(1, 3);
    let x = coarse.interpolate_volume_function(|p, _| p[0]);
    let y = coarse.interpolate_volume_function(|p, _| 2.0 - p[1]);
    let field = dg_discretization::FieldArray::from_components(vec![x.into_data(), y.into_data()]).unwrap();

    let projected = Projector::new(&coarse, &fine).unwrap().project(&field).unwrap();
    assert_eq!(projected.shape(), &[2]);
    assert_eq!(projected.len(), fine.node_count());
    for i in 0..fine.node_count() {
        let p = fine.node(i);
        assert!((projected.component(0)[i] - p[0]).abs() < 1e-12);
        assert!((projected.component(1)[i] - (2.0 - p[1])).abs() < 1e-12);
    }
}

#[test]
fn test_projection_errors() {
    let (coarse, fine) = pair(1, 2);
    let wrong = fine.ones_on_volume();
    let err = Projector::new(&coarse, &fine).unwrap().project(&wrong).unwrap_err();
    assert!(matches!(err, DiscretizationError::ShapeMismatch { .. }));

    let other = Discretization::builder(generators::make_uniform_interval_mesh(0.0, 1.0, 4, false).unwrap())
        .order(1)
        .build()
        .unwrap();
    let err = Projector::new(&coarse, &other).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Shape);
}

#[test]
fn test_point_outside_is_not_found() {
    let (discr, _) = pair(1, 2);
    let err = discr.get_point_evaluator(&[3.0, 0.5]).unwrap_err();
    assert_eq!(err, DiscretizationError::PointNotFound(vec![3.0, 0.5]));
}
