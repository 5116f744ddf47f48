//! Operator compilation and evaluation tests.
//!
//! Checks program memoization and compares compiled operators against the
//! reference matrices and exact derivatives of low-order polynomials.

use dg_discretization::mesh::TAG_ALL;
use dg_discretization::operators::{LocalMatrices, apply_add};
use dg_discretization::{
    DebugFlag, Discretization, DiscretizationError, Expr, FluxBinding, FluxExpr, OperatorArgs,
    Value, generators,
};

fn unit_square(order: usize) -> Discretization {
    let mesh = generators::make_rect_mesh([0.0, 0.0], [1.0, 1.0], [2, 3], [false; 2]).unwrap();
    Discretization::builder(mesh)
        .order(order)
        .quadrature("q", Some(2 * order))
        .build()
        .unwrap()
}

fn assert_close(a: &[f64], b: &[f64], tol: f64) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() < tol, "entry {}: {} vs {}", i, x, y);
    }
}

#[test]
fn test_structurally_equal_templates_compile_once() {
    let discr = unit_square(2);
    let before = discr.compile_count();

    let a = Expr::diff(0, Expr::field("u")) + Expr::field("v");
    let b = Expr::field("v") + Expr::diff(0, Expr::field("u")) * 1.0;
    discr.compile(&a).unwrap();
    assert_eq!(discr.compile_count(), before + 1);
    discr.compile(&a).unwrap();
    discr.compile(&b).unwrap();
    assert_eq!(discr.compile_count(), before + 1);

    discr.compile(&Expr::diff(1, Expr::field("u"))).unwrap();
    assert_eq!(discr.compile_count(), before + 2);
}

#[test]
fn test_undefined_quadrature_tag_rejected() {
    let discr = unit_square(2);
    let err = discr
        .compile(&Expr::upsample("undefined", Expr::field("u")))
        .unwrap_err();
    assert_eq!(err, DiscretizationError::UndefinedQuadratureTag("undefined".into()));
    assert_eq!(discr.compile_count(), 0);
}

#[test]
fn test_derivatives_exact_in_three_dimensions() {
    let mesh = generators::make_box_mesh([0.0; 3], [1.0, 2.0, 1.0], [2, 1, 2], [false; 3]).unwrap();
    let discr = Discretization::builder(mesh)
        .order(2)
        .debug(DebugFlag::DumpOpCode)
        .build()
        .unwrap();
    let u = discr.interpolate_volume_function(|x, _| x[0] * x[1] + x[2] * x[2] - 3.0 * x[0]);

    let grad = discr
        .compile_many(&[
            Expr::diff(0, Expr::field("u")),
            Expr::diff(1, Expr::field("u")),
            Expr::diff(2, Expr::field("u")),
        ])
        .unwrap();
    let values = grad.call(&OperatorArgs::new().field("u", &u)).unwrap();
    assert_eq!(values.len(), 3);

    let expected = [
        discr.interpolate_volume_function(|x, _| x[1] - 3.0),
        discr.interpolate_volume_function(|x, _| x[0]),
        discr.interpolate_volume_function(|x, _| 2.0 * x[2]),
    ];
    for (value, exact) in values.iter().zip(&expected) {
        assert_close(value.as_field().unwrap().data(), exact.data(), 1e-10);
    }
}

#[test]
fn test_lift_matches_reference_lift_matrices() {
    let discr = unit_square(3);
    let u = discr.interpolate_volume_function(|x, _| (2.0 * x[0]).sin() + x[1]);
    let binding = FluxBinding::boundary(FluxExpr::Int(0), vec![Expr::field("u")], TAG_ALL, vec![
        Expr::constant(0.0),
    ]);
    let lifted = discr
        .compile(&Expr::lift(binding))
        .unwrap()
        .call_field(&OperatorArgs::new().field("u", &u))
        .unwrap();

    let group = &discr.element_groups()[0];
    let matrices = LocalMatrices::new(&*group.ldis);
    assert_eq!(matrices.lift.len(), group.matrices.lift.len());
    let mut expected = vec![0.0; discr.node_count()];
    for ef in &discr.get_boundary(TAG_ALL).elements {
        let el = &discr.mesh().elements[ef.element];
        let range = discr.find_el_range(el.id);
        let scale = el.face_jacobians[ef.face] / el.jacobian().abs();
        let face_values: Vec<f64> = group.ldis.face_indices()[ef.face]
            .iter()
            .map(|&i| u.data()[range.start + i])
            .collect();
        apply_add(&matrices.lift[ef.face], scale, &face_values, &mut expected[range]);
    }
    assert_close(lifted.data(), &expected, 1e-11);
}

#[test]
fn test_quadrature_mass_matches_nodal_mass() {
    let discr = unit_square(2);
    let u = discr.interpolate_volume_function(|x, _| x[0] * x[1] + 1.0);
    let args = OperatorArgs::new().field("u", &u);

    // Down(Up(u) * 1) is the L2 projection of u, exact for polynomials
    let projected = discr
        .compile(&Expr::downsample("q", Expr::upsample("q", Expr::field("u")) * Expr::scalar("one")))
        .unwrap()
        .call_field(&args.clone().scalar("one", 1.0))
        .unwrap();
    assert_close(projected.data(), u.data(), 1e-12);

    // ∫ u² through quadrature and through the nodal mass matrix
    let quad = discr
        .compile(
            &Expr::mass(Expr::downsample(
                "q",
                Expr::upsample("q", Expr::field("u")) * Expr::upsample("q", Expr::field("u")),
            ))
            .nodal_sum(),
        )
        .unwrap()
        .call_single(&args)
        .unwrap();
    let nodal = discr.inner_product(&u, &u).unwrap();
    // ∫∫ (xy + 1)² = 1/9 + 1/2 + 1
    let exact = 1.0 / 9.0 + 0.5 + 1.0;
    match quad {
        Value::Scalar(q) => assert!((q - exact).abs() < 1e-12),
        Value::Field(_) => panic!("expected a scalar"),
    }
    assert!((nodal - exact).abs() < 1e-12);
}

#[test]
fn test_missing_operand_reported_at_call() {
    let discr = unit_square(1);
    let op = discr.compile(&(Expr::field("u") * Expr::scalar("c"))).unwrap();
    let u = discr.ones_on_volume();
    assert_eq!(
        op.call(&OperatorArgs::new().field("u", &u)).unwrap_err(),
        DiscretizationError::MissingOperand("c".into())
    );
    let scaled = op
        .call_field(&OperatorArgs::new().field("u", &u).scalar("c", 2.5))
        .unwrap();
    assert!(scaled.data().iter().all(|&v| v == 2.5));
}

#[test]
fn test_quadrature_flux_matches_nodal_flux_on_periodic_box() {
    let mesh = generators::make_box_mesh([0.0; 3], [1.0; 3], [2, 2, 2], [true; 3]).unwrap();
    let discr = Discretization::builder(mesh)
        .order(2)
        .quadrature("q", Some(5))
        .build()
        .unwrap();
    assert!(discr.get_boundary(TAG_ALL).elements.is_empty());

    // quadratic per element and discontinuous across every periodic face
    let u = discr.interpolate_volume_function(|x, _| 1.0 + x[0] - 2.0 * x[1] * x[2] + 0.5 * x[2] * x[2]);
    let args = OperatorArgs::new().field("u", &u);

    for axis in 0..3 {
        let flux = FluxExpr::Normal(axis) * (FluxExpr::Int(0) - FluxExpr::Ext(0)) * 0.5;
        let binding = FluxBinding::interior(flux, vec![Expr::field("u")]);

        let nodal = discr
            .compile(&Expr::lift(binding.clone()))
            .unwrap()
            .call_field(&args)
            .unwrap();
        let quad = discr
            .compile(&Expr::lift(binding.with_quadrature("q")))
            .unwrap()
            .call_field(&args)
            .unwrap();

        let largest = nodal.data().iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(largest > 1e-3, "axis {}: flux vanished", axis);
        assert_close(quad.data(), nodal.data(), 1e-11);
    }
}
