//! Face flux kernels.
//!
//! A flux is evaluated pointwise at aligned face nodes of each face pair and
//! integrated against the face basis of every real side: on nodal faces with
//! the face mass matrix, on quadrature faces with the face weights and the
//! face interpolation matrix. The exterior side evaluates the same flux with
//! interior and exterior swapped and writes back through the pair's
//! write map, so each side's contribution lands in its own face order.

use crate::discretization::{Discretization, FaceGeometry};
use crate::error::Result;
use crate::local::LocalQuadratureInfo;
use crate::operators::apply;
use crate::optemplate::FluxExpr;
use faer::Mat;

/// Exterior data of a boundary flux operand.
pub(crate) enum FaceOperands<'a> {
    Constant(f64),
    /// Boundary field values.
    Nodes(&'a [f64]),
}

fn eval(flux: &FluxExpr, int: &[Vec<f64>], ext: &[Vec<f64>], i: usize, geometry: &FaceGeometry) -> f64 {
    match flux {
        FluxExpr::Int(k) => int[*k][i],
        FluxExpr::Ext(k) => ext[*k][i],
        FluxExpr::Normal(axis) => geometry.normal[*axis],
        FluxExpr::PenaltyTerm(power) => {
            let order = geometry.order as f64;
            (order * order / geometry.h).powf(power.0)
        }
        FluxExpr::Constant(c) => c.0,
        FluxExpr::Sum(terms) => terms.iter().map(|t| eval(t, int, ext, i, geometry)).sum(),
        FluxExpr::Product(factors) => factors.iter().map(|t| eval(t, int, ext, i, geometry)).product(),
        FluxExpr::IfPositive {
            condition,
            then,
            otherwise,
        } => {
            if eval(condition, int, ext, i, geometry) > 0.0 {
                eval(then, int, ext, i, geometry)
            } else {
                eval(otherwise, int, ext, i, geometry)
            }
        }
    }
}

/// `values[k][base + list[i]]` for every operand k.
fn gather(values: &[&[f64]], base: usize, list: &[usize]) -> Vec<Vec<f64>> {
    values
        .iter()
        .map(|v| list.iter().map(|&i| v[base + i]).collect())
        .collect()
}

/// out[base + list[j]] += J_f Σ_i M_f[j, i] flux[i]
fn lift_nodal(out: &mut [f64], face_mass: &Mat<f64>, face_jacobian: f64, base: usize, list: &[usize], flux: &[f64]) {
    for (j, &node) in list.iter().enumerate() {
        let mut sum = 0.0;
        for (i, &f) in flux.iter().enumerate() {
            sum += face_mass[(j, i)] * f;
        }
        out[base + node] += face_jacobian * sum;
    }
}

/// out_el += J_f I_f^T (w ⊙ flux)
fn lift_quadrature(out: &mut [f64], el_out: std::ops::Range<usize>, local: &LocalQuadratureInfo, geometry: &FaceGeometry, flux: &[f64]) {
    let interp = &local.face_up_interp[geometry.face_id];
    for (j, o) in out[el_out].iter_mut().enumerate() {
        let mut sum = 0.0;
        for (i, (&f, &w)) in flux.iter().zip(&local.face_weights).enumerate() {
            sum += interp[(i, j)] * w * f;
        }
        *o += geometry.face_jacobian * sum;
    }
}

/// Surface integral of `flux` over all interior faces, on face nodes.
pub(crate) fn interior_flux(discr: &Discretization, flux: &FluxExpr, volume: &[&[f64]]) -> Vec<f64> {
    let mut out = vec![0.0; discr.node_count()];
    let swapped = flux.swap_sides();
    for fg in discr.interior_face_groups() {
        for pair in &fg.face_pairs {
            let (Some(gi), Some(ge), Some(write_map)) =
                (&pair.int_side.geometry, &pair.ext_side.geometry, pair.ext_native_write_map)
            else {
                continue;
            };
            let int_list = fg.index_list(pair.int_side.face_index_list_number);
            let ext_list = fg.index_list(pair.ext_side.face_index_list_number);
            let int_vals = gather(volume, pair.int_side.el_base_index, int_list);
            let ext_vals = gather(volume, pair.ext_side.el_base_index, ext_list);
            let nf = int_list.len();

            let f_int: Vec<f64> = (0..nf).map(|i| eval(flux, &int_vals, &ext_vals, i, gi)).collect();
            lift_nodal(
                &mut out,
                fg.ldis.face_mass_matrix(gi.face_id),
                gi.face_jacobian,
                pair.int_side.el_base_index,
                int_list,
                &f_int,
            );

            let write_map = fg.index_list(write_map);
            let mut f_ext = vec![0.0; nf];
            for i in 0..nf {
                f_ext[write_map[i]] = eval(&swapped, &int_vals, &ext_vals, i, ge);
            }
            lift_nodal(
                &mut out,
                fg.ldis.face_mass_matrix(ge.face_id),
                ge.face_jacobian,
                pair.ext_side.el_base_index,
                &fg.ldis.face_indices()[ge.face_id],
                &f_ext,
            );
        }
    }
    out
}

/// Surface integral of `flux` over the faces of boundary `tag`.
pub(crate) fn boundary_flux(
    discr: &Discretization,
    flux: &FluxExpr,
    volume: &[&[f64]],
    tag: &str,
    exterior: &[FaceOperands<'_>],
) -> Vec<f64> {
    let mut out = vec![0.0; discr.node_count()];
    let boundary = discr.get_boundary(tag);
    for fg in &boundary.face_groups {
        for pair in &fg.face_pairs {
            let Some(gi) = &pair.int_side.geometry else {
                continue;
            };
            let int_list = fg.index_list(pair.int_side.face_index_list_number);
            let ext_list = fg.index_list(pair.ext_side.face_index_list_number);
            let nf = int_list.len();
            let int_vals = gather(volume, pair.int_side.el_base_index, int_list);
            let ext_vals: Vec<Vec<f64>> = exterior
                .iter()
                .map(|e| match e {
                    FaceOperands::Constant(v) => vec![*v; nf],
                    FaceOperands::Nodes(values) => ext_list
                        .iter()
                        .map(|&i| values[pair.ext_side.el_base_index + i])
                        .collect(),
                })
                .collect();

            let f_int: Vec<f64> = (0..nf).map(|i| eval(flux, &int_vals, &ext_vals, i, gi)).collect();
            lift_nodal(
                &mut out,
                fg.ldis.face_mass_matrix(gi.face_id),
                gi.face_jacobian,
                pair.int_side.el_base_index,
                int_list,
                &f_int,
            );
        }
    }
    out
}

/// Surface integral of `flux` over all interior faces, on the face
/// quadrature nodes of `tag`.
pub(crate) fn quadrature_flux(
    discr: &Discretization,
    flux: &FluxExpr,
    volume: &[&[f64]],
    tag: &str,
) -> Result<Vec<f64>> {
    let info = discr.get_quadrature_info(tag)?;
    let groups = discr.element_groups();

    // operands on the face quadrature nodes of every element
    let face_values: Vec<Vec<f64>> = volume
        .iter()
        .map(|u| {
            let mut values = vec![0.0; info.int_faces_node_count];
            for (g, group) in groups.iter().enumerate() {
                let local = &info.local[g];
                let nfq = local.face_node_count;
                for (p, range) in group.ranges.iter().enumerate() {
                    let base = info.el_faces_ranges[g].range(p).start;
                    for (f, interp) in local.face_up_interp.iter().enumerate() {
                        let start = base + f * nfq;
                        apply(interp, &u[range.clone()], &mut values[start..start + nfq]);
                    }
                }
            }
            values
        })
        .collect();
    let face_values: Vec<&[f64]> = face_values.iter().map(Vec::as_slice).collect();

    let mut out = vec![0.0; discr.node_count()];
    let swapped = flux.swap_sides();
    for fg in &info.face_groups {
        let Some(local) = &fg.quadrature else {
            continue;
        };
        for pair in &fg.face_pairs {
            let (Some(gi), Some(ge), Some(write_map)) =
                (&pair.int_side.geometry, &pair.ext_side.geometry, pair.ext_native_write_map)
            else {
                continue;
            };
            let int_list = fg.index_list(pair.int_side.face_index_list_number);
            let ext_list = fg.index_list(pair.ext_side.face_index_list_number);
            let int_vals = gather(&face_values, pair.int_side.el_base_index, int_list);
            let ext_vals = gather(&face_values, pair.ext_side.el_base_index, ext_list);
            let nfq = int_list.len();

            let f_int: Vec<f64> = (0..nfq).map(|i| eval(flux, &int_vals, &ext_vals, i, gi)).collect();
            lift_quadrature(&mut out, discr.find_el_range(gi.element_id), local, gi, &f_int);

            let write_map = fg.index_list(write_map);
            let mut f_ext = vec![0.0; nfq];
            for i in 0..nfq {
                f_ext[write_map[i]] = eval(&swapped, &int_vals, &ext_vals, i, ge);
            }
            lift_quadrature(&mut out, discr.find_el_range(ge.element_id), local, ge, &f_ext);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use crate::discretization::Discretization;
    use crate::executor::OperatorArgs;
    use crate::mesh::{TAG_ALL, make_rect_mesh};
    use crate::optemplate::{Expr, FluxBinding, FluxExpr};

    fn periodic_square(order: usize) -> Discretization {
        let mesh = make_rect_mesh([0.0, 0.0], [1.0, 1.0], [3, 3], [true; 2]).unwrap();
        Discretization::builder(mesh)
            .order(order)
            .quadrature("q", Some(2 * order + 1))
            .build()
            .unwrap()
    }

    fn central_x() -> FluxExpr {
        (FluxExpr::Int(0) + FluxExpr::Ext(0)) * FluxExpr::Normal(0) * 0.5
    }

    #[test]
    fn test_jump_of_continuous_field_vanishes() {
        // periodic in value along x only
        let f = |x: &[f64]| 1.0 + x[0] * (1.0 - x[0]) * x[1];
        let jump = || {
            Expr::flux(FluxBinding::interior(
                FluxExpr::Int(0) - FluxExpr::Ext(0),
                vec![Expr::field("u")],
            ))
        };

        let mesh = make_rect_mesh([0.0, 0.0], [1.0, 1.0], [3, 3], [true, false]).unwrap();
        let discr = Discretization::builder(mesh).order(2).build().unwrap();
        let u = discr.interpolate_volume_function(|x, _| f(x));
        let out = discr
            .compile(&jump())
            .unwrap()
            .call_field(&OperatorArgs::new().field("u", &u))
            .unwrap();
        assert!(out.data().iter().all(|v| v.abs() < 1e-12));

        let discr = periodic_square(2);
        let u = discr.interpolate_volume_function(|x, _| f(x));
        let out = discr
            .compile(&jump())
            .unwrap()
            .call_field(&OperatorArgs::new().field("u", &u))
            .unwrap();
        assert!(out.data().iter().any(|v| v.abs() > 1e-6));
    }

    #[test]
    fn test_central_flux_is_conservative() {
        let discr = periodic_square(2);
        let u = discr.interpolate_volume_function(|x, _| (6.0 * x[0]).sin() + x[1]);
        let total = discr
            .compile(&Expr::flux(FluxBinding::interior(central_x(), vec![Expr::field("u")])).nodal_sum())
            .unwrap()
            .call_single(&OperatorArgs::new().field("u", &u))
            .unwrap();
        assert!(total.as_scalar().unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_quadrature_flux_matches_nodal_for_linear_flux() {
        let discr = periodic_square(2);
        let u = discr.interpolate_volume_function(|x, _| (2.0 * x[0] + x[1]).cos());
        let nodal = FluxBinding::interior(central_x() + FluxExpr::penalty(1.0) * FluxExpr::Int(0), vec![
            Expr::field("u"),
        ]);
        let quad = nodal.clone().with_quadrature("q");
        let args = OperatorArgs::new().field("u", &u);
        let a = discr.compile(&Expr::flux(nodal)).unwrap().call_field(&args).unwrap();
        let b = discr.compile(&Expr::flux(quad)).unwrap().call_field(&args).unwrap();
        for (x, y) in a.data().iter().zip(b.data()) {
            assert!((x - y).abs() < 1e-11);
        }
    }

    #[test]
    fn test_boundary_flux_integrates_face_values() {
        let mesh = make_rect_mesh([0.0, 0.0], [2.0, 1.0], [2, 2], [false; 2]).unwrap();
        let discr = Discretization::builder(mesh).order(2).build().unwrap();
        let u = discr.ones_on_volume();
        // Σ of the surface integral of Ext(0) with Ext = 1 is the perimeter
        let binding = FluxBinding::boundary(FluxExpr::Ext(0), vec![Expr::field("u")], TAG_ALL, vec![
            Expr::constant(1.0),
        ]);
        let total = discr
            .compile(&Expr::flux(binding).nodal_sum())
            .unwrap()
            .call_single(&OperatorArgs::new().field("u", &u))
            .unwrap();
        assert!((total.as_scalar().unwrap() - 6.0).abs() < 1e-12);
    }
}
