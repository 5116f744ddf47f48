//! Field allocation, interpolation, boundary transfer and geometric fields.

use super::Discretization;
use crate::error::{DiscretizationError, Result};
use crate::field::{FieldArray, VectorKind};
use crate::mesh::Element;
use num::Zero;

/// `len` must match `expected`.
fn check_len<T: Copy>(field: &FieldArray<T>, expected: usize, what: &str) -> Result<()> {
    if field.len() != expected {
        return Err(DiscretizationError::shape_mismatch(
            format!("{} field on {} nodes", what, expected),
            field.describe(),
        ));
    }
    Ok(())
}

impl Discretization {
    /// Zero volume field with component shape `shape`.
    pub fn volume_zeros<T: Copy + Zero>(&self, shape: &[usize]) -> FieldArray<T> {
        FieldArray::zeros(shape, self.node_count())
    }

    /// Zero field on the nodes of boundary `tag`.
    pub fn boundary_zeros<T: Copy + Zero>(&self, tag: &str, shape: &[usize]) -> FieldArray<T> {
        FieldArray::zeros(shape, self.get_boundary(tag).node_count())
    }

    pub fn ones_on_volume(&self) -> FieldArray<f64> {
        FieldArray::from_values(vec![1.0; self.node_count()])
    }

    pub fn ones_on_boundary(&self, tag: &str) -> FieldArray<f64> {
        FieldArray::from_values(vec![1.0; self.get_boundary(tag).node_count()])
    }

    /// Evaluate `f(x, element)` at every volume node.
    pub fn interpolate_volume_function(&self, f: impl Fn(&[f64], &Element) -> f64) -> FieldArray<f64> {
        let mut values = vec![0.0; self.node_count()];
        for group in &self.element_groups {
            for (range, &el_id) in group.ranges.iter().zip(&group.members) {
                let el = &self.mesh.elements[el_id];
                for i in range {
                    values[i] = f(self.node(i), el);
                }
            }
        }
        FieldArray::from_values(values)
    }

    /// Evaluate `f(x, element)` at every node of boundary `tag`.
    pub fn interpolate_boundary_function(
        &self,
        tag: &str,
        f: impl Fn(&[f64], &Element) -> f64,
    ) -> FieldArray<f64> {
        let boundary = self.get_boundary(tag);
        let nf = boundary.face_groups.first().map_or(0, |fg| fg.face_node_count);
        let values = (0..boundary.node_count())
            .map(|i| {
                let el = &self.mesh.elements[boundary.elements[i / nf].element];
                f(boundary.node(i), el)
            })
            .collect();
        FieldArray::from_values(values)
    }

    /// Volume values at the nodes of boundary `tag`.
    pub fn boundarize_volume_field(&self, field: &FieldArray<f64>, tag: &str) -> Result<FieldArray<f64>> {
        check_len(field, self.node_count(), "volume")?;
        let boundary = self.get_boundary(tag);
        let mut out = FieldArray::zeros(field.shape(), boundary.node_count());
        for c in 0..field.component_count() {
            let (src, dst) = (field.component(c), out.component_mut(c));
            for (d, &i) in dst.iter_mut().zip(&boundary.vol_indices) {
                *d = src[i];
            }
        }
        Ok(out)
    }

    /// Scatter a boundary field into a zero volume field.
    pub fn volumize_boundary_field(&self, field: &FieldArray<f64>, tag: &str) -> Result<FieldArray<f64>> {
        let mut out = self.volume_zeros(field.shape());
        self.volumize_boundary_field_into(field, tag, &mut out)?;
        Ok(out)
    }

    /// Scatter a boundary field into `out`. Volume nodes off the boundary
    /// keep their values.
    pub fn volumize_boundary_field_into(
        &self,
        field: &FieldArray<f64>,
        tag: &str,
        out: &mut FieldArray<f64>,
    ) -> Result<()> {
        let boundary = self.get_boundary(tag);
        check_len(field, boundary.node_count(), &format!("boundary '{}'", tag))?;
        check_len(out, self.node_count(), "volume")?;
        if field.shape() != out.shape() {
            return Err(DiscretizationError::shape_mismatch(field.describe(), out.describe()));
        }
        for c in 0..field.component_count() {
            let src = field.component(c);
            let dst = out.component_mut(c);
            for (&v, &i) in src.iter().zip(&boundary.vol_indices) {
                dst[i] = v;
            }
        }
        Ok(())
    }

    /// Convert a volume field to storage `kind` through the backend.
    pub fn convert_volume(&self, field: FieldArray<f64>, kind: VectorKind) -> Result<FieldArray<f64>> {
        check_len(&field, self.node_count(), "volume")?;
        self.backend.convert(field, kind)
    }

    pub fn convert_boundary(&self, field: FieldArray<f64>, tag: &str, kind: VectorKind) -> Result<FieldArray<f64>> {
        check_len(&field, self.get_boundary(tag).node_count(), &format!("boundary '{}'", tag))?;
        self.backend.convert(field, kind)
    }

    /// Outward unit normals at the nodes of boundary `tag`, shape `[dims]`.
    pub fn boundary_normals(&self, tag: &str) -> FieldArray<f64> {
        let dims = self.dimensions();
        let boundary = self.get_boundary(tag);
        let n = boundary.node_count();
        let mut out = FieldArray::zeros(&[dims], n);
        let nf = boundary.face_groups.first().map_or(0, |fg| fg.face_node_count);
        for (k, ef) in boundary.elements.iter().enumerate() {
            let normal = &self.mesh.elements[ef.element].face_normals[ef.face];
            for (axis, &value) in normal.iter().enumerate() {
                out.component_mut(axis)[k * nf..(k + 1) * nf].fill(value);
            }
        }
        out
    }

    /// Per-element constant `f(element)` on the volume nodes, or on the
    /// volume quadrature nodes of `quad_tag`.
    fn elementwise<const N: usize>(
        &self,
        quad_tag: Option<&str>,
        shape: &[usize],
        f: impl Fn(&Element) -> [f64; N],
    ) -> Result<FieldArray<f64>> {
        let ranges = match quad_tag {
            None => self.element_groups.iter().map(|g| g.ranges).collect::<Vec<_>>(),
            Some(tag) => self.get_quadrature_info(tag)?.ranges.clone(),
        };
        let len = ranges.iter().map(|r| r.total_len()).sum();
        let mut out = FieldArray::zeros(shape, len);
        for (group, ranges) in self.element_groups.iter().zip(&ranges) {
            for (range, &el_id) in ranges.iter().zip(&group.members) {
                let values = f(&self.mesh.elements[el_id]);
                for (c, &v) in values.iter().enumerate().take(out.component_count()) {
                    out.component_mut(c)[range.clone()].fill(v);
                }
            }
        }
        Ok(out)
    }

    /// |det J| per node.
    pub fn volume_jacobians(&self, quad_tag: Option<&str>) -> Result<FieldArray<f64>> {
        self.elementwise(quad_tag, &[], |el| [el.jacobian().abs()])
    }

    /// ∂r_k/∂x_i per node, shape `[dims, dims]`, component `(k, i)`.
    pub fn inverse_metric_derivatives(&self, quad_tag: Option<&str>) -> Result<FieldArray<f64>> {
        let d = self.dimensions();
        self.elementwise(quad_tag, &[d, d], |el| {
            let mut values = [0.0; 9];
            for k in 0..d {
                for i in 0..d {
                    values[k * d + i] = el.inverse_map.matrix[k][i];
                }
            }
            values
        })
    }

    /// ∂x_i/∂r_k per node, shape `[dims, dims]`, component `(i, k)`.
    pub fn forward_metric_derivatives(&self, quad_tag: Option<&str>) -> Result<FieldArray<f64>> {
        let d = self.dimensions();
        self.elementwise(quad_tag, &[d, d], |el| {
            let mut values = [0.0; 9];
            for i in 0..d {
                for k in 0..d {
                    values[i * d + k] = el.map.matrix[i][k];
                }
            }
            values
        })
    }

    /// Total measure of all elements.
    pub fn mesh_volume(&self) -> f64 {
        self.mesh.elements.iter().map(Element::volume).sum()
    }

    /// Largest order-dependent time step factor over all groups.
    pub fn dt_non_geometric_factor(&self) -> f64 {
        self.element_groups
            .iter()
            .map(|g| g.ldis.dt_non_geometric_factor())
            .fold(0.0, f64::max)
    }

    /// Smallest element inradius, `d * volume / surface`.
    pub fn dt_geometric_factor(&self) -> f64 {
        self.mesh
            .elements
            .iter()
            .filter_map(|el| {
                let shape = el.shape()?;
                let surface: f64 = el.face_jacobians.iter().sum::<f64>() * shape.unit_face_measure();
                Some(shape.dimensions() as f64 * el.volume() / surface)
            })
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use crate::discretization::Discretization;
    use crate::error::DiscretizationError;
    use crate::field::{FieldArray, VectorKind};
    use crate::mesh::{Side, TAG_ALL, make_rect_mesh, make_uniform_interval_mesh, side_tag};

    fn square(order: usize) -> Discretization {
        let mesh = make_rect_mesh([0.0, 0.0], [1.0, 1.0], [2, 2], [false; 2]).unwrap();
        Discretization::builder(mesh).order(order).build().unwrap()
    }

    #[test]
    fn test_boundarize_matches_interpolation() {
        let discr = square(2);
        let f = |x: &[f64]| x[0] + 2.0 * x[1];
        let u = discr.interpolate_volume_function(|x, _| f(x));
        let ub = discr.boundarize_volume_field(&u, TAG_ALL).unwrap();
        let expected = discr.interpolate_boundary_function(TAG_ALL, |x, _| f(x));
        for (a, b) in ub.data().iter().zip(expected.data()) {
            assert!((a - b).abs() < 1e-14);
        }
    }

    #[test]
    fn test_volumize_into_keeps_interior() {
        let discr = square(2);
        let tag = side_tag(0, Side::Minus);
        let ones = discr.ones_on_boundary(&tag);
        let mut out = FieldArray::from_values(vec![-1.0; discr.node_count()]);
        discr.volumize_boundary_field_into(&ones, &tag, &mut out).unwrap();

        let boundary = discr.get_boundary(&tag);
        for i in 0..discr.node_count() {
            let expected = if boundary.vol_indices.contains(&i) { 1.0 } else { -1.0 };
            assert_eq!(out.data()[i], expected);
        }
    }

    #[test]
    fn test_boundary_normals_point_outward() {
        let discr = square(1);
        let tag = side_tag(1, Side::Plus);
        let normals = discr.boundary_normals(&tag);
        assert_eq!(normals.shape(), &[2]);
        assert!(normals.len() > 0);
        assert!(normals.component(0).iter().all(|&n| n.abs() < 1e-14));
        assert!(normals.component(1).iter().all(|&n| (n - 1.0).abs() < 1e-14));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let discr = square(1);
        let short = FieldArray::from_values(vec![0.0; 3]);
        assert!(matches!(
            discr.boundarize_volume_field(&short, TAG_ALL),
            Err(DiscretizationError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_convert_identity_and_refusal() {
        let discr = square(1);
        let u = discr.ones_on_volume();
        assert_eq!(discr.convert_volume(u.clone(), VectorKind::Host).unwrap(), u);
        assert_eq!(
            discr.convert_volume(u, VectorKind::Accelerated).unwrap_err(),
            DiscretizationError::KindConversion {
                from: "host".into(),
                to: "accelerated".into()
            }
        );
    }

    #[test]
    fn test_geometric_fields() {
        let discr = square(2);
        assert!((discr.mesh_volume() - 1.0).abs() < 1e-14);

        // right triangles with legs 1/2: J = 1/16 relative to the unit triangle of area 2
        let jac = discr.volume_jacobians(None).unwrap();
        assert!(jac.data().iter().all(|&j| (j - 0.0625).abs() < 1e-14));

        let inv = discr.inverse_metric_derivatives(None).unwrap();
        let fwd = discr.forward_metric_derivatives(None).unwrap();
        assert_eq!(inv.shape(), &[2, 2]);
        // (∂r/∂x)(∂x/∂r) = I at every node
        for n in 0..discr.node_count() {
            for k in 0..2 {
                for l in 0..2 {
                    let dot: f64 = (0..2)
                        .map(|i| inv.component(k * 2 + i)[n] * fwd.component(i * 2 + l)[n])
                        .sum();
                    let expected = if k == l { 1.0 } else { 0.0 };
                    assert!((dot - expected).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_dt_factors() {
        let mesh = make_uniform_interval_mesh(0.0, 1.0, 4, false).unwrap();
        let discr = Discretization::builder(mesh).order(1).build().unwrap();
        assert!((discr.dt_geometric_factor() - 0.125).abs() < 1e-14);
        assert!(discr.dt_non_geometric_factor() > 0.0);
    }
}
