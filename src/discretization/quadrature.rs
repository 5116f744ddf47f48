//! Quadrature-upsampled node layouts.
//!
//! For a quadrature tag the volume gets one range of quadrature nodes per
//! element and the interior faces get one block of face quadrature nodes per
//! element, stored face after face. Interior face pairs are matched exactly
//! as on the nodal layout.

use super::faces::{ConnectivityContext, FaceGroup, FaceNodeLayout};
use super::groups::{ElementGroup, UniformElementRanges};
use crate::basis::matmul;
use crate::error::Result;
use crate::local::LocalQuadratureInfo;
use faer::Mat;
use std::sync::Arc;

/// Quadrature layout of a whole discretization for one tag.
#[derive(Debug, Clone)]
pub struct QuadratureInfo {
    pub tag: String,
    pub min_degree: usize,
    /// Volume quadrature nodes in total.
    pub node_count: usize,
    /// Interior-face quadrature nodes in total.
    pub int_faces_node_count: usize,
    /// Volume quadrature ranges per element group.
    pub ranges: Vec<UniformElementRanges>,
    /// Face quadrature ranges (all faces of an element) per element group.
    pub el_faces_ranges: Vec<UniformElementRanges>,
    /// Local quadrature data per element group.
    pub local: Vec<Arc<LocalQuadratureInfo>>,
    /// Double-sided face groups on face quadrature nodes.
    pub face_groups: Vec<FaceGroup>,
    /// Quadrature values → nodal L2 projection M^{-1} I^T W, per group.
    pub downsample: Vec<Mat<f64>>,
}

/// M^{-1} I^T diag(w)
fn downsample_matrix(inv_mass: &Mat<f64>, info: &LocalQuadratureInfo) -> Mat<f64> {
    let interp = &info.volume_up_interp;
    let mut weighted_t = Mat::zeros(interp.ncols(), interp.nrows());
    for q in 0..interp.nrows() {
        for j in 0..interp.ncols() {
            weighted_t[(j, q)] = interp[(q, j)] * info.weights[q];
        }
    }
    matmul(inv_mass, &weighted_t)
}

impl QuadratureInfo {
    pub(crate) fn build(
        tag: &str,
        min_degree: usize,
        ctx: &ConnectivityContext<'_>,
        groups: &[ElementGroup],
    ) -> Result<Self> {
        let mut ranges = Vec::with_capacity(groups.len());
        let mut el_faces_ranges = Vec::with_capacity(groups.len());
        let mut local = Vec::with_capacity(groups.len());
        let (mut node_count, mut int_faces_node_count) = (0, 0);

        for group in groups {
            let info = group.ldis.quadrature_info(min_degree);
            let volume = UniformElementRanges::new(node_count, info.node_count(), group.len());
            let faces = UniformElementRanges::new(
                int_faces_node_count,
                group.ldis.face_count() * info.face_node_count,
                group.len(),
            );
            node_count += volume.total_len();
            int_faces_node_count += faces.total_len();
            ranges.push(volume);
            el_faces_ranges.push(faces);
            local.push(info);
        }

        let layouts: Vec<FaceNodeLayout<'_>> = groups
            .iter()
            .zip(&local)
            .zip(&el_faces_ranges)
            .map(|((group, info), faces)| FaceNodeLayout::Quadrature {
                ldis: &group.ldis,
                info: info.clone(),
                el_faces_ranges: *faces,
            })
            .collect();
        let face_groups = vec![ctx.interior_face_group(&layouts)?];
        let downsample = groups
            .iter()
            .zip(&local)
            .map(|(group, info)| downsample_matrix(&group.matrices.inv_mass, info))
            .collect();

        Ok(Self {
            tag: tag.to_string(),
            min_degree,
            node_count,
            int_faces_node_count,
            ranges,
            el_faces_ranges,
            local,
            face_groups,
            downsample,
        })
    }
}
