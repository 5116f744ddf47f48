//! Per-tag boundary node sets.

use super::faces::{ConnectivityContext, FaceGroup};
use super::groups::ElementGroup;
use crate::mesh::ElementFace;

/// Nodes on the faces carrying one boundary tag.
///
/// Face k of the tag contributes boundary nodes `k * nf..(k + 1) * nf`, in
/// the order of its element's face index list. A volume node on several
/// tagged faces appears once per face.
#[derive(Debug, Clone)]
pub struct Boundary {
    pub tag: String,
    /// Node coordinates, `dims` values per node.
    pub nodes: Vec<f64>,
    /// Volume node index of every boundary node.
    pub vol_indices: Vec<usize>,
    /// Owning element of every face, in face order.
    pub elements: Vec<ElementFace>,
    /// Single-sided face groups; empty when no face carries the tag.
    pub face_groups: Vec<FaceGroup>,
    pub dimensions: usize,
}

impl Boundary {
    pub fn node_count(&self) -> usize {
        self.vol_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vol_indices.is_empty()
    }

    pub fn node(&self, i: usize) -> &[f64] {
        &self.nodes[i * self.dimensions..(i + 1) * self.dimensions]
    }

    pub(crate) fn build(
        tag: &str,
        ctx: &ConnectivityContext<'_>,
        groups: &[ElementGroup],
        volume_nodes: &[f64],
    ) -> Self {
        let dims = ctx.mesh.dimensions;
        let faces = ctx.mesh.boundary_faces(tag);

        let mut vol_indices = Vec::new();
        for ef in faces {
            let (g, p) = ctx.group_map[ef.element];
            let group = &groups[g];
            let base = group.ranges.range(p).start;
            vol_indices.extend(group.ldis.face_indices()[ef.face].iter().map(|&i| base + i));
        }
        let nodes = vol_indices
            .iter()
            .flat_map(|&i| volume_nodes[i * dims..(i + 1) * dims].iter().copied())
            .collect();

        let face_groups = if faces.is_empty() {
            Vec::new()
        } else {
            vec![ctx.boundary_face_group(groups, faces)]
        };

        Self {
            tag: tag.to_string(),
            nodes,
            vol_indices,
            elements: faces.to_vec(),
            face_groups,
            dimensions: dims,
        }
    }
}
