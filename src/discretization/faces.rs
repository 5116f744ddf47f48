//! Face connectivity.
//!
//! A [`FaceGroup`] holds face pairs and the index lists they refer to. Each
//! side of a pair addresses its face values as `base + list[i]`, where the
//! lists of both sides are aligned: entry i of the interior list and entry i
//! of the exterior list sit at the same physical location.
//!
//! Index lists are registered under a structural [`IndexListId`], so pairs
//! with the same face and the same shuffle share one stored list.

use super::groups::{ElementGroup, UniformElementRanges};
use crate::config::MatchTolerances;
use crate::error::{DiscretizationError, Result};
use crate::local::{FaceMatch, FaceShuffle, LocalDiscretization, LocalQuadratureInfo, write_to_map};
use crate::mesh::{Element, ElementFace, Mesh};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Structural identity of a registered index list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexListId {
    /// The face's own node indices.
    Face(usize),
    /// The face's node indices reordered by a shuffle.
    Shuffled { face: usize, shuffle: FaceShuffle },
    /// Write-back map from shuffled order into the face's own order.
    WriteMap { face: usize, shuffle: FaceShuffle },
    /// 0..len
    Identity(usize),
}

#[derive(Debug, Clone, Default)]
struct IndexListRegistry {
    ids: HashMap<IndexListId, usize>,
    lists: Vec<Vec<usize>>,
    log: bool,
}

impl IndexListRegistry {
    fn new(log: bool) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    fn register(&mut self, id: IndexListId, make: impl FnOnce() -> Vec<usize>) -> usize {
        if let Some(&number) = self.ids.get(&id) {
            return number;
        }
        let number = self.lists.len();
        let list = make();
        if self.log {
            debug!("index list {}: {:?} -> {:?}", number, id, list);
        }
        self.lists.push(list);
        self.ids.insert(id, number);
        number
    }
}

/// Geometry of one side of a face pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGeometry {
    pub element_id: usize,
    pub face_id: usize,
    /// Polynomial order of the owning element.
    pub order: usize,
    pub element_jacobian: f64,
    pub face_jacobian: f64,
    /// Outward unit normal.
    pub normal: Vec<f64>,
    /// Length scale |J / J_face|, unified across interior pairs.
    pub h: f64,
}

impl FaceGeometry {
    fn new(el: &Element, face: usize, order: usize) -> Self {
        let element_jacobian = el.jacobian();
        let face_jacobian = el.face_jacobians[face];
        Self {
            element_id: el.id,
            face_id: face,
            order,
            element_jacobian,
            face_jacobian,
            normal: el.face_normals[face].clone(),
            h: (element_jacobian / face_jacobian).abs(),
        }
    }
}

/// One side of a face pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceSide {
    /// Offset of the owning element's (or boundary face's) values.
    pub el_base_index: usize,
    /// Number of the index list within the face group.
    pub face_index_list_number: usize,
    /// `None` for the synthetic exterior side of boundary faces.
    pub geometry: Option<FaceGeometry>,
}

/// Connectivity of one face.
#[derive(Debug, Clone, PartialEq)]
pub struct FacePair {
    pub int_side: FaceSide,
    pub ext_side: FaceSide,
    /// Index list writing exterior results back into the exterior element's
    /// own face order; interior pairs only.
    pub ext_native_write_map: Option<usize>,
    /// Periodic axis when the pair was matched through periodic
    /// identification.
    pub periodic_axis: Option<usize>,
}

impl FacePair {
    /// Interior-side geometry. Always present.
    pub fn int_geometry(&self) -> Option<&FaceGeometry> {
        self.int_side.geometry.as_ref()
    }
}

/// Face pairs sharing one face-node layout.
#[derive(Debug, Clone)]
pub struct FaceGroup {
    /// Interior (two real sides) or boundary (one real side).
    pub double_sided: bool,
    pub face_pairs: Vec<FacePair>,
    pub index_lists: Vec<Vec<usize>>,
    pub index_list_ids: HashMap<IndexListId, usize>,
    /// Face values per face.
    pub face_node_count: usize,
    pub ldis: Arc<dyn LocalDiscretization>,
    /// Set for face groups on quadrature face nodes.
    pub quadrature: Option<Arc<LocalQuadratureInfo>>,
}

impl FaceGroup {
    pub fn len(&self) -> usize {
        self.face_pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.face_pairs.is_empty()
    }

    pub fn index_list(&self, number: usize) -> &[usize] {
        &self.index_lists[number]
    }
}

/// Where one group's face values live.
#[derive(Clone)]
pub(crate) enum FaceNodeLayout<'a> {
    /// Face values are volume nodes.
    Nodal {
        ldis: &'a Arc<dyn LocalDiscretization>,
        ranges: UniformElementRanges,
    },
    /// Face values are per-element face quadrature nodes, stored face after
    /// face.
    Quadrature {
        ldis: &'a Arc<dyn LocalDiscretization>,
        info: Arc<LocalQuadratureInfo>,
        el_faces_ranges: UniformElementRanges,
    },
}

impl FaceNodeLayout<'_> {
    pub(crate) fn nodal(group: &ElementGroup) -> FaceNodeLayout<'_> {
        FaceNodeLayout::Nodal {
            ldis: &group.ldis,
            ranges: group.ranges,
        }
    }

    fn ldis(&self) -> &Arc<dyn LocalDiscretization> {
        match self {
            FaceNodeLayout::Nodal { ldis, .. } | FaceNodeLayout::Quadrature { ldis, .. } => ldis,
        }
    }

    fn face_node_count(&self) -> usize {
        match self {
            FaceNodeLayout::Nodal { ldis, .. } => ldis.face_node_count(),
            FaceNodeLayout::Quadrature { info, .. } => info.face_node_count,
        }
    }

    fn face_list(&self, face: usize) -> Vec<usize> {
        match self {
            FaceNodeLayout::Nodal { ldis, .. } => ldis.face_indices()[face].clone(),
            FaceNodeLayout::Quadrature { info, .. } => {
                let nfq = info.face_node_count;
                (face * nfq..(face + 1) * nfq).collect()
            }
        }
    }

    fn base(&self, position: usize) -> usize {
        match self {
            FaceNodeLayout::Nodal { ranges, .. } => ranges.range(position).start,
            FaceNodeLayout::Quadrature { el_faces_ranges, .. } => el_faces_ranges.range(position).start,
        }
    }

    fn match_faces(&self, face: usize, vertices: &[usize], neighbor_face: usize, neighbor: &[usize]) -> FaceMatch {
        match self {
            FaceNodeLayout::Nodal { ldis, .. } => ldis.match_faces(face, vertices, neighbor_face, neighbor),
            FaceNodeLayout::Quadrature { info, .. } => info.match_faces(vertices, neighbor),
        }
    }

    fn quadrature(&self) -> Option<Arc<LocalQuadratureInfo>> {
        match self {
            FaceNodeLayout::Nodal { .. } => None,
            FaceNodeLayout::Quadrature { info, .. } => Some(info.clone()),
        }
    }
}

/// Shared inputs of the face group builders.
pub(crate) struct ConnectivityContext<'a> {
    pub mesh: &'a Mesh,
    pub group_map: &'a [(usize, usize)],
    pub tolerances: MatchTolerances,
    /// Node coordinates for the node permutation check, when enabled.
    pub check_nodes: Option<&'a [f64]>,
    pub log_index_lists: bool,
}

impl ConnectivityContext<'_> {
    /// Shuffle aligning face `b` with face `a`, trying the periodic
    /// counterpart of `a` when the vertex sets differ.
    fn resolve_shuffle(
        &self,
        layout: &FaceNodeLayout<'_>,
        a: ElementFace,
        a_vertices: &[usize],
        b: ElementFace,
        b_vertices: &[usize],
    ) -> Result<(FaceShuffle, Option<usize>)> {
        if let FaceMatch::Matched(shuffle) = layout.match_faces(a.face, a_vertices, b.face, b_vertices) {
            return Ok((shuffle, None));
        }
        if let Some((partner, axis)) = self.mesh.periodic_opposite(a_vertices) {
            if let FaceMatch::Matched(shuffle) = layout.match_faces(a.face, partner, b.face, b_vertices) {
                return Ok((shuffle, Some(*axis)));
            }
        }
        Err(DiscretizationError::FaceVertexMismatch {
            element: a.element,
            local: a_vertices.to_vec(),
            neighbor_element: b.element,
            neighbor: b_vertices.to_vec(),
        })
    }

    /// Face group over all mesh interfaces.
    pub(crate) fn interior_face_group(&self, layouts: &[FaceNodeLayout<'_>]) -> Result<FaceGroup> {
        let mut registry = IndexListRegistry::new(self.log_index_lists);
        let mut face_pairs = Vec::with_capacity(self.mesh.interfaces.len());

        for &(a, b) in &self.mesh.interfaces {
            let (ga, pa) = self.group_map[a.element];
            let (gb, pb) = self.group_map[b.element];
            let (la, lb) = (&layouts[ga], &layouts[gb]);
            let (el_a, el_b) = (&self.mesh.elements[a.element], &self.mesh.elements[b.element]);
            let (a_vertices, b_vertices) = (el_a.face_vertices(a.face), el_b.face_vertices(b.face));

            let (shuffle, periodic_axis) = self.resolve_shuffle(la, a, &a_vertices, b, &b_vertices)?;

            let int_list = registry.register(IndexListId::Face(a.face), || la.face_list(a.face));
            let native = lb.face_list(b.face);
            let shuffled = shuffle.apply(&native);
            let ext_list = registry.register(
                IndexListId::Shuffled {
                    face: b.face,
                    shuffle: shuffle.clone(),
                },
                || shuffled.clone(),
            );
            let write_map = registry.register(
                IndexListId::WriteMap {
                    face: b.face,
                    shuffle,
                },
                || write_to_map(&shuffled, &native),
            );

            let mut int_geometry = FaceGeometry::new(el_a, a.face, la.ldis().order());
            let mut ext_geometry = FaceGeometry::new(el_b, b.face, lb.ldis().order());

            let (fj_int, fj_ext) = (int_geometry.face_jacobian, ext_geometry.face_jacobian);
            let relative_difference = (fj_int - fj_ext).abs() / fj_int.abs();
            if relative_difference > self.tolerances.face_jacobian_relative {
                return Err(DiscretizationError::FaceJacobianMismatch {
                    element: a.element,
                    face: a.face,
                    relative_difference,
                    tolerance: self.tolerances.face_jacobian_relative,
                });
            }

            let h = int_geometry.h.max(ext_geometry.h);
            int_geometry.h = h;
            ext_geometry.h = h;

            let pair = FacePair {
                int_side: FaceSide {
                    el_base_index: la.base(pa),
                    face_index_list_number: int_list,
                    geometry: Some(int_geometry),
                },
                ext_side: FaceSide {
                    el_base_index: lb.base(pb),
                    face_index_list_number: ext_list,
                    geometry: Some(ext_geometry),
                },
                ext_native_write_map: Some(write_map),
                periodic_axis,
            };

            if let (Some(nodes), FaceNodeLayout::Nodal { .. }) = (self.check_nodes, la) {
                if la.ldis().has_facial_nodes() && lb.ldis().has_facial_nodes() {
                    self.check_node_permutation(nodes, &registry.lists, &pair, a)?;
                }
            }
            face_pairs.push(pair);
        }

        let first = &layouts[0];
        Ok(FaceGroup {
            double_sided: true,
            face_pairs,
            index_lists: registry.lists,
            index_list_ids: registry.ids,
            face_node_count: first.face_node_count(),
            ldis: first.ldis().clone(),
            quadrature: first.quadrature(),
        })
    }

    /// Matched face nodes must coincide up to the periodic offset.
    fn check_node_permutation(
        &self,
        nodes: &[f64],
        lists: &[Vec<usize>],
        pair: &FacePair,
        a: ElementFace,
    ) -> Result<()> {
        let dims = self.mesh.dimensions;
        let node = |i: usize| &nodes[i * dims..(i + 1) * dims];
        let int_list = &lists[pair.int_side.face_index_list_number];
        let ext_list = &lists[pair.ext_side.face_index_list_number];

        let mut offset = vec![0.0; dims];
        if let (Some(axis), Some(&i0), Some(&j0)) = (pair.periodic_axis, int_list.first(), ext_list.first()) {
            offset[axis] = node(pair.ext_side.el_base_index + j0)[axis]
                - node(pair.int_side.el_base_index + i0)[axis];
        }

        let distance = int_list
            .iter()
            .zip(ext_list)
            .map(|(&i, &j)| {
                let xi = node(pair.int_side.el_base_index + i);
                let xj = node(pair.ext_side.el_base_index + j);
                (0..dims)
                    .map(|d| (xj[d] - xi[d] - offset[d]).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .fold(0.0, f64::max);

        if distance > self.tolerances.node_distance {
            return Err(DiscretizationError::NodePermutationMismatch {
                element: a.element,
                face: a.face,
                distance,
                tolerance: self.tolerances.node_distance,
            });
        }
        Ok(())
    }

    /// Single-sided face group over `faces`. The exterior side of face k
    /// covers boundary values `k * nf..(k + 1) * nf`.
    pub(crate) fn boundary_face_group(&self, groups: &[ElementGroup], faces: &[ElementFace]) -> FaceGroup {
        let mut registry = IndexListRegistry::new(self.log_index_lists);
        let ldis = &groups[0].ldis;
        let nf = ldis.face_node_count();
        let identity = registry.register(IndexListId::Identity(nf), || (0..nf).collect());

        let face_pairs = faces
            .iter()
            .enumerate()
            .map(|(k, ef)| {
                let (g, p) = self.group_map[ef.element];
                let group = &groups[g];
                let el = &self.mesh.elements[ef.element];
                let list = registry.register(IndexListId::Face(ef.face), || {
                    group.ldis.face_indices()[ef.face].clone()
                });
                FacePair {
                    int_side: FaceSide {
                        el_base_index: group.ranges.range(p).start,
                        face_index_list_number: list,
                        geometry: Some(FaceGeometry::new(el, ef.face, group.ldis.order())),
                    },
                    ext_side: FaceSide {
                        el_base_index: k * nf,
                        face_index_list_number: identity,
                        geometry: None,
                    },
                    ext_native_write_map: None,
                    periodic_axis: None,
                }
            })
            .collect();

        FaceGroup {
            double_sided: false,
            face_pairs,
            index_lists: registry.lists,
            index_list_ids: registry.ids,
            face_node_count: nf,
            ldis: ldis.clone(),
            quadrature: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_memoizes_by_id() {
        let mut registry = IndexListRegistry::new(false);
        let a = registry.register(IndexListId::Face(1), || vec![3, 4]);
        let b = registry.register(IndexListId::Face(1), || vec![9, 9]);
        let c = registry.register(
            IndexListId::Shuffled {
                face: 1,
                shuffle: FaceShuffle::new(vec![1, 0]),
            },
            || vec![4, 3],
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.lists[a], vec![3, 4]);
        assert_eq!(registry.lists.len(), 2);
    }
}
