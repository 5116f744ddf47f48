//! Element groups.
//!
//! All elements sharing one local discretization form a group. The group owns
//! a contiguous block of the flat node array, one equally sized range per
//! member element, plus the reference matrices shared by its members.

use crate::error::{DiscretizationError, Result};
use crate::local::{LocalDiscretization, SimplexShape};
use crate::mesh::{ElementKind, Mesh};
use crate::operators::LocalMatrices;
use std::ops::Range;
use std::sync::Arc;

/// `count` consecutive ranges of length `el_size` starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformElementRanges {
    pub start: usize,
    pub el_size: usize,
    pub count: usize,
}

impl UniformElementRanges {
    pub fn new(start: usize, el_size: usize, count: usize) -> Self {
        Self {
            start,
            el_size,
            count,
        }
    }

    /// Range of the `i`-th element.
    #[inline]
    pub fn range(&self, i: usize) -> Range<usize> {
        let base = self.start + i * self.el_size;
        base..base + self.el_size
    }

    /// Range covered by all elements.
    pub fn total_range(&self) -> Range<usize> {
        self.start..self.start + self.el_size * self.count
    }

    pub fn total_len(&self) -> usize {
        self.el_size * self.count
    }

    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.count).map(move |i| self.range(i))
    }

    /// Position of the element whose range holds `index`.
    pub fn position_of(&self, index: usize) -> Option<usize> {
        (self.el_size > 0 && self.total_range().contains(&index))
            .then(|| (index - self.start) / self.el_size)
    }
}

/// Elements sharing one local discretization.
#[derive(Debug, Clone)]
pub struct ElementGroup {
    /// Member element ids, in node-array order.
    pub members: Vec<usize>,
    pub ldis: Arc<dyn LocalDiscretization>,
    /// Node ranges of the members.
    pub ranges: UniformElementRanges,
    pub matrices: LocalMatrices,
}

impl ElementGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.ranges.total_len()
    }
}

/// The single simplex shape shared by all mesh elements.
pub(crate) fn common_shape(mesh: &Mesh) -> Result<SimplexShape> {
    let mut shape = None;
    for el in &mesh.elements {
        match el.kind {
            ElementKind::Curved => {
                return Err(DiscretizationError::UnsupportedElementKind(format!(
                    "curved element {}",
                    el.id
                )));
            }
            ElementKind::Simplex(s) => match shape {
                None => shape = Some(s),
                Some(prev) if prev != s => {
                    return Err(DiscretizationError::MixedElementKinds(format!(
                        "{} and {}",
                        prev, s
                    )));
                }
                Some(_) => {}
            },
        }
    }
    shape.ok_or_else(|| DiscretizationError::Topology("mesh has no elements".to_string()))
}

/// Build the element groups and the flat node coordinates.
///
/// Returns the groups, `group_map` (element id → (group, position)) and the
/// node coordinates, `dims` values per node.
pub(crate) fn build_element_groups(
    mesh: &Mesh,
    ldis: Arc<dyn LocalDiscretization>,
) -> (Vec<ElementGroup>, Vec<(usize, usize)>, Vec<f64>) {
    let dims = mesh.dimensions;
    let np = ldis.node_count();
    let members: Vec<usize> = mesh.elements.iter().map(|el| el.id).collect();
    let ranges = UniformElementRanges::new(0, np, members.len());

    let mut nodes = vec![0.0; ranges.total_len() * dims];
    let mut group_map = vec![(0, 0); mesh.elements.len()];
    for (position, &el_id) in members.iter().enumerate() {
        let el = &mesh.elements[el_id];
        group_map[el_id] = (0, position);
        for (i, r) in ranges.range(position).zip(ldis.unit_nodes()) {
            nodes[i * dims..(i + 1) * dims].copy_from_slice(&el.map.apply(r));
        }
    }

    let matrices = LocalMatrices::new(ldis.as_ref());
    let group = ElementGroup {
        members,
        ldis,
        ranges,
        matrices,
    };
    (vec![group], group_map, nodes)
}
