//! Conformal simplicial meshes.
//!
//! A [`Mesh`] is immutable once built. [`MeshBuilder`] derives its
//! connectivity from raw points and element vertex lists:
//! - faces shared by two elements become interfaces
//! - faces owned by one element are boundary faces, tagged by a user tagger
//!   and always with [`TAG_ALL`]; [`TAG_NONE`] is dropped from tagger output
//! - for each periodic axis, boundary faces tagged with the axis' minus tag
//!   are paired by coordinates with faces tagged with its plus tag; paired
//!   faces become interfaces, leave every tag list, and are recorded
//!   symmetrically in the periodic opposite-face table

use super::boundary_tags::{TAG_ALL, TAG_NONE};
use super::element::{Element, ElementFace};
use crate::error::{DiscretizationError, Result};
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Boundary tagger: receives a face's global vertex tuple and the mesh
/// points, returns the tags for that face.
pub type BoundaryTagger = Box<dyn Fn(&[usize], &[Vec<f64>]) -> Vec<String>>;

/// Unstructured simplicial mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub dimensions: usize,
    /// Vertex coordinates
    pub points: Vec<Vec<f64>>,
    /// Elements, indexed by id
    pub elements: Vec<Element>,
    /// Boundary faces per tag
    pub tag_to_boundary: BTreeMap<String, Vec<ElementFace>>,
    /// Pairs of faces that are glued together (including periodic pairs)
    pub interfaces: Vec<(ElementFace, ElementFace)>,
    /// Face vertex tuple → (vertices it is identified with, in corresponding
    /// order, and the periodic axis)
    pub periodic_opposite_faces: HashMap<Vec<usize>, (Vec<usize>, usize)>,
    /// Per axis, the `(minus, plus)` tags identified periodically
    pub periodicity: Vec<Option<(String, String)>>,
}

impl Mesh {
    /// Boundary faces carrying `tag`; empty for unknown tags.
    pub fn boundary_faces(&self, tag: &str) -> &[ElementFace] {
        self.tag_to_boundary.get(tag).map_or(&[], Vec::as_slice)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Periodic counterpart of a face vertex tuple.
    pub fn periodic_opposite(&self, face_vertices: &[usize]) -> Option<&(Vec<usize>, usize)> {
        self.periodic_opposite_faces.get(face_vertices)
    }

    /// Axis-aligned bounding box `(min, max)`.
    pub fn bounding_box(&self) -> (Vec<f64>, Vec<f64>) {
        let mut lo = vec![f64::INFINITY; self.dimensions];
        let mut hi = vec![f64::NEG_INFINITY; self.dimensions];
        for p in &self.points {
            for d in 0..self.dimensions {
                lo[d] = lo[d].min(p[d]);
                hi[d] = hi[d].max(p[d]);
            }
        }
        (lo, hi)
    }
}

/// Builder for conformal meshes.
pub struct MeshBuilder {
    points: Vec<Vec<f64>>,
    elements: Vec<Vec<usize>>,
    tagger: Option<BoundaryTagger>,
    periodicity: Vec<Option<(String, String)>>,
    tolerance: f64,
}

impl MeshBuilder {
    pub fn new(points: Vec<Vec<f64>>, elements: Vec<Vec<usize>>) -> Self {
        let dims = points.first().map_or(0, Vec::len);
        Self {
            points,
            elements,
            tagger: None,
            periodicity: vec![None; dims],
            tolerance: 1e-10,
        }
    }

    /// Set the boundary tagger.
    pub fn with_boundary_tagger(
        mut self,
        tagger: impl Fn(&[usize], &[Vec<f64>]) -> Vec<String> + 'static,
    ) -> Self {
        self.tagger = Some(Box::new(tagger));
        self
    }

    /// Identify faces tagged `minus` with faces tagged `plus` along `axis`.
    pub fn with_periodic_axis(mut self, axis: usize, minus: impl Into<String>, plus: impl Into<String>) -> Self {
        if axis >= self.periodicity.len() {
            self.periodicity.resize(axis + 1, None);
        }
        self.periodicity[axis] = Some((minus.into(), plus.into()));
        self
    }

    /// Relative tolerance for periodic vertex matching.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn build(self) -> Result<Mesh> {
        let dims = self.points.first().map_or(0, Vec::len);
        if !(1..=3).contains(&dims) {
            return Err(DiscretizationError::Topology(format!(
                "unsupported mesh dimension {}",
                dims
            )));
        }
        if self.periodicity.len() > dims {
            return Err(DiscretizationError::InvalidConfig(format!(
                "periodic axis beyond mesh dimension {}",
                dims
            )));
        }

        let mut elements = Vec::with_capacity(self.elements.len());
        for (id, vertices) in self.elements.into_iter().enumerate() {
            if let Some(&v) = vertices.iter().find(|&&v| v >= self.points.len()) {
                return Err(DiscretizationError::Topology(format!(
                    "element {} references missing vertex {}",
                    id, v
                )));
            }
            elements.push(Element::simplex(id, vertices, &self.points)?);
        }

        // sorted vertex set -> faces owning it
        let mut face_owners: BTreeMap<Vec<usize>, Vec<ElementFace>> = BTreeMap::new();
        for el in &elements {
            for face in 0..el.face_count() {
                let mut key = el.face_vertices(face);
                key.sort_unstable();
                face_owners
                    .entry(key)
                    .or_default()
                    .push(ElementFace::new(el.id, face));
            }
        }

        let mut interfaces = Vec::new();
        let mut boundary = Vec::new();
        for (key, owners) in face_owners {
            match owners.as_slice() {
                [single] => boundary.push(*single),
                [a, b] => interfaces.push((*a, *b)),
                _ => {
                    return Err(DiscretizationError::Topology(format!(
                        "face {:?} is shared by {} elements",
                        key,
                        owners.len()
                    )));
                }
            }
        }

        let mut tag_to_boundary: BTreeMap<String, Vec<ElementFace>> = BTreeMap::new();
        let mut face_tags: HashMap<ElementFace, Vec<String>> = HashMap::new();
        for &ef in &boundary {
            let vertices = elements[ef.element].face_vertices(ef.face);
            let mut tags = match &self.tagger {
                Some(tagger) => tagger(&vertices, &self.points),
                None => Vec::new(),
            };
            tags.retain(|t| t != TAG_NONE);
            face_tags.insert(ef, tags);
        }

        // periodic identification
        let scale = bounding_diameter(&self.points).max(1.0);
        let mut periodic_opposite_faces = HashMap::new();
        let mut periodic_faces: BTreeSet<ElementFace> = BTreeSet::new();
        for (axis, pair) in self.periodicity.iter().enumerate() {
            let Some((minus_tag, plus_tag)) = pair else {
                continue;
            };
            let with_tag = |tag: &str| -> Vec<ElementFace> {
                boundary
                    .iter()
                    .copied()
                    .filter(|ef| face_tags[ef].iter().any(|t| t == tag))
                    .collect()
            };
            let minus_faces = with_tag(minus_tag);
            let mut plus_faces = with_tag(plus_tag);
            if minus_faces.len() != plus_faces.len() {
                return Err(DiscretizationError::Topology(format!(
                    "periodic axis {}: {} faces tagged '{}' but {} tagged '{}'",
                    axis,
                    minus_faces.len(),
                    minus_tag,
                    plus_faces.len(),
                    plus_tag
                )));
            }

            for minus in minus_faces {
                let minus_vertices = elements[minus.element].face_vertices(minus.face);
                let found = plus_faces.iter().enumerate().find_map(|(idx, plus)| {
                    let plus_vertices = elements[plus.element].face_vertices(plus.face);
                    periodic_correspondence(
                        &self.points,
                        &minus_vertices,
                        &plus_vertices,
                        axis,
                        self.tolerance * scale,
                    )
                    .map(|partners| (idx, plus_vertices, partners))
                });
                let Some((idx, plus_vertices, partners)) = found else {
                    return Err(DiscretizationError::Topology(format!(
                        "face {:?} tagged '{}' has no periodic partner tagged '{}'",
                        minus_vertices, minus_tag, plus_tag
                    )));
                };
                let plus = plus_faces.swap_remove(idx);

                // partners[k] is the plus-side vertex matching minus_vertices[k]
                let minus_images: Vec<usize> = plus_vertices
                    .iter()
                    .map(|v| {
                        let k = partners.iter().position(|p| p == v).unwrap_or(0);
                        minus_vertices[k]
                    })
                    .collect();
                periodic_opposite_faces.insert(minus_vertices.clone(), (partners, axis));
                periodic_opposite_faces.insert(plus_vertices, (minus_images, axis));

                interfaces.push((minus, plus));
                periodic_faces.insert(minus);
                periodic_faces.insert(plus);
            }
        }

        for &ef in &boundary {
            if periodic_faces.contains(&ef) {
                continue;
            }
            for tag in &face_tags[&ef] {
                tag_to_boundary.entry(tag.clone()).or_default().push(ef);
            }
            tag_to_boundary.entry(TAG_ALL.to_string()).or_default().push(ef);
        }

        debug!(
            "mesh: {} elements, {} interfaces ({} periodic), {} boundary faces",
            elements.len(),
            interfaces.len(),
            periodic_faces.len() / 2,
            boundary.len() - periodic_faces.len()
        );

        Ok(Mesh {
            dimensions: dims,
            points: self.points,
            elements,
            tag_to_boundary,
            interfaces,
            periodic_opposite_faces,
            periodicity: {
                let mut p = self.periodicity;
                p.resize(dims, None);
                p
            },
        })
    }
}

fn bounding_diameter(points: &[Vec<f64>]) -> f64 {
    let dims = points.first().map_or(0, Vec::len);
    (0..dims)
        .map(|d| {
            let (lo, hi) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p[d]), hi.max(p[d]))
            });
            (hi - lo).powi(2)
        })
        .sum::<f64>()
        .sqrt()
}

/// For each vertex of face `a`, the vertex of face `b` that coincides with it
/// in every coordinate except `axis`.
fn periodic_correspondence(
    points: &[Vec<f64>],
    a: &[usize],
    b: &[usize],
    axis: usize,
    tolerance: f64,
) -> Option<Vec<usize>> {
    let same_off_axis = |p: &[f64], q: &[f64]| {
        p.iter()
            .zip(q)
            .enumerate()
            .all(|(d, (x, y))| d == axis || (x - y).abs() <= tolerance)
    };
    let partners: Vec<usize> = a
        .iter()
        .map(|&va| {
            b.iter()
                .copied()
                .find(|&vb| same_off_axis(&points[va], &points[vb]))
        })
        .collect::<Option<_>>()?;

    let mut distinct = partners.clone();
    distinct.sort_unstable();
    distinct.dedup();
    (distinct.len() == b.len()).then_some(partners)
}
