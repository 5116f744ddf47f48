//! Boundary tag names.
//!
//! Tags are free-form strings. A few are reserved: every true (non-periodic)
//! boundary face carries [`TAG_ALL`], and the structured generators tag the
//! sides of their domain with [`side_tag`].

/// Tag carried by every boundary face that is not periodically identified.
pub const TAG_ALL: &str = "all";

/// Tag that never names any face; mesh construction drops it from tagger
/// output.
pub const TAG_NONE: &str = "none";

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// Which end of an axis a side lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Minus,
    Plus,
}

/// Tag of the side of a box-shaped domain, e.g. `minus_x` or `plus_z`.
///
/// Axes past `z` are named by number, e.g. `minus_axis3`.
pub fn side_tag(axis: usize, side: Side) -> String {
    let prefix = match side {
        Side::Minus => "minus",
        Side::Plus => "plus",
    };
    match AXIS_NAMES.get(axis) {
        Some(name) => format!("{}_{}", prefix, name),
        None => format!("{}_axis{}", prefix, axis),
    }
}

/// The `(minus, plus)` tag pair used for periodic identification along `axis`.
pub fn periodic_tags(axis: usize) -> (String, String) {
    (side_tag(axis, Side::Minus), side_tag(axis, Side::Plus))
}
