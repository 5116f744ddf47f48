//! Error types for discretization construction, compilation and evaluation.

use thiserror::Error;

/// Coarse classification of a [`DiscretizationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad construction or compile input; fix the input.
    Configuration,
    /// Mesh cannot be connected; fix the mesh.
    Topology,
    /// A debug consistency check failed.
    Consistency,
    /// Incompatible field shapes or storage kinds at a call site.
    Shape,
}

/// Errors raised by the discretization core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscretizationError {
    /// Both an explicit local discretization and an order were supplied.
    #[error("must specify exactly one of local discretization and order, got both")]
    BothOrderAndLocalDiscretization,

    /// Neither an explicit local discretization nor an order was supplied.
    #[error("must specify exactly one of local discretization and order, got neither")]
    NeitherOrderNorLocalDiscretization,

    /// Polynomial order the local discretization cannot represent.
    #[error("invalid polynomial order {0}: must be at least 1")]
    InvalidOrder(usize),

    #[error("unknown debug flag '{0}'")]
    UnknownDebugFlag(String),

    /// A quadrature tag is used without a registered minimum degree.
    #[error("minimum degree for quadrature tag '{0}' is undefined")]
    UndefinedQuadratureTag(String),

    /// Other invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Face-vertex tuples are neither permutations nor periodic images.
    #[error(
        "face vertices {local:?} of element {element} and {neighbor:?} of element {neighbor_element} do not match"
    )]
    FaceVertexMismatch {
        element: usize,
        local: Vec<usize>,
        neighbor_element: usize,
        neighbor: Vec<usize>,
    },

    #[error("element kind not supported: {0}")]
    UnsupportedElementKind(String),

    /// No single local discretization fits all elements.
    #[error("mesh mixes element kinds: {0}")]
    MixedElementKinds(String),

    /// Malformed mesh.
    #[error("topology error: {0}")]
    Topology(String),

    #[error(
        "face jacobians of element {element} face {face} disagree: relative difference {relative_difference:e} exceeds {tolerance:e}"
    )]
    FaceJacobianMismatch {
        element: usize,
        face: usize,
        relative_difference: f64,
        tolerance: f64,
    },

    #[error(
        "matched nodes of element {element} face {face} are {distance:e} apart, tolerance {tolerance:e}"
    )]
    NodePermutationMismatch {
        element: usize,
        face: usize,
        distance: f64,
        tolerance: f64,
    },

    /// Storage-kind conversion the backend cannot perform.
    #[error("unable to perform kind conversion: {from} -> {to}")]
    KindConversion { from: String, to: String },

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// A compiled operator was called without one of its operands.
    #[error("missing operand '{0}'")]
    MissingOperand(String),

    /// Projection between discretizations over different elements.
    #[error("projection requires identical element groups: {0}")]
    ProjectionMismatch(String),

    #[error("point {0:?} is not inside any element")]
    PointNotFound(Vec<f64>),
}

impl DiscretizationError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::BothOrderAndLocalDiscretization
            | Self::NeitherOrderNorLocalDiscretization
            | Self::InvalidOrder(_)
            | Self::UnknownDebugFlag(_)
            | Self::UndefinedQuadratureTag(_)
            | Self::InvalidConfig(_) => ErrorCategory::Configuration,
            Self::FaceVertexMismatch { .. }
            | Self::UnsupportedElementKind(_)
            | Self::MixedElementKinds(_)
            | Self::Topology(_) => ErrorCategory::Topology,
            Self::FaceJacobianMismatch { .. } | Self::NodePermutationMismatch { .. } => {
                ErrorCategory::Consistency
            }
            Self::KindConversion { .. }
            | Self::ShapeMismatch { .. }
            | Self::MissingOperand(_)
            | Self::ProjectionMismatch(_)
            | Self::PointNotFound(_) => ErrorCategory::Shape,
        }
    }
}

/// Result type for discretization operations.
pub type Result<T> = std::result::Result<T, DiscretizationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            DiscretizationError::UndefinedQuadratureTag("q".into()).category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            DiscretizationError::Topology("x".into()).category(),
            ErrorCategory::Topology
        );
        assert_eq!(
            DiscretizationError::shape_mismatch("(3,)", "(2,)").category(),
            ErrorCategory::Shape
        );
    }

    #[test]
    fn test_messages() {
        let err = DiscretizationError::KindConversion {
            from: "host".into(),
            to: "accelerated".into(),
        };
        assert_eq!(
            err.to_string(),
            "unable to perform kind conversion: host -> accelerated"
        );
    }
}
