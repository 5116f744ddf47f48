//! Discretization configuration.
//!
//! Everything a [`Discretization`](crate::Discretization) build reads besides
//! the mesh: polynomial order, quadrature tags, debug flags and matching
//! tolerances. Serializable so runs can be configured from files.

use crate::error::{DiscretizationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Opt-in debug behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugFlag {
    /// Log every registered face index list.
    IlistGeneration,
    /// Check that matched face nodes coincide physically.
    NodePermutation,
    /// Log the lowered schedule of every compiled operator.
    DumpOpCode,
    /// Log the dataflow graph of every compiled operator in dot format.
    DumpDataflowGraph,
    /// Log the expression after each compiler pass.
    DumpOptemplateStages,
    /// Log the list of available flags.
    Help,
}

impl DebugFlag {
    pub const ALL: [DebugFlag; 6] = [
        DebugFlag::IlistGeneration,
        DebugFlag::NodePermutation,
        DebugFlag::DumpOpCode,
        DebugFlag::DumpDataflowGraph,
        DebugFlag::DumpOptemplateStages,
        DebugFlag::Help,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DebugFlag::IlistGeneration => "ilist_generation",
            DebugFlag::NodePermutation => "node_permutation",
            DebugFlag::DumpOpCode => "dump_op_code",
            DebugFlag::DumpDataflowGraph => "dump_dataflow_graph",
            DebugFlag::DumpOptemplateStages => "dump_optemplate_stages",
            DebugFlag::Help => "help",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            DebugFlag::IlistGeneration => "log face index list registration",
            DebugFlag::NodePermutation => "check physical coincidence of matched face nodes",
            DebugFlag::DumpOpCode => "log compiled operator schedules",
            DebugFlag::DumpDataflowGraph => "log compiled operator dataflow graphs (dot)",
            DebugFlag::DumpOptemplateStages => "log expressions after each compiler pass",
            DebugFlag::Help => "list debug flags",
        }
    }
}

impl fmt::Display for DebugFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DebugFlag {
    type Err = DiscretizationError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        DebugFlag::ALL
            .into_iter()
            .find(|flag| flag.name() == normalized)
            .ok_or_else(|| DiscretizationError::UnknownDebugFlag(s.to_string()))
    }
}

/// Tolerances of the interface consistency checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchTolerances {
    /// Maximum relative difference of the two face jacobians of a pair.
    /// Default: 1e-13
    pub face_jacobian_relative: f64,
    /// Maximum distance of matched face nodes.
    /// Default: 1e-14
    pub node_distance: f64,
}

impl Default for MatchTolerances {
    fn default() -> Self {
        Self {
            face_jacobian_relative: 1e-13,
            node_distance: 1e-14,
        }
    }
}

/// Construction parameters of a discretization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscretizationConfig {
    /// Polynomial order, exclusive with an explicit local discretization.
    pub order: Option<usize>,
    /// Minimum exactness degree per quadrature tag. `None` registers the tag
    /// as nodal: its markers are dropped.
    pub quad_min_degrees: BTreeMap<String, Option<usize>>,
    pub debug: BTreeSet<DebugFlag>,
    pub tolerances: MatchTolerances,
}

impl DiscretizationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    /// Register quadrature tag `tag` with minimum degree `min_degree`.
    pub fn with_quadrature(mut self, tag: impl Into<String>, min_degree: Option<usize>) -> Self {
        self.quad_min_degrees.insert(tag.into(), min_degree);
        self
    }

    pub fn with_debug(mut self, flag: DebugFlag) -> Self {
        self.debug.insert(flag);
        self
    }

    pub fn with_tolerances(mut self, tolerances: MatchTolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn is_debug(&self, flag: DebugFlag) -> bool {
        self.debug.contains(&flag)
    }

    /// Registered minimum degree of `tag`.
    ///
    /// `Ok(None)` for tags registered as nodal, an error for unknown tags.
    pub fn quadrature_degree(&self, tag: &str) -> Result<Option<usize>> {
        self.quad_min_degrees
            .get(tag)
            .copied()
            .ok_or_else(|| DiscretizationError::UndefinedQuadratureTag(tag.to_string()))
    }
}
