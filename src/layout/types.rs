//! Simulation state types and configuration
//!
//! All physics runs in f32 on glam vectors, matching what the view layer
//! uploads to its meshes.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph_types::NodeType;

// =============================================================================
// Default Constants
// =============================================================================

/// Default many-body repulsion strength
pub const DEFAULT_REPULSION_STRENGTH: f32 = 500.0;

/// Default spring constant for edges
pub const DEFAULT_ATTRACTION_STRENGTH: f32 = 0.1;

/// Default rest length of an edge
pub const DEFAULT_IDEAL_EDGE_LENGTH: f32 = 3.0;

/// Default pull toward the origin
pub const DEFAULT_CENTER_GRAVITY: f32 = 0.1;

/// Default velocity retention factor (0-1, applied each step)
pub const DEFAULT_DAMPING: f32 = 0.85;

/// Default starting temperature
pub const DEFAULT_INITIAL_TEMPERATURE: f32 = 1.0;

/// Default multiplicative temperature decay per step
pub const DEFAULT_COOLING_RATE: f32 = 0.995;

/// Default temperature at which the layout counts as converged
pub const DEFAULT_MIN_TEMPERATURE: f32 = 0.001;

/// Default maximum velocity (prevents numerical explosion)
pub const DEFAULT_MAX_VELOCITY: f32 = 10.0;

/// Default Barnes-Hut theta approximation threshold (0 = exact)
pub const DEFAULT_THETA: f32 = 0.8;

/// Default node count above which the octree replaces all-pairs repulsion
pub const DEFAULT_BARNES_HUT_THRESHOLD: usize = 100;

/// Integration time step per tick
pub const TIME_STEP: f32 = 0.1;

/// Minimum distance for force calculations (avoids singularity)
pub const DISTANCE_MIN: f32 = 0.01;

/// Layout parameters recognized by the engine.
///
/// Deserialization rejects unknown keys; missing keys take their defaults.
/// A value read from a file is not trusted until [`SimulationConfig::validate`]
/// accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SimulationConfig {
    pub repulsion_strength: f32,
    pub attraction_strength: f32,
    pub ideal_edge_length: f32,
    pub center_gravity: f32,
    /// Fraction of velocity kept each step
    pub damping: f32,
    pub initial_temperature: f32,
    /// Multiplicative temperature decay per step
    pub cooling_rate: f32,
    /// Convergence threshold
    pub min_temperature: f32,
    pub max_velocity: f32,
    /// Opening-angle threshold (region size / distance)
    pub barnes_hut_theta: f32,
    pub use_barnes_hut: bool,
    /// Node count above which the octree is used
    pub barnes_hut_threshold: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            repulsion_strength: DEFAULT_REPULSION_STRENGTH,
            attraction_strength: DEFAULT_ATTRACTION_STRENGTH,
            ideal_edge_length: DEFAULT_IDEAL_EDGE_LENGTH,
            center_gravity: DEFAULT_CENTER_GRAVITY,
            damping: DEFAULT_DAMPING,
            initial_temperature: DEFAULT_INITIAL_TEMPERATURE,
            cooling_rate: DEFAULT_COOLING_RATE,
            min_temperature: DEFAULT_MIN_TEMPERATURE,
            max_velocity: DEFAULT_MAX_VELOCITY,
            barnes_hut_theta: DEFAULT_THETA,
            use_barnes_hut: true,
            barnes_hut_threshold: DEFAULT_BARNES_HUT_THRESHOLD,
        }
    }
}

/// A configuration value outside its domain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid configuration: {field} {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending option, as spelled in config files
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::InvalidField { field, .. } => field,
        }
    }
}

fn finite(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::invalid(field, format!("must be finite (got {value})")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if finite(field, value)? < 0.0 {
        return Err(ConfigError::invalid(
            field,
            format!("must not be negative (got {value})"),
        ));
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if finite(field, value)? <= 0.0 {
        return Err(ConfigError::invalid(
            field,
            format!("must be greater than zero (got {value})"),
        ));
    }
    Ok(())
}

impl SimulationConfig {
    /// Check every field against its domain, reporting the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("repulsionStrength", self.repulsion_strength)?;
        non_negative("attractionStrength", self.attraction_strength)?;
        positive("idealEdgeLength", self.ideal_edge_length)?;
        non_negative("centerGravity", self.center_gravity)?;

        if !(0.0..=1.0).contains(&finite("damping", self.damping)?) {
            return Err(ConfigError::invalid(
                "damping",
                format!("must be within [0, 1] (got {})", self.damping),
            ));
        }

        positive("initialTemperature", self.initial_temperature)?;

        let rate = finite("coolingRate", self.cooling_rate)?;
        if rate <= 0.0 || rate > 1.0 {
            return Err(ConfigError::invalid(
                "coolingRate",
                format!("must be within (0, 1] (got {rate})"),
            ));
        }

        positive("minTemperature", self.min_temperature)?;
        if self.min_temperature >= self.initial_temperature {
            return Err(ConfigError::invalid(
                "minTemperature",
                format!(
                    "must be below initialTemperature {} (got {})",
                    self.initial_temperature, self.min_temperature
                ),
            ));
        }

        positive("maxVelocity", self.max_velocity)?;
        non_negative("barnesHutTheta", self.barnes_hut_theta)?;

        Ok(())
    }

    /// Whether a graph of `node_count` nodes uses the octree for repulsion
    pub fn uses_spatial_index(&self, node_count: usize) -> bool {
        self.use_barnes_hut && node_count > self.barnes_hut_threshold
    }
}

/// Lifecycle of the layout controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// No topology loaded
    Idle,
    /// Stepping once per tick
    Running,
    /// Stepping suspended, state retained
    Paused,
    /// Temperature below threshold; state remains queryable
    Converged,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Running => "running",
            LifecycleState::Paused => "paused",
            LifecycleState::Converged => "converged",
        };
        f.write_str(name)
    }
}

/// Errors returned by layout control and topology operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// The configuration update was rejected; the previous one stays in effect
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown edge: {0}")]
    UnknownEdge(String),

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("duplicate edge id: {0}")]
    DuplicateEdge(String),

    #[error("invalid edge {id}: {reason}")]
    InvalidEdge { id: String, reason: String },

    /// Externally supplied position contains NaN or infinity
    #[error("non-finite position supplied for node {id}")]
    NonFinitePosition { id: String },

    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("no topology loaded")]
    NoTopology,
}

/// A node with position and velocity for simulation
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Node ID (from NodeSpec)
    pub id: String,
    pub node_type: NodeType,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Externally controlled; the integrator leaves it in place
    pub pinned: bool,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, position: Vec3) -> Self {
        Self {
            id: id.into(),
            node_type,
            position,
            velocity: Vec3::ZERO,
            pinned: false,
        }
    }

    pub fn mass(&self) -> f32 {
        self.node_type.mass()
    }

    /// Check that no component of position or velocity is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// An edge for simulation (indices into node array)
#[derive(Debug, Clone, PartialEq)]
pub struct SimEdge {
    /// Edge ID (from EdgeSpec)
    pub id: String,
    pub source: usize,
    pub target: usize,
    /// Per-edge rest length; falls back to the configured ideal length
    pub ideal_length: Option<f32>,
}

impl SimEdge {
    pub fn rest_length(&self, config: &SimulationConfig) -> f32 {
        self.ideal_length.unwrap_or(config.ideal_edge_length)
    }
}
