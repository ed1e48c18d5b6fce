//! 3D force-directed layout for the requirements knowledge graph
//!
//! This module computes spatial positions for requirements, tasks, tests,
//! risks and documents so the immersive view can place their meshes. It is
//! a time-stepped physics simulation that advances one step per render
//! frame.
//!
//! # Example
//!
//! ```rust
//! use reqgraph_layout::graph_types::{EdgeSpec, NodeSpec, NodeType, Topology};
//! use reqgraph_layout::layout::{LayoutController, LifecycleState};
//!
//! let topology = Topology::new(
//!     vec![
//!         NodeSpec::new("req:1", NodeType::Requirement),
//!         NodeSpec::new("test:1", NodeType::Test),
//!     ],
//!     vec![EdgeSpec::new("verifies", "test:1", "req:1")],
//! );
//!
//! let mut controller = LayoutController::new();
//! controller.apply_topology(&topology);
//! controller.subscribe(|update| {
//!     // Move meshes to update.positions
//!     let _ = update.positions.len();
//! });
//!
//! controller.run_to_convergence(10_000);
//! assert_eq!(controller.state(), LifecycleState::Converged);
//! ```
//!
//! # Forces
//!
//! - **Repulsion**: inverse-square between all node pairs, exact below
//!   `barnesHutThreshold` nodes and Barnes-Hut approximated above it
//! - **Springs**: Hooke's law along every edge toward its ideal length
//! - **Center gravity**: pull toward the origin so disconnected components
//!   do not drift away
//!
//! # Step order
//!
//! Each step rebuilds the octree (when enabled), accumulates forces,
//! integrates, then cools. Forces are computed from a read-only view of the
//! positions; only the integrator writes them.

mod controller;
mod cooling;
mod forces;
mod integrator;
pub mod octree;
mod simulation;
mod types;

pub use controller::{LayoutController, PositionUpdate, SubscriptionId};
pub use cooling::CoolingSchedule;
pub use forces::{accumulate as accumulate_forces, direct_repulsion, tree_repulsion};
pub use integrator::{IntegrationParams, IntegrationReport, integrate};
pub use simulation::{SimulationState, StepReport, fibonacci_position, step};
pub use types::{
    // Default constants for customization
    DEFAULT_ATTRACTION_STRENGTH,
    DEFAULT_BARNES_HUT_THRESHOLD,
    DEFAULT_CENTER_GRAVITY,
    DEFAULT_COOLING_RATE,
    DEFAULT_DAMPING,
    DEFAULT_IDEAL_EDGE_LENGTH,
    DEFAULT_INITIAL_TEMPERATURE,
    DEFAULT_MAX_VELOCITY,
    DEFAULT_MIN_TEMPERATURE,
    DEFAULT_REPULSION_STRENGTH,
    DEFAULT_THETA,
    DISTANCE_MIN,
    TIME_STEP,
    ConfigError,
    GraphNode,
    LayoutError,
    LifecycleState,
    SimEdge,
    SimulationConfig,
};
