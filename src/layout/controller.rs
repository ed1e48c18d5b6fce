//! Frame-driven layout controller
//!
//! Owns a [`SimulationState`], drives one step per [`LayoutController::tick`]
//! and pushes the resulting positions to subscribers. All topology,
//! configuration and pin changes take `&mut self`, so they can only happen
//! between steps.

use std::collections::HashMap;

use glam::Vec3;
use tracing::{debug, info};

use super::simulation::{self, SimulationState, StepReport};
use super::types::{LayoutError, LifecycleState, SimulationConfig};
use crate::graph_types::{EdgeSpec, NodeSpec, Topology};

/// Positions published after a completed step
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub step: u64,
    pub temperature: f32,
    pub state: LifecycleState,
    pub positions: HashMap<String, Vec3>,
}

/// Handle returned by [`LayoutController::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&PositionUpdate)>;

/// Layout lifecycle: Idle -> Running <-> Paused, Running -> Converged
pub struct LayoutController {
    simulation: Option<SimulationState>,
    /// Configuration used for the next topology, and the current one
    config: SimulationConfig,
    state: LifecycleState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Default for LayoutController {
    fn default() -> Self {
        Self {
            simulation: None,
            config: SimulationConfig::default(),
            state: LifecycleState::Idle,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }
}

impl std::fmt::Debug for LayoutController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutController")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("nodes", &self.simulation.as_ref().map(|s| s.nodes().len()))
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl LayoutController {
    /// Create an idle controller with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle controller with a custom configuration
    pub fn with_config(config: SimulationConfig) -> Result<Self, LayoutError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Current temperature; the initial temperature while idle
    pub fn temperature(&self) -> f32 {
        self.simulation
            .as_ref()
            .map_or(self.config.initial_temperature, |s| s.temperature())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn simulation(&self) -> Option<&SimulationState> {
        self.simulation.as_ref()
    }

    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.simulation.as_ref()?.position(id)
    }

    pub fn positions(&self) -> HashMap<String, Vec3> {
        self.simulation
            .as_ref()
            .map(SimulationState::positions)
            .unwrap_or_default()
    }

    // =========================================================================
    // Topology and configuration
    // =========================================================================

    /// Replace the whole topology and restart the anneal
    pub fn apply_topology(&mut self, topology: &Topology) {
        let simulation = SimulationState::from_topology(topology, self.config);
        info!(
            nodes = simulation.nodes().len(),
            edges = simulation.edges().len(),
            "topology applied"
        );
        self.simulation = Some(simulation);
        self.restarted();
    }

    /// Validate and apply a configuration.
    ///
    /// On error nothing changes and the caller learns the failing field.
    pub fn apply_config(&mut self, config: SimulationConfig) -> Result<(), LayoutError> {
        config.validate()?;
        self.config = config;
        info!(?config, "configuration applied");

        if let Some(simulation) = self.simulation.as_mut() {
            simulation.set_config(config)?;
            self.restarted();
        }
        Ok(())
    }

    pub fn add_node(&mut self, spec: &NodeSpec) -> Result<(), LayoutError> {
        self.loaded_mut()?.add_node(spec)?;
        self.restarted();
        Ok(())
    }

    pub fn remove_node(&mut self, id: &str) -> Result<(), LayoutError> {
        self.loaded_mut()?.remove_node(id)?;
        self.restarted();
        Ok(())
    }

    pub fn add_edge(&mut self, spec: &EdgeSpec) -> Result<(), LayoutError> {
        self.loaded_mut()?.add_edge(spec)?;
        self.restarted();
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<(), LayoutError> {
        self.loaded_mut()?.remove_edge(id)?;
        self.restarted();
        Ok(())
    }

    fn loaded_mut(&mut self) -> Result<&mut SimulationState, LayoutError> {
        self.simulation.as_mut().ok_or(LayoutError::NoTopology)
    }

    /// Enter Running after a reset, or Converged when there is nothing to lay out
    fn restarted(&mut self) {
        let degenerate = self
            .simulation
            .as_ref()
            .is_none_or(SimulationState::is_degenerate);
        self.state = if degenerate {
            LifecycleState::Converged
        } else {
            LifecycleState::Running
        };
        debug!(state = %self.state, "layout restarted");
    }

    // =========================================================================
    // Control operations
    // =========================================================================

    /// Begin stepping: resumes a paused layout, restarts a converged one
    pub fn start(&mut self) -> Result<(), LayoutError> {
        match self.state {
            LifecycleState::Idle => Err(LayoutError::NoTopology),
            LifecycleState::Running => Ok(()),
            LifecycleState::Paused => self.resume(),
            LifecycleState::Converged => self.reset(),
        }
    }

    pub fn pause(&mut self) -> Result<(), LayoutError> {
        if self.state != LifecycleState::Running {
            return Err(LayoutError::InvalidTransition {
                operation: "pause",
                state: self.state,
            });
        }
        self.state = LifecycleState::Paused;
        debug!("layout paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), LayoutError> {
        if self.state != LifecycleState::Paused {
            return Err(LayoutError::InvalidTransition {
                operation: "resume",
                state: self.state,
            });
        }
        self.state = LifecycleState::Running;
        debug!("layout resumed");
        Ok(())
    }

    /// Restart the anneal from the current positions
    pub fn reset(&mut self) -> Result<(), LayoutError> {
        self.loaded_mut()?.reset();
        self.restarted();
        Ok(())
    }

    /// Fix a node at an externally supplied position
    pub fn pin(&mut self, id: &str, position: Vec3) -> Result<(), LayoutError> {
        self.loaded_mut()?.pin(id, position)
    }

    pub fn unpin(&mut self, id: &str) -> Result<(), LayoutError> {
        self.loaded_mut()?.unpin(id)
    }

    // =========================================================================
    // Stepping and publication
    // =========================================================================

    /// Register a callback receiving positions after every completed step
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&PositionUpdate) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the subscription was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Advance one step if running; called once per render frame
    pub fn tick(&mut self) -> Option<StepReport> {
        if self.state != LifecycleState::Running {
            return None;
        }
        let sim = self.simulation.as_mut()?;
        let report = simulation::step(sim);

        if report.converged {
            self.state = LifecycleState::Converged;
            info!(steps = report.step, "layout converged");
        }

        self.publish(&report);
        Some(report)
    }

    /// Tick until converged, paused or `max_steps` is reached
    pub fn run_to_convergence(&mut self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.tick().is_some() {
            steps += 1;
        }
        steps
    }

    fn publish(&mut self, report: &StepReport) {
        if self.subscribers.is_empty() {
            return;
        }
        let Some(sim) = self.simulation.as_ref() else {
            return;
        };
        let update = PositionUpdate {
            step: report.step,
            temperature: report.temperature,
            state: self.state,
            positions: sim.positions(),
        };
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&update);
        }
    }
}
