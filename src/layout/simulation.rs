//! Owned simulation state and the per-tick step function

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use tracing::{debug, trace, warn};

use super::cooling::CoolingSchedule;
use super::forces;
use super::integrator::{self, IntegrationParams};
use super::types::{GraphNode, LayoutError, SimEdge, SimulationConfig, TIME_STEP};
use crate::graph_types::{EdgeSpec, NodeSpec, Topology};

/// Initial placement on a Fibonacci sphere.
///
/// The sphere grows with the cube root of the node count so density stays
/// roughly constant relative to the ideal edge length.
pub fn fibonacci_position(index: usize, total: usize, ideal_length: f32) -> Vec3 {
    let golden_ratio = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let i = index as f32;
    let n = total.max(1) as f32;

    let theta = 2.0 * std::f32::consts::PI * i / golden_ratio;
    let phi = (1.0 - 2.0 * (i + 0.5) / n).clamp(-1.0, 1.0).acos();

    let radius = ideal_length * n.cbrt().max(1.0);
    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
    )
}

/// Result of a single completed step
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// 1-based index of this step since the last reset
    pub step: u64,
    /// Temperature after cooling
    pub temperature: f32,
    pub converged: bool,
    /// Whether repulsion went through the octree
    pub used_spatial_index: bool,
    /// Nodes reverted after a numeric fault
    pub recovered: Vec<usize>,
    pub max_displacement: f32,
}

/// Node and edge state of one layout, plus its configuration and schedule
#[derive(Debug, Clone)]
pub struct SimulationState {
    nodes: Vec<GraphNode>,
    edges: Vec<SimEdge>,
    /// Mapping from node ID to index
    node_index: HashMap<String, usize>,
    edge_ids: HashSet<String>,
    config: SimulationConfig,
    cooling: CoolingSchedule,
    step_count: u64,
}

impl SimulationState {
    /// An empty state
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            node_index: HashMap::new(),
            edge_ids: HashSet::new(),
            config,
            cooling: CoolingSchedule::new(&config),
            step_count: 0,
        }
    }

    /// Create simulation from topology.
    ///
    /// Duplicate node ids and unusable edges are logged and skipped.
    pub fn from_topology(topology: &Topology, config: SimulationConfig) -> Self {
        let mut state = Self::new(config);
        let total = topology.nodes.len();

        for spec in &topology.nodes {
            if state.node_index.contains_key(&spec.id) {
                warn!(node = %spec.id, "duplicate node id in topology, keeping first");
                continue;
            }
            let index = state.nodes.len();
            let position = match spec.position.map(Vec3::from) {
                Some(p) if p.is_finite() => p,
                supplied => {
                    if let Some(p) = supplied {
                        warn!(
                            node = %spec.id,
                            position = %p,
                            "non-finite position in topology, placing on sphere"
                        );
                    }
                    fibonacci_position(index, total, config.ideal_edge_length)
                }
            };
            state.push_node(GraphNode::new(spec.id.clone(), spec.node_type, position));
        }

        for spec in &topology.edges {
            match state.resolve_edge(spec) {
                Ok(edge) => state.push_edge(edge),
                Err(err) => warn!(edge = %spec.id, %err, "dropping edge"),
            }
        }

        state
    }

    fn push_node(&mut self, node: GraphNode) {
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }

    fn push_edge(&mut self, edge: SimEdge) {
        self.edge_ids.insert(edge.id.clone());
        self.edges.push(edge);
    }

    fn resolve_edge(&self, spec: &EdgeSpec) -> Result<SimEdge, LayoutError> {
        if self.edge_ids.contains(&spec.id) {
            return Err(LayoutError::DuplicateEdge(spec.id.clone()));
        }
        let source = self.index_of(&spec.source)?;
        let target = self.index_of(&spec.target)?;
        if source == target {
            return Err(LayoutError::InvalidEdge {
                id: spec.id.clone(),
                reason: "self-loop".to_string(),
            });
        }
        if let Some(length) = spec.ideal_length {
            if !length.is_finite() || length <= 0.0 {
                return Err(LayoutError::InvalidEdge {
                    id: spec.id.clone(),
                    reason: format!("ideal length must be positive (got {length})"),
                });
            }
        }
        Ok(SimEdge {
            id: spec.id.clone(),
            source,
            target,
            ideal_length: spec.ideal_length,
        })
    }

    fn index_of(&self, id: &str) -> Result<usize, LayoutError> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| LayoutError::UnknownNode(id.to_string()))
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SimEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.node(id).map(|n| n.position)
    }

    /// Current id -> position mapping
    pub fn positions(&self) -> HashMap<String, Vec3> {
        self.nodes
            .iter()
            .map(|n| (n.id.clone(), n.position))
            .collect()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn cooling(&self) -> &CoolingSchedule {
        &self.cooling
    }

    pub fn temperature(&self) -> f32 {
        self.cooling.temperature()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Zero or one node: nothing to lay out
    pub fn is_degenerate(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn is_converged(&self) -> bool {
        self.cooling.is_converged()
    }

    /// Restart the anneal: initial temperature, zero velocities.
    ///
    /// Positions are kept.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.velocity = Vec3::ZERO;
        }
        self.cooling.reset();
        self.step_count = 0;
        debug!(nodes = self.nodes.len(), "simulation state reset");
    }

    /// Validate and swap in a new configuration, then reset.
    ///
    /// On error the current configuration is untouched.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), LayoutError> {
        config.validate()?;
        self.config = config;
        self.cooling = CoolingSchedule::new(&config);
        self.reset();
        Ok(())
    }

    pub fn add_node(&mut self, spec: &NodeSpec) -> Result<(), LayoutError> {
        if self.node_index.contains_key(&spec.id) {
            return Err(LayoutError::DuplicateNode(spec.id.clone()));
        }
        let position = match spec.position.map(Vec3::from) {
            Some(p) if !p.is_finite() => {
                return Err(LayoutError::NonFinitePosition {
                    id: spec.id.clone(),
                });
            }
            Some(p) => p,
            None => fibonacci_position(
                self.nodes.len(),
                self.nodes.len() + 1,
                self.config.ideal_edge_length,
            ),
        };
        self.push_node(GraphNode::new(spec.id.clone(), spec.node_type, position));
        self.reset();
        Ok(())
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Result<GraphNode, LayoutError> {
        let index = self.index_of(id)?;
        let removed = self.nodes.remove(index);

        self.edges.retain(|e| e.source != index && e.target != index);
        self.edge_ids = self.edges.iter().map(|e| e.id.clone()).collect();
        for edge in &mut self.edges {
            if edge.source > index {
                edge.source -= 1;
            }
            if edge.target > index {
                edge.target -= 1;
            }
        }
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        self.reset();
        Ok(removed)
    }

    pub fn add_edge(&mut self, spec: &EdgeSpec) -> Result<(), LayoutError> {
        let edge = self.resolve_edge(spec)?;
        self.push_edge(edge);
        self.reset();
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<SimEdge, LayoutError> {
        let position = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| LayoutError::UnknownEdge(id.to_string()))?;
        let removed = self.edges.remove(position);
        self.edge_ids.remove(&removed.id);
        self.reset();
        Ok(removed)
    }

    /// Fix a node at an externally supplied position
    pub fn pin(&mut self, id: &str, position: Vec3) -> Result<(), LayoutError> {
        if !position.is_finite() {
            return Err(LayoutError::NonFinitePosition { id: id.to_string() });
        }
        let index = self.index_of(id)?;
        let node = &mut self.nodes[index];
        node.position = position;
        node.velocity = Vec3::ZERO;
        node.pinned = true;
        Ok(())
    }

    /// Release a pinned node back to the simulation
    pub fn unpin(&mut self, id: &str) -> Result<(), LayoutError> {
        let index = self.index_of(id)?;
        self.nodes[index].pinned = false;
        Ok(())
    }
}

/// Run one simulation tick.
///
/// Order is fixed: octree rebuild and force accumulation, then integration,
/// then cooling.
pub fn step(state: &mut SimulationState) -> StepReport {
    let node_count = state.nodes.len();
    let used_spatial_index = node_count > 1 && state.config.uses_spatial_index(node_count);
    let forces = forces::accumulate(&state.nodes, &state.edges, &state.config);

    let params = IntegrationParams {
        time_step: TIME_STEP,
        damping: state.config.damping,
        max_velocity: state.config.max_velocity,
        temperature_scale: state.cooling.scale(),
    };
    let integration = integrator::integrate(&mut state.nodes, &forces, &params);

    let converged = state.cooling.cool();
    state.step_count += 1;

    trace!(
        step = state.step_count,
        temperature = state.cooling.temperature(),
        max_displacement = integration.max_displacement,
        "step"
    );

    StepReport {
        step: state.step_count,
        temperature: state.cooling.temperature(),
        converged,
        used_spatial_index,
        recovered: integration.recovered,
        max_displacement: integration.max_displacement,
    }
}
