//! Net force per node: repulsion, edge springs and center gravity
//!
//! Accumulation only reads positions; nothing here mutates node state.

use glam::Vec3;

use super::octree::{Body, Octree};
use super::types::{
    DEFAULT_ATTRACTION_STRENGTH, DISTANCE_MIN, GraphNode, SimEdge, SimulationConfig,
};

/// Below this separation two points count as coincident
const COINCIDENT_EPSILON: f32 = 1e-6;

/// Deterministic unit vector separating a coincident pair.
///
/// Antisymmetric in its arguments, so both nodes of the pair are pushed
/// apart along the same axis.
pub fn fallback_direction(a: usize, b: usize) -> Vec3 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    // Golden-angle spiral on the unit sphere, seeded from the pair
    let k = (lo.wrapping_mul(31).wrapping_add(hi) % 4096) as f32;
    let golden_ratio = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let theta = 2.0 * std::f32::consts::PI * k / golden_ratio;
    let phi = (1.0 - 2.0 * (k + 0.5) / 4096.0).acos();
    let dir = Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
    if a <= b { dir } else { -dir }
}

/// Direction from `from` to `to` and their floored distance
fn separation(to: Vec3, from: Vec3, to_index: usize, from_index: usize) -> (Vec3, f32) {
    let delta = to - from;
    let length = delta.length();
    let dir = if length > COINCIDENT_EPSILON {
        delta / length
    } else {
        fallback_direction(to_index, from_index)
    };
    (dir, length.max(DISTANCE_MIN))
}

/// Inverse-square repulsion field at `target` due to a mass at `source`.
///
/// Points away from the source. Scale by repulsion strength and the target
/// mass to get a force.
pub fn repulsion_between(
    target: Vec3,
    source: Vec3,
    source_mass: f32,
    target_index: usize,
    source_index: usize,
) -> Vec3 {
    let (dir, distance) = separation(target, source, target_index, source_index);
    dir * (source_mass / (distance * distance))
}

/// Exact all-pairs repulsion
pub fn direct_repulsion(nodes: &[GraphNode], strength: f32, forces: &mut [Vec3]) {
    let n = nodes.len();

    for i in 0..n {
        for j in (i + 1)..n {
            // Coulomb's law: F = k * q1 * q2 / r^2
            let field = repulsion_between(nodes[i].position, nodes[j].position, 1.0, i, j);
            let force = field * (strength * nodes[i].mass() * nodes[j].mass());

            forces[i] += force;
            forces[j] -= force;
        }
    }
}

/// Repulsion approximated through a freshly built octree
pub fn tree_repulsion(nodes: &[GraphNode], strength: f32, theta: f32, forces: &mut [Vec3]) {
    let bodies = nodes
        .iter()
        .map(|n| Body {
            position: n.position,
            mass: n.mass(),
        })
        .collect();
    let Some(tree) = Octree::build(bodies) else {
        return;
    };

    for (i, node) in nodes.iter().enumerate() {
        forces[i] += tree.repulsion_on(i, theta) * (strength * node.mass());
    }
}

/// Spring force between connected nodes.
///
/// Hooke's law toward the rest length, plus a rest tension equal to the
/// endpoints' mutual repulsion at that length. Both terms scale with
/// `attraction_strength`; the tension is taken relative to the default
/// strength, where an isolated edge comes to rest at exactly its ideal
/// length. Zero attraction disables edges entirely.
pub fn spring_forces(
    nodes: &[GraphNode],
    edges: &[SimEdge],
    config: &SimulationConfig,
    forces: &mut [Vec3],
) {
    if config.attraction_strength <= 0.0 {
        return;
    }
    let tension_scale = config.attraction_strength / DEFAULT_ATTRACTION_STRENGTH;

    for edge in edges {
        let (source, target) = (edge.source, edge.target);
        let rest = edge.rest_length(config);
        let masses = nodes[source].mass() * nodes[target].mass();

        let (dir, distance) =
            separation(nodes[target].position, nodes[source].position, target, source);

        let stretch = distance - rest;
        let rest_tension = tension_scale * config.repulsion_strength * masses / (rest * rest);
        let pull = dir * (config.attraction_strength * stretch + rest_tension);

        forces[source] += pull;
        forces[target] -= pull;
    }
}

/// Pull every node toward the origin
pub fn gravity_forces(nodes: &[GraphNode], strength: f32, forces: &mut [Vec3]) {
    for (force, node) in forces.iter_mut().zip(nodes) {
        *force -= node.position * (strength * node.mass());
    }
}

/// Compute the net force on every node for the current positions.
///
/// Pinned nodes exert forces on others but their own entry is zeroed.
pub fn accumulate(nodes: &[GraphNode], edges: &[SimEdge], config: &SimulationConfig) -> Vec<Vec3> {
    let mut forces = vec![Vec3::ZERO; nodes.len()];

    if nodes.len() > 1 {
        if config.uses_spatial_index(nodes.len()) {
            tree_repulsion(
                nodes,
                config.repulsion_strength,
                config.barnes_hut_theta,
                &mut forces,
            );
        } else {
            direct_repulsion(nodes, config.repulsion_strength, &mut forces);
        }
        spring_forces(nodes, edges, config, &mut forces);
    }

    gravity_forces(nodes, config.center_gravity, &mut forces);

    for (force, node) in forces.iter_mut().zip(nodes) {
        if node.pinned {
            *force = Vec3::ZERO;
        }
    }

    forces
}
