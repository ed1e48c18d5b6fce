//! Damped, clamped, temperature-scaled velocity integration

use glam::Vec3;
use tracing::warn;

use super::types::GraphNode;

/// Per-step integration parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationParams {
    pub time_step: f32,
    /// Fraction of velocity kept each step
    pub damping: f32,
    pub max_velocity: f32,
    /// Current temperature over initial temperature
    pub temperature_scale: f32,
}

/// Outcome of one integration pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrationReport {
    /// Indices of nodes reverted after producing non-finite values
    pub recovered: Vec<usize>,
    /// Largest displacement applied to any node
    pub max_displacement: f32,
}

/// Advance velocity and position of every unpinned node.
///
/// A node whose new position or velocity is not finite is put back where it
/// was with zero velocity; the rest of the pass is unaffected.
pub fn integrate(
    nodes: &mut [GraphNode],
    forces: &[Vec3],
    params: &IntegrationParams,
) -> IntegrationReport {
    let mut report = IntegrationReport::default();

    for (index, (node, force)) in nodes.iter_mut().zip(forces).enumerate() {
        if node.pinned {
            node.velocity = Vec3::ZERO;
            continue;
        }

        let previous = node.position;

        let acceleration = *force / node.mass();
        let velocity = (node.velocity + acceleration * params.time_step) * params.damping;
        node.velocity = velocity.clamp_length_max(params.max_velocity);
        node.position += node.velocity * (params.time_step * params.temperature_scale);

        if !node.is_finite() {
            warn!(node = %node.id, ?force, "non-finite state after integration, reverting node");
            node.position = previous;
            node.velocity = Vec3::ZERO;
            report.recovered.push(index);
            continue;
        }

        report.max_displacement = report
            .max_displacement
            .max(node.position.distance(previous));
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_types::NodeType;

    fn params() -> IntegrationParams {
        IntegrationParams {
            time_step: 0.1,
            damping: 0.85,
            max_velocity: 10.0,
            temperature_scale: 1.0,
        }
    }

    fn task(x: f32) -> GraphNode {
        GraphNode::new("t", NodeType::Task, Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn force_accelerates_then_damps() {
        let mut nodes = vec![task(0.0)];
        integrate(&mut nodes, &[Vec3::new(10.0, 0.0, 0.0)], &params());

        // (0 + 10 * 0.1) * 0.85
        assert!((nodes[0].velocity.x - 0.85).abs() < 1e-6);
        assert!((nodes[0].position.x - 0.085).abs() < 1e-6);
    }

    #[test]
    fn heavier_nodes_accelerate_less() {
        let mut nodes = vec![
            GraphNode::new("r", NodeType::Requirement, Vec3::ZERO),
            GraphNode::new("t", NodeType::Task, Vec3::ZERO),
        ];
        let forces = [Vec3::X, Vec3::X];
        integrate(&mut nodes, &forces, &params());

        assert!(nodes[0].velocity.x < nodes[1].velocity.x);
    }

    #[test]
    fn velocity_is_clamped() {
        let mut nodes = vec![task(0.0)];
        integrate(&mut nodes, &[Vec3::new(1e6, 1e6, 0.0)], &params());

        assert!(nodes[0].velocity.length() <= 10.0 + 1e-4);
    }

    #[test]
    fn temperature_scales_displacement() {
        let mut hot = vec![task(0.0)];
        let mut cold = vec![task(0.0)];
        let force = [Vec3::new(10.0, 0.0, 0.0)];

        integrate(&mut hot, &force, &params());
        integrate(
            &mut cold,
            &force,
            &IntegrationParams {
                temperature_scale: 0.1,
                ..params()
            },
        );

        assert_eq!(hot[0].velocity, cold[0].velocity);
        assert!((cold[0].position.x * 10.0 - hot[0].position.x).abs() < 1e-6);
    }

    #[test]
    fn pinned_nodes_do_not_move() {
        let mut nodes = vec![task(5.0)];
        nodes[0].pinned = true;
        nodes[0].velocity = Vec3::ONE;
        integrate(&mut nodes, &[Vec3::new(100.0, 0.0, 0.0)], &params());

        assert_eq!(nodes[0].position, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(nodes[0].velocity, Vec3::ZERO);
    }

    #[test]
    fn non_finite_force_reverts_only_that_node() {
        let mut nodes = vec![task(1.0), task(2.0)];
        let forces = [Vec3::new(f32::NAN, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let report = integrate(&mut nodes, &forces, &params());

        assert_eq!(report.recovered, vec![0]);
        assert_eq!(nodes[0].position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(nodes[0].velocity, Vec3::ZERO);
        assert!(nodes[1].position.x > 2.0);
    }

    #[test]
    fn infinite_force_is_recovered() {
        let mut nodes = vec![task(1.0)];
        let report = integrate(&mut nodes, &[Vec3::new(f32::INFINITY, 0.0, 0.0)], &params());

        assert_eq!(report.recovered, vec![0]);
        assert!(nodes[0].is_finite());
    }
}
