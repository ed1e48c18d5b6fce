//! Graph topology types supplied by the surrounding application
//!
//! These are the records the backing store hands to the layout engine: a
//! node set `{id, type}` and an edge set `{id, source, target}`. They carry
//! no simulation state; see [`crate::layout::GraphNode`] for that.

use serde::{Deserialize, Serialize};

/// Mass constants for node types (dimensionless, 1.0 = baseline)
pub mod masses {
    /// Requirements anchor their neighbourhood
    pub const REQUIREMENT: f32 = 2.0;

    pub const TASK: f32 = 1.0;

    pub const TEST: f32 = 1.0;

    pub const RISK: f32 = 1.5;

    pub const DOCUMENT: f32 = 1.5;
}

/// Node type enumeration for the knowledge graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Requirement,
    Task,
    Test,
    Risk,
    Document,
}

impl NodeType {
    /// Effective mass used by the force accumulator and integrator
    pub fn mass(&self) -> f32 {
        match self {
            NodeType::Requirement => masses::REQUIREMENT,
            NodeType::Task => masses::TASK,
            NodeType::Test => masses::TEST,
            NodeType::Risk => masses::RISK,
            NodeType::Document => masses::DOCUMENT,
        }
    }
}

/// A node as supplied by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique identifier (e.g., "req:REQ-12", "task:431")
    pub id: String,

    /// Node type determines mass
    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Previously persisted position, if the store has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type,
            position: None,
        }
    }

    /// Start the node at a known position instead of the default placement
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Some([x, y, z]);
        self
    }
}

/// A relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Relationship identifier
    pub id: String,

    /// Source node ID
    pub source: String,

    /// Target node ID
    pub target: String,

    /// Overrides the configured ideal edge length for this edge
    #[serde(
        default,
        rename = "idealLength",
        skip_serializing_if = "Option::is_none"
    )]
    pub ideal_length: Option<f32>,
}

impl EdgeSpec {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            ideal_length: None,
        }
    }

    /// Set a per-edge rest length
    pub fn with_ideal_length(mut self, length: f32) -> Self {
        self.ideal_length = Some(length);
        self
    }
}

/// Complete topology handed to the layout engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    /// All nodes in the graph
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,

    /// All edges in the graph
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl Topology {
    pub fn new(nodes: Vec<NodeSpec>, edges: Vec<EdgeSpec>) -> Self {
        Self { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_are_heaviest() {
        for t in [
            NodeType::Task,
            NodeType::Test,
            NodeType::Risk,
            NodeType::Document,
        ] {
            assert!(NodeType::Requirement.mass() > t.mass());
        }
    }

    #[test]
    fn topology_deserializes_from_store_json() {
        let json = r#"{
            "nodes": [
                {"id": "req:1", "type": "requirement"},
                {"id": "test:7", "type": "test", "position": [1.0, 2.0, 3.0]}
            ],
            "edges": [
                {"id": "e1", "source": "test:7", "target": "req:1", "idealLength": 4.5}
            ]
        }"#;

        let topology: Topology = serde_json::from_str(json).unwrap();

        assert_eq!(topology.nodes.len(), 2);
        assert_eq!(topology.nodes[0].node_type, NodeType::Requirement);
        assert_eq!(topology.nodes[1].position, Some([1.0, 2.0, 3.0]));
        assert_eq!(topology.edges[0].ideal_length, Some(4.5));
    }

    #[test]
    fn unknown_node_type_is_rejected() {
        let json = r#"{"id": "x", "type": "sprint"}"#;
        assert!(serde_json::from_str::<NodeSpec>(json).is_err());
    }

    #[test]
    fn optional_fields_are_omitted_when_serializing() {
        let edge = EdgeSpec::new("e", "a", "b");
        let json = serde_json::to_string(&edge).unwrap();
        insta::assert_snapshot!(json, @r#"{"id":"e","source":"a","target":"b"}"#);
    }
}
