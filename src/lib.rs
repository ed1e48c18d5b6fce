//! reqgraph-layout - 3D layout engine for requirements knowledge graphs.
//!
//! This crate computes positions for the nodes of a requirements/task/test/
//! risk/document graph using a force-directed simulation with a Barnes-Hut
//! octree and an annealing schedule. Rendering and persistence belong to the
//! surrounding application, which feeds topology in and subscribes to
//! position updates.

pub mod graph_types;
pub mod io;
pub mod layout;
