//! Core graph contracts for causalchemy.
//!
//! This crate defines the causal graph representation, its structural
//! validation and the deterministic topological scheduler shared by the
//! generation engine, the plan tooling and the CLI.

pub mod error;
pub mod graph;
pub mod scheduler;
pub mod validation;

pub use error::{Error, Result};
pub use graph::{
    GraphReport, GraphSpec, GraphSummary, Node, Parent, build_graph_report,
    nodes_from_matrix,
};
pub use scheduler::{TieBreak, TopologicalScheduler};
pub use validation::{detect_cycle, validate_matrix, validate_nodes, validate_structure};
