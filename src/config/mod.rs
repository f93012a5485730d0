//! Configuration and workflow definition types for nodeflow

mod definition;
mod generator;
mod loader;

pub use definition::{Edge, Node, NodeData, Position, WorkflowDefinition, node_types};
pub use generator::GeneratorConfig;
pub use loader::{Defaults, NodeflowConfig, expand_path, load_definition};
