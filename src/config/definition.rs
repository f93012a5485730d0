//! Workflow definition: nodes, edges and node configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Built-in node type tags
pub mod node_types {
    pub const INPUT: &str = "input";
    pub const AI_MODEL: &str = "aiModel";
    pub const PROCESSING: &str = "processing";
    pub const ADVANCED_PROCESSING: &str = "advancedProcessing";
    pub const OUTPUT: &str = "output";
}

/// Editor canvas position (carried, never interpreted)
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Type-specific node configuration
///
/// Every field is optional; each processor reads the ones it understands and
/// falls back to its own defaults. Unrecognized keys are kept in `extra` so
/// that custom processors can read their own configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NodeData {
    /// Static text (input nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Model name (aiModel nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Prompt template (aiModel nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Sampling temperature (aiModel nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Generation limit (aiModel nodes)
    #[serde(
        default,
        alias = "maxTokens",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<u32>,

    /// Serialization format (output nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Legacy spelling of the output format
    #[serde(
        default,
        rename = "outputType",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_type: Option<String>,

    /// Label for the kind of processing performed (processing nodes)
    #[serde(
        default,
        rename = "processingType",
        skip_serializing_if = "Option::is_none"
    )]
    pub processing_type: Option<String>,

    /// Anything else, kept for custom processors
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A unit of work in the graph
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Node {
    /// Unique within a definition
    pub id: String,

    /// Type tag used for processor dispatch
    #[serde(rename = "type")]
    pub node_type: String,

    #[serde(default)]
    pub data: NodeData,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: NodeData::default(),
            position: None,
        }
    }

    /// Replace the node configuration
    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }
}

/// Directed dependency: `target` consumes the result of `source`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,

    #[serde(
        default,
        rename = "sourceHandle",
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,

    #[serde(
        default,
        rename = "targetHandle",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Edge with an id derived from its endpoints
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self::new(format!("{}->{}", source, target), source, target)
    }
}

/// A complete workflow graph
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct WorkflowDefinition {
    /// Identifier of the stored workflow this definition belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Nodes in listing order; the order breaks scheduling ties
    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowDefinition {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            id: None,
            name: None,
            nodes,
            edges,
        }
    }

    /// Get a node by ID
    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Name to show in logs and console output
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("workflow")
    }

    /// Collect every structural problem without stopping at the first one
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                errors.push(format!("duplicate node id: {}", node.id));
            }
        }

        for edge in &self.edges {
            if !seen.contains(edge.source.as_str()) {
                errors.push(format!(
                    "edge '{}' references unknown source node '{}'",
                    edge.id, edge.source
                ));
            }
            if !seen.contains(edge.target.as_str()) {
                errors.push(format!(
                    "edge '{}' references unknown target node '{}'",
                    edge.id, edge.target
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
