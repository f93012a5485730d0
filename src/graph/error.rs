//! Errors raised while resolving and ordering a workflow graph

use std::fmt;
use thiserror::Error;

/// Which end of an edge failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEndpoint {
    Source,
    Target,
}

impl fmt::Display for EdgeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeEndpoint::Source => write!(f, "source"),
            EdgeEndpoint::Target => write!(f, "target"),
        }
    }
}

/// Definition and structural errors; both abort a run before any dispatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("invalid reference: edge '{edge_id}' {endpoint} names unknown node '{node_id}'")]
    InvalidReference {
        edge_id: String,
        endpoint: EdgeEndpoint,
        node_id: String,
    },

    #[error("invalid definition: node id '{node_id}' appears more than once")]
    DuplicateNode { node_id: String },

    #[error("cycle detected at node '{node_id}': {}", format_cycle(.cycle))]
    CycleDetected { node_id: String, cycle: Vec<String> },
}

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {}", cycle.join(" -> "), first),
        None => "(unknown path)".to_string(),
    }
}
