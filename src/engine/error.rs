//! Errors that stop a run before or during dispatch

use super::run::RunStateError;
use crate::graph::GraphError;
use thiserror::Error;

/// Run-level failures; recorded on the run as its `error_message`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("run state: {0}")]
    RunState(#[from] RunStateError),
}

impl EngineError {
    /// True when the definition could not be scheduled at all
    pub fn is_structural(&self) -> bool {
        matches!(self, EngineError::Graph(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_errors_display_unchanged() {
        let graph = GraphError::DuplicateNode {
            node_id: "a".into(),
        };
        let err = EngineError::from(graph.clone());

        assert_eq!(err.to_string(), graph.to_string());
        assert!(err.is_structural());
    }

    #[test]
    fn test_run_state_error() {
        let err = EngineError::from(RunStateError::DuplicateResult {
            node_id: "a".into(),
        });
        assert!(err.to_string().starts_with("run state:"));
        assert!(!err.is_structural());
    }
}
