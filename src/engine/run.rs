//! Run record: per-node results and the run lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Outcome of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Completed,
    Failed,
    /// Not dispatched because a dependency failed (skip-downstream policy only)
    Skipped,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Result of running one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: String,

    pub node_type: String,

    pub status: NodeStatus,

    /// Payload produced by the processor (completed nodes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock processing time, serialized as fractional seconds
    #[serde(with = "duration_secs")]
    pub execution_time: Duration,
}

impl NodeResult {
    pub fn completed(
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        result: serde_json::Value,
        execution_time: Duration,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            status: NodeStatus::Completed,
            result: Some(result),
            error: None,
            execution_time,
        }
    }

    pub fn failed(
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        error: impl Into<String>,
        execution_time: Duration,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            status: NodeStatus::Failed,
            result: None,
            error: Some(error.into()),
            execution_time,
        }
    }

    pub fn skipped(
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            status: NodeStatus::Skipped,
            result: None,
            error: Some(reason.into()),
            execution_time: Duration::ZERO,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == NodeStatus::Completed
    }
}

/// Misuse of the run lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunStateError {
    #[error("invalid run transition from {from} to {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },

    #[error("cannot record node '{node_id}' while the run is {status}")]
    NotRunning { node_id: String, status: RunStatus },

    #[error("node '{node_id}' already has a result in this run")]
    DuplicateResult { node_id: String },
}

/// One execution attempt of a workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: Uuid,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<serde_json::Value>,

    /// Results in dispatch order
    pub node_results: Vec<NodeResult>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl WorkflowRun {
    /// Create a pending run
    pub fn new(workflow_id: Option<String>, input: Option<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            status: RunStatus::Pending,
            input,
            node_results: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// pending -> running
    pub fn start(&mut self) -> Result<(), RunStateError> {
        if self.status != RunStatus::Pending {
            return Err(RunStateError::InvalidTransition {
                from: self.status,
                to: RunStatus::Running,
            });
        }
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Append a node result; each node may be recorded once
    pub fn record(&mut self, result: NodeResult) -> Result<(), RunStateError> {
        if self.status != RunStatus::Running {
            return Err(RunStateError::NotRunning {
                node_id: result.node_id,
                status: self.status,
            });
        }
        if self.result(&result.node_id).is_some() {
            return Err(RunStateError::DuplicateResult {
                node_id: result.node_id,
            });
        }
        self.node_results.push(result);
        Ok(())
    }

    /// running -> completed if every node completed, otherwise running -> failed
    pub fn finish(&mut self) -> Result<RunStatus, RunStateError> {
        if self.status != RunStatus::Running {
            return Err(RunStateError::InvalidTransition {
                from: self.status,
                to: RunStatus::Completed,
            });
        }

        // per-node failures live in their results; error_message is run-level only
        self.status = if self.node_results.iter().all(NodeResult::is_completed) {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.completed_at = Some(Utc::now());
        Ok(self.status)
    }

    /// Fail a run that has not reached a terminal state
    pub fn abort(&mut self, message: impl Into<String>) -> Result<(), RunStateError> {
        if self.status.is_terminal() {
            return Err(RunStateError::InvalidTransition {
                from: self.status,
                to: RunStatus::Failed,
            });
        }
        self.status = RunStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn result(&self, node_id: &str) -> Option<&NodeResult> {
        self.node_results.iter().find(|r| r.node_id == node_id)
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Count of results with the given status
    pub fn count(&self, status: NodeStatus) -> usize {
        self.node_results.iter().filter(|r| r.status == status).count()
    }

    /// Time between start and completion
    pub fn duration(&self) -> Option<Duration> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        (completed - started).to_std().ok()
    }

    /// Text of the last completed node that produced some
    ///
    /// Prefers an `output` string (text-format output nodes), then `text`.
    pub fn final_text(&self) -> Option<&str> {
        self.node_results
            .iter()
            .rev()
            .filter(|r| r.is_completed())
            .filter_map(|r| r.result.as_ref())
            .find_map(|payload| {
                payload
                    .get("output")
                    .and_then(|v| v.as_str())
                    .or_else(|| payload.get("text").and_then(|v| v.as_str()))
            })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completed(id: &str) -> NodeResult {
        NodeResult::completed(id, "input", json!({"text": id}), Duration::from_millis(5))
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = WorkflowRun::new(Some("wf-1".into()), Some(json!("hello")));
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.workflow_id.as_deref(), Some("wf-1"));
        assert!(run.node_results.is_empty());
        assert!(run.started_at.is_none());
        assert!(run.completed_at.is_none());
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = WorkflowRun::new(None, None);
        let b = WorkflowRun::new(None, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_all_completed_finishes_completed() {
        let mut run = WorkflowRun::new(None, None);
        run.start().unwrap();
        run.record(completed("a")).unwrap();
        run.record(completed("b")).unwrap();

        assert_eq!(run.finish().unwrap(), RunStatus::Completed);
        assert!(run.is_completed());
        assert!(run.error_message.is_none());
        assert!(run.completed_at.is_some());
        assert!(run.duration().is_some());
    }

    #[test]
    fn test_any_failure_finishes_failed() {
        let mut run = WorkflowRun::new(None, None);
        run.start().unwrap();
        run.record(completed("a")).unwrap();
        run.record(NodeResult::failed("b", "aiModel", "boom", Duration::ZERO))
            .unwrap();
        run.record(NodeResult::skipped("c", "output", "dependency 'b' failed"))
            .unwrap();

        assert_eq!(run.finish().unwrap(), RunStatus::Failed);
        assert!(run.error_message.is_none());
        assert_eq!(run.result("b").unwrap().error.as_deref(), Some("boom"));
        assert_eq!(run.count(NodeStatus::Completed), 1);
        assert_eq!(run.count(NodeStatus::Skipped), 1);
    }

    #[test]
    fn test_empty_run_completes() {
        let mut run = WorkflowRun::new(None, None);
        run.start().unwrap();
        assert_eq!(run.finish().unwrap(), RunStatus::Completed);
    }

    #[test]
    fn test_record_rejects_duplicates_and_wrong_state() {
        let mut run = WorkflowRun::new(None, None);
        assert!(matches!(
            run.record(completed("a")),
            Err(RunStateError::NotRunning { .. })
        ));

        run.start().unwrap();
        run.record(completed("a")).unwrap();
        assert_eq!(
            run.record(completed("a")),
            Err(RunStateError::DuplicateResult {
                node_id: "a".into()
            })
        );

        run.finish().unwrap();
        assert!(matches!(
            run.record(completed("b")),
            Err(RunStateError::NotRunning { .. })
        ));
    }

    #[test]
    fn test_illegal_transitions() {
        let mut run = WorkflowRun::new(None, None);
        assert_eq!(
            run.finish(),
            Err(RunStateError::InvalidTransition {
                from: RunStatus::Pending,
                to: RunStatus::Completed
            })
        );

        run.start().unwrap();
        assert!(run.start().is_err());

        run.finish().unwrap();
        assert!(run.abort("late").is_err());
        assert!(run.finish().is_err());
    }

    #[test]
    fn test_abort_from_pending() {
        let mut run = WorkflowRun::new(None, None);
        run.abort("cycle detected at node 'a': a -> b -> a").unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.error_message.unwrap().contains("cycle"));
        assert!(run.node_results.is_empty());
        assert!(run.started_at.is_none());
    }

    #[test]
    fn test_final_text() {
        let mut run = WorkflowRun::new(None, None);
        run.start().unwrap();
        run.record(completed("a")).unwrap();
        run.record(NodeResult::completed(
            "out",
            "output",
            json!({"output": "final", "text": "final", "format": "text"}),
            Duration::ZERO,
        ))
        .unwrap();
        run.record(NodeResult::failed("late", "aiModel", "boom", Duration::ZERO))
            .unwrap();

        assert_eq!(run.final_text(), Some("final"));
    }

    #[test]
    fn test_serialized_shape() {
        let result = NodeResult::completed("n1", "input", json!({"text": "hi"}), Duration::from_millis(1500));
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["status"], "completed");
        assert_eq!(value["execution_time"], 1.5);
        assert!(value.get("error").is_none());

        let back: NodeResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);

        let run = WorkflowRun::new(None, None);
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["status"], "pending");
    }
}
