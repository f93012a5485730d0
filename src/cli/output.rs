//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use crate::engine::{NodeResult, NodeStatus, RunStatus, WorkflowRun};
use serde::Serialize;
use std::time::Duration;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Per-node progress and a summary on stderr, final text on stdout
    #[default]
    Console,
    /// The full run record as JSON on stdout
    Json,
    /// Only the final text on stdout
    Quiet,
}

/// Events emitted by CLI commands
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    RunStart {
        workflow: String,
        nodes: usize,
    },
    NodeFinished {
        node_id: String,
        node_type: String,
        status: NodeStatus,
        duration_ms: u64,
        error: Option<String>,
    },
    RunFinished {
        status: RunStatus,
        duration_ms: u64,
        completed: usize,
        total: usize,
    },
    RunError {
        error: String,
    },
    Info {
        message: String,
    },
}

impl OutputEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub fn node_finished(result: &NodeResult) -> Self {
        Self::NodeFinished {
            node_id: result.node_id.clone(),
            node_type: result.node_type.clone(),
            status: result.status,
            duration_ms: result.execution_time.as_millis() as u64,
            error: result.error.clone(),
        }
    }
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write the finished run
    fn result(&self, run: &WorkflowRun);
}

/// Console output handler
pub struct ConsoleHandler;

impl ConsoleHandler {
    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }

    fn marker(status: NodeStatus) -> &'static str {
        match status {
            NodeStatus::Completed => "✓",
            NodeStatus::Failed => "✗",
            NodeStatus::Skipped => "-",
        }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::RunStart { workflow, nodes } => {
                eprintln!("Running workflow '{}' ({} nodes)", workflow, nodes);
            }
            OutputEvent::NodeFinished {
                node_id,
                node_type,
                status,
                duration_ms,
                error,
            } => {
                let line = format!(
                    "  {} {} ({}) {}",
                    Self::marker(status),
                    node_id,
                    node_type,
                    Self::format_duration(duration_ms)
                );
                match error {
                    Some(error) => eprintln!("{}: {}", line, error),
                    None => eprintln!("{}", line),
                }
            }
            OutputEvent::RunFinished {
                status,
                duration_ms,
                completed,
                total,
            } => {
                eprintln!();
                if status == RunStatus::Completed {
                    eprintln!(
                        "✓ Workflow completed ({} nodes in {})",
                        total,
                        Self::format_duration(duration_ms)
                    );
                } else {
                    eprintln!(
                        "✗ Workflow failed ({}/{} nodes completed, {})",
                        completed,
                        total,
                        Self::format_duration(duration_ms)
                    );
                }
            }
            OutputEvent::RunError { error } => {
                eprintln!("Error: {}", error);
            }
            OutputEvent::Info { message } => {
                eprintln!("{}", message);
            }
        }
    }

    fn result(&self, run: &WorkflowRun) {
        if let Some(text) = run.final_text() {
            println!("{}", text);
        }
    }
}

/// JSON output handler
///
/// Progress events are dropped so that stdout holds a single JSON document
/// per command; informational events are printed as JSON lines.
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        match json {
            Ok(s) => println!("{}", s),
            Err(e) => tracing::error!(error = %e, "Failed to serialize output"),
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        if matches!(event, OutputEvent::Info { .. } | OutputEvent::RunError { .. }) {
            self.print_json(&event);
        }
    }

    fn result(&self, run: &WorkflowRun) {
        self.print_json(run);
    }
}

/// Quiet handler that only prints the final text
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, _event: OutputEvent) {}

    fn result(&self, run: &WorkflowRun) {
        if let Some(text) = run.final_text() {
            println!("{}", text);
        }
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler),
        OutputMode::Json => Box::new(JsonHandler::new(true)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

/// Milliseconds in an optional duration
pub(crate) fn millis(duration: Option<Duration>) -> u64 {
    duration.map(|d| d.as_millis() as u64).unwrap_or(0)
}
