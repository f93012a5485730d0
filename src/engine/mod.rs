//! Workflow execution
//!
//! [`RunCoordinator`] resolves a definition into a dependency graph, orders
//! it, dispatches each node through the processor registry and returns the
//! finished [`WorkflowRun`]. Dispatch is sequential within a run; results are
//! recorded in execution order.
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::engine::{FailurePolicy, RunCoordinator};
//! use nodeflow::processor::ProcessorRegistry;
//!
//! let coordinator = RunCoordinator::new(ProcessorRegistry::with_builtins(generator))
//!     .with_policy(FailurePolicy::SkipDownstream);
//!
//! let run = coordinator.execute(&definition).await;
//! println!("{}: {} results", run.status, run.node_results.len());
//! ```

mod coordinator;
mod error;
mod run;

pub use coordinator::{FailurePolicy, RunCoordinator};
pub use error::EngineError;
pub use run::{NodeResult, NodeStatus, RunStateError, RunStatus, WorkflowRun};
