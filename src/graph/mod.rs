//! Graph analysis for workflow definitions
//!
//! This module handles:
//! - Dependency resolution with reference validation
//! - Deterministic topological ordering
//! - Cycle detection with the offending path
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::graph::{order, resolve};
//!
//! let graph = resolve(&definition)?;
//! let order = order(&graph)?;
//! for node_id in &order {
//!     println!("{} waits on {:?}", node_id, graph.upstream(node_id));
//! }
//! ```

mod error;
mod resolver;
mod scheduler;

pub use error::{EdgeEndpoint, GraphError};
pub use resolver::{DependencyGraph, resolve};
pub use scheduler::{ExecutionOrder, order};
