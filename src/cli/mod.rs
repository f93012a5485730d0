//! CLI module for nodeflow
//!
//! This module provides:
//! - Command implementations (run, validate, order, generators, processors)
//! - Output handlers (console, JSON, quiet)
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::cli::{commands, output};
//!
//! let handler = output::create_handler(output::OutputMode::Console);
//! let exit_code = commands::run_workflow(path, options, &config, &*handler).await?;
//! ```

pub mod commands;
pub mod output;

pub use commands::{
    RunOptions, list_generators, list_processors, parse_input, run_workflow, show_order,
    validate_workflow,
};
pub use output::{OutputEvent, OutputHandler, OutputMode, create_handler};
