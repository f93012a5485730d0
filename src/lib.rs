//! nodeflow: run typed node graphs in dependency order
//!
//! A [`config::WorkflowDefinition`] is resolved into a dependency graph,
//! ordered with Kahn's algorithm and dispatched node by node through a
//! [`processor::ProcessorRegistry`]. The outcome is a [`engine::WorkflowRun`]
//! holding one result per node and an aggregate status.

pub mod cli;
pub mod config;
pub mod engine;
pub mod generator;
pub mod graph;
pub mod logging;
pub mod processor;
pub mod template;
