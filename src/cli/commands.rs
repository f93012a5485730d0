//! CLI command implementations

use super::output::{OutputEvent, OutputHandler, millis};
use crate::config::{NodeflowConfig, WorkflowDefinition, load_definition, node_types};
use crate::engine::{FailurePolicy, NodeStatus, RunCoordinator};
use crate::generator::{EchoGenerator, TextGenerator, create_generator, with_timeout};
use crate::processor::{AiModelProcessor, ProcessorRegistry};
use crate::template::TemplateEngine;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Options for a single `run`
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Payload for input nodes without content
    pub input: Option<Value>,

    /// Overrides `defaults.failure_policy`
    pub policy: Option<FailurePolicy>,

    /// Overrides `defaults.generator`
    pub generator: Option<String>,
}

/// Build the run input from `--input` or `--input-file`
///
/// File contents that parse as JSON are used as JSON; anything else is
/// passed through as a string.
pub fn parse_input(text: Option<String>, file: Option<&Path>) -> Result<Option<Value>> {
    if let Some(path) = file {
        let path = crate::config::expand_path(path);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading input file {}", path.display()))?;
        let value = serde_json::from_str(&contents)
            .unwrap_or_else(|_| Value::String(contents.trim_end().to_string()));
        return Ok(Some(value));
    }
    Ok(text.map(Value::String))
}

/// Generator for AIModel nodes, bounded by `defaults.timeout`
///
/// Falls back to the echo generator when no generator is named anywhere.
pub fn build_generator(
    config: &NodeflowConfig,
    name: Option<&str>,
) -> Result<Arc<dyn TextGenerator>> {
    let deadline = Duration::from_secs(config.defaults.timeout);

    let Some(name) = name.or(config.defaults.generator.as_deref()) else {
        tracing::warn!("No generator configured; aiModel nodes will echo their prompts");
        return Ok(Arc::new(with_timeout(EchoGenerator::default(), deadline)));
    };

    let generator_config = config
        .get_generator(name)
        .with_context(|| format!("unknown generator '{}'", name))?;
    let generator = create_generator(name, generator_config)
        .with_context(|| format!("creating generator '{}'", name))?;

    Ok(Arc::new(with_timeout(generator, deadline)))
}

/// Built-in processors wired to the selected generator
pub fn build_registry(config: &NodeflowConfig, generator_name: Option<&str>) -> Result<ProcessorRegistry> {
    let generator = build_generator(config, generator_name)?;

    let default_model = generator_name
        .or(config.defaults.generator.as_deref())
        .and_then(|name| config.get_generator(name))
        .and_then(|g| g.model.clone());

    let ai_model = match default_model {
        Some(model) => AiModelProcessor::new(generator).with_default_model(model),
        None => AiModelProcessor::new(generator),
    };
    Ok(ProcessorRegistry::with_ai_model(ai_model))
}

/// Run a workflow definition file
pub async fn run_workflow(
    path: &Path,
    options: RunOptions,
    config: &NodeflowConfig,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let definition = load_definition(path)?;
    let registry = build_registry(config, options.generator.as_deref())?;
    let policy = options.policy.unwrap_or(config.defaults.failure_policy);
    let coordinator = RunCoordinator::new(registry).with_policy(policy);

    handler.emit(OutputEvent::RunStart {
        workflow: definition.display_name().to_string(),
        nodes: definition.nodes.len(),
    });

    let run = coordinator.execute_with_input(&definition, options.input).await;

    for result in &run.node_results {
        handler.emit(OutputEvent::node_finished(result));
    }

    if run.node_results.is_empty() && !run.is_completed() {
        handler.emit(OutputEvent::RunError {
            error: run.error_message.clone().unwrap_or_default(),
        });
    } else {
        handler.emit(OutputEvent::RunFinished {
            status: run.status,
            duration_ms: millis(run.duration()),
            completed: run.count(NodeStatus::Completed),
            total: run.node_results.len(),
        });
    }

    handler.result(&run);
    Ok(if run.is_completed() { 0 } else { 1 })
}

/// Problems that would stop or fail a run of this definition
fn definition_problems(definition: &WorkflowDefinition, registry: &ProcessorRegistry) -> Vec<String> {
    if let Err(errors) = definition.validate() {
        return errors;
    }

    let mut problems = Vec::new();
    if let Err(e) = RunCoordinator::new(registry.clone()).plan(definition) {
        problems.push(e.to_string());
    }

    for node in &definition.nodes {
        if !registry.contains(&node.node_type) {
            problems.push(format!("node '{}' has unknown type '{}'", node.id, node.node_type));
        }
    }

    problems
}

/// AIModel prompts that will be sent as literal text, with the reason
fn literal_prompts(definition: &WorkflowDefinition) -> Vec<String> {
    let templates = TemplateEngine::new();

    definition
        .nodes
        .iter()
        .filter(|node| node.node_type == node_types::AI_MODEL)
        .filter_map(|node| {
            let prompt = node.data.prompt.as_deref()?;
            let reason = templates.literal_reason(prompt)?;
            Some(format!(
                "  note: node '{}' prompt is sent as literal text ({})",
                node.id, reason
            ))
        })
        .collect()
}

/// Validate a workflow definition file without running it
pub fn validate_workflow(path: &Path, handler: &dyn OutputHandler) -> Result<i32> {
    let definition = match load_definition(path) {
        Ok(definition) => definition,
        Err(e) => {
            handler.emit(OutputEvent::RunError {
                error: format!("failed to load workflow: {:#}", e),
            });
            return Ok(1);
        }
    };

    let registry = ProcessorRegistry::with_builtins(Arc::new(EchoGenerator::default()));
    let problems = definition_problems(&definition, &registry);
    let notes = literal_prompts(&definition);

    if problems.is_empty() {
        handler.emit(OutputEvent::info(format!(
            "✓ Workflow '{}' is valid ({} nodes, {} edges)",
            definition.display_name(),
            definition.nodes.len(),
            definition.edges.len()
        )));
        for note in notes {
            handler.emit(OutputEvent::info(note));
        }
        return Ok(0);
    }

    handler.emit(OutputEvent::info(format!(
        "✗ Workflow '{}' has {} problem(s):",
        definition.display_name(),
        problems.len()
    )));
    for problem in problems {
        handler.emit(OutputEvent::info(format!("  - {}", problem)));
    }
    for note in notes {
        handler.emit(OutputEvent::info(note));
    }
    Ok(1)
}

/// Print the execution order of a workflow definition file
pub fn show_order(path: &Path, handler: &dyn OutputHandler) -> Result<i32> {
    let definition = load_definition(path)?;
    let registry = ProcessorRegistry::new();

    let (graph, order) = match RunCoordinator::new(registry).plan(&definition) {
        Ok(plan) => plan,
        Err(e) => {
            handler.emit(OutputEvent::RunError {
                error: e.to_string(),
            });
            return Ok(1);
        }
    };

    for (index, node_id) in order.iter().enumerate() {
        let node_type = definition
            .get_node(node_id)
            .map(|n| n.node_type.as_str())
            .unwrap_or("?");
        let upstream = graph.upstream(node_id);

        let line = if upstream.is_empty() {
            format!("{:>3}. {} ({})", index + 1, node_id, node_type)
        } else {
            format!(
                "{:>3}. {} ({}) after {}",
                index + 1,
                node_id,
                node_type,
                upstream.join(", ")
            )
        };
        handler.emit(OutputEvent::info(line));
    }
    Ok(0)
}

/// List configured generators and whether they are reachable
pub async fn list_generators(config: &NodeflowConfig, handler: &dyn OutputHandler) -> i32 {
    if config.generators.is_empty() {
        handler.emit(OutputEvent::info(
            "(no generators configured; aiModel nodes echo their prompts)",
        ));
        return 0;
    }

    let mut names: Vec<&String> = config.generators.keys().collect();
    names.sort();

    let mut all_ok = true;
    for name in names {
        let generator_config = &config.generators[name];
        let default_marker = if config.defaults.generator.as_deref() == Some(name.as_str()) {
            " [default]"
        } else {
            ""
        };

        let message = if !generator_config.enabled {
            format!("- {} ({}: {}) disabled", name, generator_config.kind(), generator_config.command)
        } else {
            let available = match create_generator(name, generator_config) {
                Ok(generator) => generator.is_available().await,
                Err(e) => {
                    tracing::debug!(generator = %name, error = %e, "Could not create generator");
                    false
                }
            };
            all_ok &= available;
            format!(
                "{} {} ({}: {}){}",
                if available { "✓" } else { "✗" },
                name,
                generator_config.kind(),
                generator_config.command,
                default_marker
            )
        };
        handler.emit(OutputEvent::info(message));
    }

    if all_ok { 0 } else { 1 }
}

/// List registered node types
pub fn list_processors(registry: &ProcessorRegistry, handler: &dyn OutputHandler) {
    for node_type in registry.types() {
        handler.emit(OutputEvent::info(node_type));
    }
}
