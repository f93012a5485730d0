//! Node processors and the registry that dispatches to them
//!
//! A processor turns a node's configuration plus the payloads of its direct
//! dependencies into a JSON payload. The registry maps type tags to
//! processors; it is an explicit value handed to the run coordinator, so
//! callers can add or replace processors before a run.
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::generator::EchoGenerator;
//! use nodeflow::processor::ProcessorRegistry;
//!
//! let mut registry = ProcessorRegistry::with_builtins(Arc::new(EchoGenerator::default()));
//! registry.register("uppercase", Arc::new(UppercaseProcessor));
//! ```

mod ai_model;
mod input;
mod output;
mod processing;

pub use ai_model::AiModelProcessor;
pub use input::InputProcessor;
pub use output::OutputProcessor;
pub use processing::TextAnalysisProcessor;

use crate::config::{Node, node_types};
use crate::engine::{NodeResult, NodeStatus};
use crate::generator::{GeneratorError, TextGenerator};
use crate::template::TemplateError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors a processor can fail a node with
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("no processor registered for node type '{node_type}'")]
    UnknownNodeType { node_type: String },

    #[error("generation failed: {0}")]
    Generation(#[from] GeneratorError),

    #[error("prompt template: {0}")]
    Template(#[from] TemplateError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result of a direct dependency, as seen by a dependent node
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    pub node_id: &'a str,
    pub status: NodeStatus,
    /// Absent when the dependency failed or was skipped
    pub payload: Option<&'a Value>,
}

impl<'a> Upstream<'a> {
    /// The dependency's `text` field, if it produced a string one
    pub fn text(&self) -> Option<&'a str> {
        self.payload?.get("text")?.as_str()
    }
}

/// Read-only view of a node's direct dependencies, in edge order
#[derive(Debug, Clone, Default)]
pub struct Inputs<'a> {
    entries: Vec<Upstream<'a>>,
}

impl<'a> Inputs<'a> {
    pub fn new(entries: Vec<Upstream<'a>>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Upstream<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, node_id: &str) -> Option<&Upstream<'a>> {
        self.entries.iter().find(|u| u.node_id == node_id)
    }

    /// Payloads in dependency order; failed dependencies are `None`
    pub fn payloads(&self) -> Vec<Option<&'a Value>> {
        self.entries.iter().map(|u| u.payload).collect()
    }

    /// `text` fields of dependencies that produced one
    pub fn texts(&self) -> Vec<&'a str> {
        self.entries.iter().filter_map(|u| u.text()).collect()
    }

    /// Dependencies that did not complete
    pub fn unfinished(&self) -> impl Iterator<Item = &Upstream<'a>> {
        self.entries
            .iter()
            .filter(|u| u.status != NodeStatus::Completed)
    }
}

/// Everything a processor may read while handling one node
#[derive(Debug, Clone, Default)]
pub struct ProcessContext<'a> {
    pub inputs: Inputs<'a>,

    /// Payload the run was started with
    pub run_input: Option<&'a Value>,
}

impl<'a> ProcessContext<'a> {
    pub fn new(inputs: Inputs<'a>, run_input: Option<&'a Value>) -> Self {
        Self { inputs, run_input }
    }
}

/// Type-specific node logic
#[async_trait]
pub trait NodeProcessor: Send + Sync {
    async fn process(&self, node: &Node, ctx: &ProcessContext<'_>) -> Result<Value, ProcessorError>;
}

/// Map from node type tag to processor
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn NodeProcessor>>,
}

impl ProcessorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in processors, AIModel nodes backed by `generator`
    pub fn with_builtins(generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_ai_model(AiModelProcessor::new(generator))
    }

    /// Registry with the built-in processors and a preconfigured AIModel processor
    pub fn with_ai_model(ai_model: AiModelProcessor) -> Self {
        let mut registry = Self::new();
        let analysis: Arc<dyn NodeProcessor> = Arc::new(TextAnalysisProcessor);

        registry.register(node_types::INPUT, Arc::new(InputProcessor));
        registry.register(node_types::AI_MODEL, Arc::new(ai_model));
        registry.register(node_types::PROCESSING, analysis.clone());
        registry.register(node_types::ADVANCED_PROCESSING, analysis);
        registry.register(node_types::OUTPUT, Arc::new(OutputProcessor));
        registry
    }

    /// Add or replace the processor for a type tag
    pub fn register(&mut self, node_type: impl Into<String>, processor: Arc<dyn NodeProcessor>) {
        let node_type = node_type.into();
        if self.processors.insert(node_type.clone(), processor).is_some() {
            tracing::debug!(node_type = %node_type, "Replaced node processor");
        }
    }

    pub fn get(&self, node_type: &str) -> Option<&Arc<dyn NodeProcessor>> {
        self.processors.get(node_type)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.processors.contains_key(node_type)
    }

    /// Registered type tags, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Run the node's processor, timing it and turning any error into a failed result
    pub async fn dispatch(&self, node: &Node, ctx: &ProcessContext<'_>) -> NodeResult {
        let start = Instant::now();

        let outcome = match self.get(&node.node_type) {
            Some(processor) => processor.process(node, ctx).await,
            None => Err(ProcessorError::UnknownNodeType {
                node_type: node.node_type.clone(),
            }),
        };

        let elapsed = start.elapsed();
        match outcome {
            Ok(payload) => NodeResult::completed(&node.id, &node.node_type, payload, elapsed),
            Err(e) => {
                tracing::warn!(
                    node_id = %node.id,
                    node_type = %node.node_type,
                    error = %e,
                    "Node failed"
                );
                NodeResult::failed(&node.id, &node.node_type, e.to_string(), elapsed)
            }
        }
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("types", &self.types())
            .finish()
    }
}

/// Current time in the payload timestamp format
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::generator::{GenerationRequest, Generation, GeneratorError, TextGenerator};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Generator returning a fixed reply and remembering every request
    pub struct MockGenerator {
        reply: Result<String, GeneratorError>,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl MockGenerator {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: GeneratorError) -> Self {
            Self {
                reply: Err(error),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn last_request(&self) -> Option<GenerationRequest> {
            self.requests.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl TextGenerator for MockGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map(Generation::new)
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}
