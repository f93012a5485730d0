//! AIModel nodes: prompt rendering and text generation

use super::{NodeProcessor, ProcessContext, ProcessorError, timestamp};
use crate::config::Node;
use crate::generator::{GenerationRequest, TextGenerator};
use crate::template::{PromptContext, TemplateEngine};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PROMPT: &str = "Generate a response";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Calls the injected generator with the node's rendered prompt
///
/// Upstream texts are joined with single spaces into the prompt context. A
/// prompt may be a template over `input`, `inputs`, `model`, `temperature`
/// and `node_id`; anything else is literal text. A prompt that reads neither
/// `input` nor `inputs` gets the context appended after a blank line.
pub struct AiModelProcessor {
    generator: Arc<dyn TextGenerator>,
    templates: TemplateEngine,
    default_model: String,
    system_prompt: Option<String>,
}

impl AiModelProcessor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            templates: TemplateEngine::new(),
            default_model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
        }
    }

    /// Model used by nodes that do not name one
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// System prompt sent with every generation request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Build the full prompt sent to the generator
    fn build_prompt(
        &self,
        template: &str,
        prompt_ctx: &PromptContext,
    ) -> Result<String, ProcessorError> {
        let rendered = self.templates.render_prompt(template, prompt_ctx)?;

        if prompt_ctx.input.is_empty() || rendered.reads_context {
            return Ok(rendered.text);
        }
        Ok(format!("{}\n\n{}", rendered.text, prompt_ctx.input))
    }
}

#[async_trait]
impl NodeProcessor for AiModelProcessor {
    async fn process(&self, node: &Node, ctx: &ProcessContext<'_>) -> Result<Value, ProcessorError> {
        let data = &node.data;
        let model = data.model.as_deref().unwrap_or(&self.default_model);
        let temperature = data.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        let template = data.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);

        let texts = ctx.inputs.texts().into_iter().map(String::from).collect();
        let prompt_ctx = PromptContext::from_texts(texts)
            .with_model(model, temperature)
            .with_node_id(&node.id);
        let prompt = self.build_prompt(template, &prompt_ctx)?;

        let mut request = GenerationRequest::new(prompt, model, temperature);
        if let Some(max_tokens) = data.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(ref system) = self.system_prompt {
            request = request.with_system_prompt(system.clone());
        }

        tracing::debug!(
            node_id = %node.id,
            generator = %self.generator.name(),
            model = %model,
            prompt_len = request.prompt.len(),
            "Generating text"
        );

        let generation = self.generator.generate(&request).await?;

        Ok(json!({
            "text": generation.text,
            "model": model,
            "temperature": prompt_ctx.temperature,
            "prompt": template,
            "tokenCount": generation.approx_tokens,
            "timestamp": timestamp(),
            "nodeId": node.id,
        }))
    }
}
