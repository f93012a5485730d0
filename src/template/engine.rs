//! Template engine for rendering AIModel prompts

use super::context::PromptContext;
use super::errors::TemplateError;
use super::filters;
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use std::collections::HashSet;

/// Prompt rendering engine
///
/// Wraps minijinja with custom filters and strict undefined handling, so a
/// misspelled variable fails the node instead of rendering as empty text.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        filters::register_filters(&mut env);
        Self { env }
    }

    /// Render a prompt template against a context
    ///
    /// ```ignore
    /// let engine = TemplateEngine::new();
    /// let ctx = PromptContext::from_texts(vec!["the report".into()]);
    ///
    /// let prompt = engine.render("Summarize: {{ input }}", &ctx)?;
    /// assert_eq!(prompt, "Summarize: the report");
    /// ```
    pub fn render(&self, template: &str, ctx: &PromptContext) -> Result<String, TemplateError> {
        let tmpl = self
            .env
            .template_from_str(template)
            .map_err(convert_syntax_error)?;

        tmpl.render(ctx).map_err(|e| {
            if e.kind() == ErrorKind::UndefinedError {
                if let Some(name) = unknown_variables(&tmpl.undeclared_variables(false)).first() {
                    return TemplateError::undefined_variable(name.clone(), &PromptContext::VARIABLES);
                }
            }
            TemplateError::render(e.to_string())
        })
    }

    /// Whether the template reads the upstream context (`input` or `inputs`)
    pub fn references_context(&self, template: &str) -> Result<bool, TemplateError> {
        let tmpl = self
            .env
            .template_from_str(template)
            .map_err(convert_syntax_error)?;
        let referenced = tmpl.undeclared_variables(false);

        Ok(PromptContext::CONTEXT_VARIABLES
            .iter()
            .any(|name| referenced.contains(*name)))
    }

    /// Why a prompt is sent as literal text, or `None` when it renders as a template
    ///
    /// A prompt is literal when it does not parse or when it names anything
    /// outside [`PromptContext::VARIABLES`].
    pub fn literal_reason(&self, prompt: &str) -> Option<TemplateError> {
        let tmpl = match self.env.template_from_str(prompt) {
            Ok(tmpl) => tmpl,
            Err(e) => return Some(convert_syntax_error(e)),
        };
        unknown_variables(&tmpl.undeclared_variables(false))
            .into_iter()
            .next()
            .map(|name| TemplateError::undefined_variable(name, &PromptContext::VARIABLES))
    }

    /// Render an AIModel prompt, passing literal prompts through unchanged
    ///
    /// ```ignore
    /// let engine = TemplateEngine::new();
    /// let ctx = PromptContext::from_texts(vec!["the report".into()]);
    ///
    /// let prompt = engine.render_prompt("Reply like {{ answer }}", &ctx)?;
    /// assert_eq!(prompt.text, "Reply like {{ answer }}");
    /// assert!(!prompt.reads_context);
    /// ```
    pub fn render_prompt(
        &self,
        prompt: &str,
        ctx: &PromptContext,
    ) -> Result<RenderedPrompt, TemplateError> {
        if let Some(reason) = self.literal_reason(prompt) {
            tracing::debug!(node_id = %ctx.node_id, reason = %reason, "Prompt sent as literal text");
            return Ok(RenderedPrompt {
                text: prompt.to_string(),
                reads_context: false,
            });
        }

        Ok(RenderedPrompt {
            text: self.render(prompt, ctx)?,
            reads_context: self.references_context(prompt)?,
        })
    }
}

/// Prompt text ready for a generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub text: String,

    /// Whether the upstream context was already rendered into `text`
    pub reads_context: bool,
}

fn convert_syntax_error(err: minijinja::Error) -> TemplateError {
    let line = err.line().unwrap_or(0);
    match err.detail() {
        Some(detail) => TemplateError::syntax(detail.to_string(), line),
        None => TemplateError::syntax(err.to_string(), line),
    }
}

/// Referenced names that are not prompt variables, sorted
fn unknown_variables(referenced: &HashSet<String>) -> Vec<String> {
    let mut unknown: Vec<String> = referenced
        .iter()
        .filter(|name| !PromptContext::VARIABLES.contains(&name.as_str()))
        .cloned()
        .collect();
    unknown.sort();
    unknown
}
