//! Variables visible to an AIModel prompt template

use serde::Serialize;

/// Context a prompt is rendered against
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    /// Upstream texts joined by single spaces
    pub input: String,

    /// Upstream texts, one entry per dependency that produced text
    pub inputs: Vec<String>,

    /// Model the node will generate with
    pub model: String,

    /// Sampling temperature, rounded to three decimals for display
    pub temperature: f64,

    /// Id of the node being rendered
    pub node_id: String,
}

impl PromptContext {
    /// Names a template may reference
    pub const VARIABLES: [&'static str; 5] = ["input", "inputs", "model", "temperature", "node_id"];

    /// Variables that carry upstream context
    pub const CONTEXT_VARIABLES: [&'static str; 2] = ["input", "inputs"];

    /// Build a context from upstream texts
    pub fn from_texts(inputs: Vec<String>) -> Self {
        Self {
            input: inputs.join(" "),
            inputs,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, temperature: f32) -> Self {
        self.model = model.into();
        self.temperature = (f64::from(temperature) * 1000.0).round() / 1000.0;
        self
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_texts_joins_with_spaces() {
        let ctx = PromptContext::from_texts(vec!["first".into(), "second".into()])
            .with_model("gpt-4", 0.2)
            .with_node_id("ai1");

        assert_eq!(ctx.input, "first second");
        assert_eq!(ctx.inputs.len(), 2);
        assert_eq!(ctx.model, "gpt-4");
        assert_eq!(ctx.temperature, 0.2);
        assert_eq!(ctx.node_id, "ai1");
    }

    #[test]
    fn test_empty_context() {
        let ctx = PromptContext::from_texts(Vec::new());
        assert_eq!(ctx.input, "");
        assert!(ctx.inputs.is_empty());
    }
}
