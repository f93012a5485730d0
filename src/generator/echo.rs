//! Offline generator that answers with its own prompt

use super::types::{GenerationRequest, Generation, GeneratorError, TextGenerator};
use async_trait::async_trait;

/// Generator that returns the prompt unchanged
///
/// Useful for dry runs and for checking how prompts are assembled without
/// a model behind them.
#[derive(Debug, Clone)]
pub struct EchoGenerator {
    name: String,
}

impl EchoGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for EchoGenerator {
    fn default() -> Self {
        Self::new("echo")
    }
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
        Ok(Generation::new(request.prompt.clone()).with_model(request.model.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_prompt() {
        let generator = EchoGenerator::default();
        let request = GenerationRequest::new("Summarize: the cat sat", "gpt-4", 0.5);

        let generation = generator.generate(&request).await.unwrap();
        assert_eq!(generation.text, "Summarize: the cat sat");
        assert_eq!(generation.model, Some("gpt-4".into()));
        assert_eq!(generation.approx_tokens, 6);
        assert_eq!(generator.name(), "echo");
        assert!(generator.is_available().await);
    }
}
