//! Core types and traits for text generation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error types that can occur while generating text
#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    /// Request timed out
    #[error("timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Rate limited by the provider
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit { retry_after: Option<Duration> },

    /// Authentication failed
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Network error
    #[error("network error: {message}")]
    Network { message: String },

    /// Failed to parse response
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Command execution failed
    #[error("execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// Generator unavailable
    #[error("generator unavailable: {message}")]
    Unavailable { message: String },

    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl GeneratorError {
    /// Create a timeout error
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    /// Create a rate limit error
    pub fn rate_limit(retry_after: Option<Duration>) -> Self {
        Self::RateLimit { retry_after }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an execution failed error
    pub fn execution_failed(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        Self::ExecutionFailed {
            exit_code,
            stdout,
            stderr,
        }
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Token usage reported by a provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Request sent to a generator
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// The full prompt, upstream context included
    pub prompt: String,

    /// Model to generate with
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,

    /// System prompt (if supported)
    pub system_prompt: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature,
            max_tokens: None,
            system_prompt: None,
        }
    }

    /// Set the token limit
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Text produced by a generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// Generated text
    pub text: String,

    /// Approximate number of tokens consumed
    pub approx_tokens: u32,

    /// Model the provider actually used (if reported)
    pub model: Option<String>,

    /// Exact usage (if reported)
    pub usage: Option<TokenUsage>,
}

impl Generation {
    /// Create a generation whose token count is estimated from the text
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let approx_tokens = estimate_tokens(&text);
        Self {
            text,
            approx_tokens,
            model: None,
            usage: None,
        }
    }

    /// Add model info
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add usage info; a reported total replaces the estimate
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        if let Some(total) = usage.total_tokens {
            self.approx_tokens = total;
        }
        self.usage = Some(usage);
        self
    }
}

/// Rough token estimate: 1.3 tokens per whitespace-separated word
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count() as f64;
    (words * 1.3).ceil() as u32
}

/// Trait for text generators
///
/// This is the only capability the engine depends on. Implementations signal
/// failure through `GeneratorError`; they must not panic.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a request
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError>;

    /// Get the generator name
    fn name(&self) -> &str;

    /// Check if this generator is reachable
    async fn is_available(&self) -> bool {
        true
    }
}

/// Implement TextGenerator for Box<dyn TextGenerator>
#[async_trait]
impl TextGenerator for Box<dyn TextGenerator> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }
}

/// Shared generators (one instance serving every AIModel node)
#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
        (**self).generate(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }
}
