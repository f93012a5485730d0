//! HTTP API-based generator (OpenAI-compatible)

use super::types::{GenerationRequest, Generation, GeneratorError, TextGenerator, TokenUsage};
use crate::config::GeneratorConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Generator for OpenAI-compatible chat completion APIs
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    /// Generator name
    name: String,

    /// Base URL for the API
    base_url: String,

    /// API key (if required)
    api_key: Option<String>,

    /// System prompt sent with every request
    system_prompt: Option<String>,

    /// Request timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl HttpGenerator {
    /// Create a new HTTP generator from config
    pub fn from_config(
        name: impl Into<String>,
        config: &GeneratorConfig,
    ) -> Result<Self, GeneratorError> {
        let generator = Self::new(name, config.command.clone())?
            .with_timeout(Duration::from_secs(config.timeout));

        let generator = match config.resolved_api_key() {
            Some(key) => generator.with_api_key(key),
            None => generator,
        };

        Ok(match config.system_prompt {
            Some(ref prompt) => generator.with_system_prompt(prompt.clone()),
            None => generator,
        })
    }

    /// Create a new HTTP generator with explicit parameters
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GeneratorError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: None,
            system_prompt: None,
            timeout: Duration::from_secs(300),
            client,
        })
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the chat completion URL
    fn chat_completion_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn build_body(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        let mut messages = Vec::new();

        if let Some(system) = request.system_prompt.as_ref().or(self.system_prompt.as_ref()) {
            messages.push(Message {
                role: "system".into(),
                content: system.clone(),
            });
        }

        messages.push(Message {
            role: "user".into(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    /// Map HTTP status to GeneratorError
    fn map_http_error(&self, status: reqwest::StatusCode, body: &str) -> GeneratorError {
        match status.as_u16() {
            401 | 403 => GeneratorError::auth(format!("HTTP {}: {}", status, body)),
            429 => GeneratorError::rate_limit(self.parse_retry_after(body)),
            408 | 504 => GeneratorError::timeout(self.timeout),
            400..=499 => GeneratorError::config(format!("HTTP {}: {}", status, body)),
            500..=599 => GeneratorError::network(format!("HTTP {}: {}", status, body)),
            _ => GeneratorError::network(format!("unexpected HTTP {}: {}", status, body)),
        }
    }

    /// Try to parse retry-after from error response
    fn parse_retry_after(&self, body: &str) -> Option<Duration> {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| json.get("retry_after").and_then(|v| v.as_f64()))
            .map(Duration::from_secs_f64)
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
        let start = Instant::now();
        let body = self.build_body(request);

        let mut http_request = self.client.post(self.chat_completion_url()).json(&body);
        if let Some(ref key) = self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        tracing::debug!(
            generator = %self.name,
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Sending chat completion request"
        );

        let result = tokio::time::timeout(self.timeout, http_request.send()).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(response)) => {
                let status = response.status();

                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(self.map_http_error(status, &body));
                }

                let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
                    GeneratorError::parse(format!("failed to parse response: {}", e))
                })?;

                let text = completion
                    .choices
                    .first()
                    .and_then(|c| c.message.content.clone())
                    .ok_or_else(|| GeneratorError::parse("response contained no message content"))?;

                let mut generation = Generation::new(text);
                if let Some(model) = completion.model {
                    generation = generation.with_model(model);
                }
                if let Some(usage) = completion.usage {
                    generation = generation.with_usage(TokenUsage {
                        prompt_tokens: usage.prompt_tokens,
                        completion_tokens: usage.completion_tokens,
                        total_tokens: usage.total_tokens,
                    });
                }

                Ok(generation)
            }
            Ok(Err(e)) => {
                if e.is_timeout() {
                    Err(GeneratorError::timeout(elapsed))
                } else if e.is_connect() {
                    Err(GeneratorError::network(format!("connection failed: {}", e)))
                } else {
                    Err(GeneratorError::network(format!("request failed: {}", e)))
                }
            }
            Err(_) => Err(GeneratorError::timeout(elapsed)),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        // Most compatible APIs expose a models listing we can ping
        let url = format!("{}/models", self.base_url.trim_end_matches('/'));

        let mut request = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        match tokio::time::timeout(Duration::from_secs(5), request.send()).await {
            Ok(Ok(response)) => response.status().is_success(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_generator_builder() {
        let generator = HttpGenerator::new("openai", "https://api.openai.com/v1")
            .unwrap()
            .with_api_key("sk-test")
            .with_timeout(Duration::from_secs(60));

        assert_eq!(generator.name(), "openai");
        assert_eq!(generator.base_url, "https://api.openai.com/v1");
        assert_eq!(generator.api_key, Some("sk-test".into()));
        assert_eq!(generator.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_chat_completion_url() {
        let generator = HttpGenerator::new("test", "https://api.example.com/v1").unwrap();
        assert_eq!(
            generator.chat_completion_url(),
            "https://api.example.com/v1/chat/completions"
        );

        // With trailing slash
        let generator = HttpGenerator::new("test", "https://api.example.com/v1/").unwrap();
        assert_eq!(
            generator.chat_completion_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_body_carries_node_settings() {
        let generator = HttpGenerator::new("test", "https://api.example.com/v1")
            .unwrap()
            .with_system_prompt("default system");
        let request = GenerationRequest::new("hello", "gpt-4", 0.3).with_max_tokens(50);

        let body = serde_json::to_value(generator.build_body(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 50);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "default system");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_request_system_prompt_overrides_default() {
        let generator = HttpGenerator::new("test", "https://api.example.com/v1")
            .unwrap()
            .with_system_prompt("default system");
        let request = GenerationRequest::new("hi", "m", 0.7).with_system_prompt("node system");

        let body = serde_json::to_value(generator.build_body(&request)).unwrap();
        assert_eq!(body["messages"][0]["content"], "node system");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_map_http_error() {
        let generator = HttpGenerator::new("test", "https://example.com").unwrap();

        let err = generator.map_http_error(reqwest::StatusCode::UNAUTHORIZED, "bad token");
        assert!(matches!(err, GeneratorError::Auth { .. }));

        let err = generator.map_http_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"retry_after": 2.5}"#,
        );
        assert!(matches!(
            err,
            GeneratorError::RateLimit {
                retry_after: Some(d)
            } if d == Duration::from_millis(2500)
        ));

        let err = generator.map_http_error(reqwest::StatusCode::GATEWAY_TIMEOUT, "");
        assert!(matches!(err, GeneratorError::Timeout { .. }));

        let err = generator.map_http_error(reqwest::StatusCode::BAD_REQUEST, "bad model");
        assert!(matches!(err, GeneratorError::Config { .. }));

        let err = generator.map_http_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "error");
        assert!(matches!(err, GeneratorError::Network { .. }));
    }

    #[test]
    fn test_from_config() {
        let config = GeneratorConfig {
            command: "https://api.openai.com/v1".into(),
            api_key: Some("sk-test".into()),
            system_prompt: Some("be terse".into()),
            timeout: 120,
            ..Default::default()
        };

        let generator = HttpGenerator::from_config("openai", &config).unwrap();
        assert_eq!(generator.name(), "openai");
        assert_eq!(generator.base_url, "https://api.openai.com/v1");
        assert_eq!(generator.api_key, Some("sk-test".into()));
        assert_eq!(generator.system_prompt, Some("be terse".into()));
        assert_eq!(generator.timeout, Duration::from_secs(120));
    }
}
