//! Generator configuration for text-generation providers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for a single text generator
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Command to execute, HTTP base URL for API providers, or `echo`
    pub command: String,

    /// Arguments to pass to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Whether this generator is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Timeout in seconds for a single generation
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Model used when a node does not name one
    pub model: Option<String>,

    /// API key (HTTP providers)
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// System prompt sent with every request
    pub system_prompt: Option<String>,

    /// Additional environment variables for the command
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            enabled: true,
            timeout: default_timeout(),
            model: None,
            api_key: None,
            api_key_env: None,
            system_prompt: None,
            env: HashMap::new(),
        }
    }
}

impl GeneratorConfig {
    /// Returns true if this is an HTTP API generator (URL starts with http)
    pub fn is_http(&self) -> bool {
        self.command.starts_with("http://") || self.command.starts_with("https://")
    }

    /// Returns true for the built-in offline echo generator
    pub fn is_echo(&self) -> bool {
        self.command == "echo" && self.args.is_empty()
    }

    /// Returns true if this generator runs a local command
    pub fn is_command(&self) -> bool {
        !self.is_http() && !self.is_echo()
    }

    /// Resolve the API key, preferring the literal value over the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_ref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.is_empty())
        })
    }

    /// Short label for listings
    pub fn kind(&self) -> &'static str {
        if self.is_http() {
            "http"
        } else if self.is_echo() {
            "echo"
        } else {
            "command"
        }
    }
}
