//! Local command generator: prompt on stdin, completion on stdout

use super::types::{GenerationRequest, Generation, GeneratorError, TextGenerator};
use crate::config::GeneratorConfig;
use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("ANSI escape pattern is valid")
});

/// Generator backed by a local command (ollama, llama.cpp, a CLI client, ...)
///
/// The prompt is written to the command's stdin. The node's model and
/// temperature are exported as `NODEFLOW_MODEL` and `NODEFLOW_TEMPERATURE`.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    /// Generator name
    name: String,

    /// Command to execute
    command: String,

    /// Default arguments
    args: Vec<String>,

    /// Default timeout
    timeout: Duration,

    /// Environment variables to set
    env: Vec<(String, String)>,
}

impl CommandGenerator {
    /// Create a new command generator from config
    pub fn from_config(name: impl Into<String>, config: &GeneratorConfig) -> Self {
        let mut env: Vec<_> = config
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.sort();

        Self {
            name: name.into(),
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout),
            env,
        }
    }

    /// Create a new command generator with explicit parameters
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(300),
            env: Vec::new(),
        }
    }

    /// Add default arguments
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the command with arguments
    fn build_command(&self, request: &GenerationRequest) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.env("NODEFLOW_MODEL", &request.model);
        cmd.env("NODEFLOW_TEMPERATURE", request.temperature.to_string());
        if let Some(max_tokens) = request.max_tokens {
            cmd.env("NODEFLOW_MAX_TOKENS", max_tokens.to_string());
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        cmd
    }
}

/// Remove terminal color codes and surrounding whitespace
fn clean_output(raw: &str) -> String {
    ANSI_ESCAPE.replace_all(raw, "").trim().to_string()
}

#[async_trait]
impl TextGenerator for CommandGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
        let start = Instant::now();

        let mut child = self.build_command(request).spawn().map_err(|e| {
            GeneratorError::unavailable(format!("failed to spawn '{}': {}", self.command, e))
        })?;

        tracing::debug!(
            generator = %self.name,
            command = %self.command,
            prompt_len = request.prompt.len(),
            "Spawned generator command"
        );

        let prompt = request.prompt.clone();
        let stdin = child.stdin.take();

        let result = tokio::time::timeout(self.timeout, async move {
            if let Some(mut stdin) = stdin {
                // A command that ignores stdin may close it early; that is not an error
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    tracing::debug!(error = %e, "Generator command closed stdin early");
                }
                drop(stdin);
            }
            child.wait_with_output().await
        })
        .await;

        match result {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

                if output.status.success() {
                    Ok(Generation::new(clean_output(&stdout)).with_model(request.model.clone()))
                } else {
                    Err(GeneratorError::execution_failed(
                        output.status.code(),
                        stdout,
                        clean_output(&stderr),
                    ))
                }
            }
            Ok(Err(e)) => Err(GeneratorError::unavailable(format!(
                "failed to wait for '{}': {}",
                self.command, e
            ))),
            // The child is dropped with the future and killed
            Err(_) => Err(GeneratorError::timeout(start.elapsed())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new("which")
            .arg(&self.command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}
