//! Text generation capability
//!
//! The engine only sees [`TextGenerator`]. Concrete generators talk to an
//! OpenAI-compatible HTTP API, run a local command, or echo the prompt back.
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::generator::{GenerationRequest, HttpGenerator, TextGenerator};
//!
//! let generator = HttpGenerator::new("openai", "https://api.openai.com/v1")?
//!     .with_api_key(key);
//!
//! let request = GenerationRequest::new("Write a haiku", "gpt-4", 0.7);
//! let generation = generator.generate(&request).await?;
//!
//! println!("{} (~{} tokens)", generation.text, generation.approx_tokens);
//! ```

mod command_generator;
mod echo;
mod http_generator;
mod timeout;
mod types;

pub use command_generator::CommandGenerator;
pub use echo::EchoGenerator;
pub use http_generator::HttpGenerator;
pub use timeout::{TimeoutGenerator, with_timeout};
pub use types::{
    Generation, GenerationRequest, GeneratorError, TextGenerator, TokenUsage, estimate_tokens,
};

use crate::config::GeneratorConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create the generator a config entry describes, bounded by its timeout
pub fn create_generator(
    name: &str,
    config: &GeneratorConfig,
) -> Result<Arc<dyn TextGenerator>, GeneratorError> {
    if !config.enabled {
        return Err(GeneratorError::config(format!(
            "generator '{}' is disabled",
            name
        )));
    }

    let deadline = Duration::from_secs(config.timeout);
    let generator: Arc<dyn TextGenerator> = if config.is_echo() {
        Arc::new(with_timeout(EchoGenerator::new(name), deadline))
    } else if config.is_http() {
        Arc::new(with_timeout(HttpGenerator::from_config(name, config)?, deadline))
    } else {
        Arc::new(with_timeout(CommandGenerator::from_config(name, config), deadline))
    };

    tracing::debug!(generator = %name, kind = config.kind(), "Created generator");
    Ok(generator)
}
