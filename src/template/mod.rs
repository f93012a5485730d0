//! Prompt templates for AIModel nodes
//!
//! Prompts are minijinja templates rendered against a [`PromptContext`]:
//!
//! - `input`: upstream texts joined by spaces
//! - `inputs`: the upstream texts as a list
//! - `model`, `temperature`, `node_id`
//!
//! Custom filters: `json`, `word_count`, `truncate_words(n)`.
//!
//! A prompt that does not parse, or that names anything else, is sent to the
//! generator as literal text.
//!
//! # Example
//!
//! ```ignore
//! use nodeflow::template::{PromptContext, TemplateEngine};
//!
//! let engine = TemplateEngine::new();
//! let ctx = PromptContext::from_texts(vec!["Q3 numbers".into()]);
//!
//! let prompt = engine.render_prompt("Summarize in one line: {{ input }}", &ctx)?;
//! assert_eq!(prompt.text, "Summarize in one line: Q3 numbers");
//! ```

mod context;
mod engine;
mod errors;
mod filters;

pub use context::PromptContext;
pub use engine::{RenderedPrompt, TemplateEngine};
pub use errors::{TemplateError, suggest_correction};
