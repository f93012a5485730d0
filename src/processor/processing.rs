//! Processing nodes: per-input text statistics

use super::{NodeProcessor, ProcessContext, ProcessorError, timestamp};
use crate::config::Node;
use async_trait::async_trait;
use serde_json::{Value, json};

const DEFAULT_PROCESSING_TYPE: &str = "text_analysis";

/// Handles `processing` and `advancedProcessing` nodes
///
/// For every dependency that produced text, records its word and character
/// counts. Dependencies without text are left out.
pub struct TextAnalysisProcessor;

#[async_trait]
impl NodeProcessor for TextAnalysisProcessor {
    async fn process(&self, node: &Node, ctx: &ProcessContext<'_>) -> Result<Value, ProcessorError> {
        let texts = ctx.inputs.texts();

        let processed: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "original_text": text,
                    "word_count": text.split_whitespace().count(),
                    "character_count": text.chars().count(),
                    "processed": true,
                })
            })
            .collect();

        let processing_type = node
            .data
            .processing_type
            .as_deref()
            .unwrap_or(DEFAULT_PROCESSING_TYPE);

        Ok(json!({
            "processed_data": processed,
            "processing_type": processing_type,
            "text": texts.join("\n"),
            "timestamp": timestamp(),
            "nodeId": node.id,
        }))
    }
}
