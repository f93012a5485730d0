//! Input nodes: static content or the run's input payload

use super::{NodeProcessor, ProcessContext, ProcessorError, timestamp};
use crate::config::Node;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Emits `{text, timestamp, nodeId}`
///
/// `text` is the node's `content`. A node without content (or with empty
/// content) reads the run input instead: its `text` field, the string itself,
/// or the JSON rendering of anything else.
pub struct InputProcessor;

fn run_input_text(input: &Value) -> String {
    match input {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("text") {
            Some(Value::String(s)) => s.clone(),
            _ => input.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl NodeProcessor for InputProcessor {
    async fn process(&self, node: &Node, ctx: &ProcessContext<'_>) -> Result<Value, ProcessorError> {
        let text = match node.data.content.as_deref() {
            Some(content) if !content.is_empty() => content.to_string(),
            _ => ctx.run_input.map(run_input_text).unwrap_or_default(),
        };

        Ok(json!({
            "text": text,
            "timestamp": timestamp(),
            "nodeId": node.id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeData;

    fn node(content: Option<&str>) -> Node {
        Node::new("in1", "input").with_data(NodeData {
            content: content.map(String::from),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_static_content() {
        let payload = InputProcessor
            .process(&node(Some("Hello world")), &ProcessContext::default())
            .await
            .unwrap();

        assert_eq!(payload["text"], "Hello world");
        assert_eq!(payload["nodeId"], "in1");
        assert!(payload["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_no_content_no_input_is_empty() {
        let payload = InputProcessor
            .process(&node(None), &ProcessContext::default())
            .await
            .unwrap();
        assert_eq!(payload["text"], "");
    }

    #[tokio::test]
    async fn test_content_wins_over_run_input() {
        let input = json!("from the caller");
        let ctx = ProcessContext::new(Default::default(), Some(&input));

        let payload = InputProcessor.process(&node(Some("static")), &ctx).await.unwrap();
        assert_eq!(payload["text"], "static");
    }

    #[tokio::test]
    async fn test_run_input_shapes() {
        let cases = [
            (json!("plain string"), "plain string"),
            (json!({"text": "text field"}), "text field"),
            (json!({"topic": "rust"}), r#"{"topic":"rust"}"#),
            (json!(42), "42"),
            (json!(null), ""),
        ];

        for (input, expected) in cases {
            let ctx = ProcessContext::new(Default::default(), Some(&input));
            let payload = InputProcessor.process(&node(Some("")), &ctx).await.unwrap();
            assert_eq!(payload["text"], expected, "input {}", input);
        }
    }
}
