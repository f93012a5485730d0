//! Output nodes: collect dependency payloads in the configured format

use super::{NodeProcessor, ProcessContext, ProcessorError, timestamp};
use crate::config::Node;
use async_trait::async_trait;
use serde_json::{Value, json};

/// Formats an output node can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Upstream payloads as a list
    Json,
    /// Upstream texts joined by newlines
    Text,
    /// Upstream payloads as a list, tagged `raw`
    Raw,
}

impl OutputFormat {
    /// Any tag other than `json` or `text` is treated as raw
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Raw,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Raw => "raw",
        }
    }
}

/// Emits `{output, format, timestamp, nodeId}` (text format also sets `text`)
///
/// The format comes from `data.format`, falling back to `data.outputType`,
/// then `json`.
pub struct OutputProcessor;

/// Text of a payload: its `text` string, else its JSON rendering
fn payload_text(payload: &Value) -> String {
    match payload.get("text") {
        Some(Value::String(s)) => s.clone(),
        _ => payload.to_string(),
    }
}

#[async_trait]
impl NodeProcessor for OutputProcessor {
    async fn process(&self, node: &Node, ctx: &ProcessContext<'_>) -> Result<Value, ProcessorError> {
        let tag = node
            .data
            .format
            .as_deref()
            .or(node.data.output_type.as_deref())
            .unwrap_or("json");
        let format = OutputFormat::from_tag(tag);
        let payloads = ctx.inputs.payloads();

        let payload = match format {
            OutputFormat::Text => {
                let text = payloads
                    .iter()
                    .flatten()
                    .map(|p| payload_text(p))
                    .collect::<Vec<_>>()
                    .join("\n");
                json!({
                    "output": text,
                    "text": text,
                    "format": format.as_str(),
                    "timestamp": timestamp(),
                    "nodeId": node.id,
                })
            }
            OutputFormat::Json | OutputFormat::Raw => json!({
                "output": serde_json::to_value(&payloads)?,
                "format": format.as_str(),
                "timestamp": timestamp(),
                "nodeId": node.id,
            }),
        };

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeData;
    use crate::engine::NodeStatus;
    use crate::processor::{Inputs, Upstream};

    fn output_node(format: Option<&str>, output_type: Option<&str>) -> Node {
        Node::new("out", "output").with_data(NodeData {
            format: format.map(String::from),
            output_type: output_type.map(String::from),
            ..Default::default()
        })
    }

    async fn run(node: Node, payloads: &[Option<Value>]) -> Value {
        let ids: Vec<String> = (0..payloads.len()).map(|i| format!("n{}", i)).collect();
        let inputs = Inputs::new(
            payloads
                .iter()
                .zip(&ids)
                .map(|(p, id)| Upstream {
                    node_id: id,
                    status: if p.is_some() { NodeStatus::Completed } else { NodeStatus::Failed },
                    payload: p.as_ref(),
                })
                .collect(),
        );
        OutputProcessor
            .process(&node, &ProcessContext::new(inputs, None))
            .await
            .unwrap()
    }

    #[test]
    fn test_format_tags() {
        assert_eq!(OutputFormat::from_tag("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_tag("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::from_tag("csv"), OutputFormat::Raw);
    }

    #[tokio::test]
    async fn test_default_is_json_list() {
        let a = json!({"text": "one"});
        let payload = run(output_node(None, None), &[Some(a.clone()), None]).await;

        assert_eq!(payload["format"], "json");
        assert_eq!(payload["output"], json!([a, null]));
        assert!(payload.get("text").is_none());
    }

    #[tokio::test]
    async fn test_text_joins_and_skips_absent() {
        let payload = run(
            output_node(Some("text"), None),
            &[
                Some(json!({"text": "first"})),
                None,
                Some(json!({"count": 2})),
                Some(json!({"text": "last"})),
            ],
        )
        .await;

        let expected = "first\n{\"count\":2}\nlast";
        assert_eq!(payload["format"], "text");
        assert_eq!(payload["output"], expected);
        assert_eq!(payload["text"], expected);
    }

    #[tokio::test]
    async fn test_output_type_fallback() {
        let payload = run(output_node(None, Some("text")), &[Some(json!({"text": "hi"}))]).await;
        assert_eq!(payload["output"], "hi");

        // format wins over outputType
        let payload = run(output_node(Some("json"), Some("text")), &[Some(json!({"text": "hi"}))]).await;
        assert_eq!(payload["format"], "json");
    }

    #[tokio::test]
    async fn test_unknown_format_is_raw() {
        let a = json!({"text": "x"});
        let payload = run(output_node(Some("markdown"), None), &[Some(a.clone())]).await;

        assert_eq!(payload["format"], "raw");
        assert_eq!(payload["output"], json!([a]));
        assert_eq!(payload["nodeId"], "out");
    }
}
