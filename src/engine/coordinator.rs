//! Run coordinator: resolve, order, dispatch, finalize

use super::error::EngineError;
use super::run::{NodeResult, NodeStatus, RunStatus, WorkflowRun};
use crate::config::{Node, WorkflowDefinition};
use crate::graph::{DependencyGraph, ExecutionOrder, order, resolve};
use crate::processor::{Inputs, ProcessContext, ProcessorRegistry, Upstream};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How a failed node affects the nodes that depend on it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Dispatch every node; dependents see an absent payload for failed dependencies
    #[default]
    Continue,
    /// Mark every transitive dependent of a failed node as skipped
    SkipDownstream,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Continue => write!(f, "continue"),
            FailurePolicy::SkipDownstream => write!(f, "skip_downstream"),
        }
    }
}

/// Drives one workflow definition through a run
///
/// The coordinator holds no per-run state, so a single instance can serve
/// any number of concurrent runs.
#[derive(Debug, Clone)]
pub struct RunCoordinator {
    registry: ProcessorRegistry,
    policy: FailurePolicy,
}

impl RunCoordinator {
    pub fn new(registry: ProcessorRegistry) -> Self {
        Self {
            registry,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Resolve and order a definition without running it
    pub fn plan(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<(DependencyGraph, ExecutionOrder), EngineError> {
        let graph = resolve(definition)?;
        let order = order(&graph)?;
        Ok((graph, order))
    }

    /// Run a definition without an input payload
    pub async fn execute(&self, definition: &WorkflowDefinition) -> WorkflowRun {
        self.execute_with_input(definition, None).await
    }

    /// Run a definition; input nodes without content read `input`
    ///
    /// Never fails: structural problems and node failures both end up in the
    /// returned run's status.
    pub async fn execute_with_input(
        &self,
        definition: &WorkflowDefinition,
        input: Option<serde_json::Value>,
    ) -> WorkflowRun {
        let mut run = WorkflowRun::new(definition.id.clone(), input);

        tracing::info!(
            run_id = %run.id,
            workflow = %definition.display_name(),
            nodes = definition.nodes.len(),
            edges = definition.edges.len(),
            policy = %self.policy,
            "Starting workflow run"
        );

        if let Err(e) = self.drive(definition, &mut run).await {
            if e.is_structural() {
                tracing::warn!(run_id = %run.id, error = %e, "Workflow cannot be scheduled");
            } else {
                tracing::error!(run_id = %run.id, error = %e, "Workflow run aborted");
            }
            if let Err(state) = run.abort(e.to_string()) {
                tracing::error!(run_id = %run.id, error = %state, "Could not mark run as failed");
            }
            return run;
        }

        tracing::info!(
            run_id = %run.id,
            status = %run.status,
            completed = run.count(NodeStatus::Completed),
            failed = run.count(NodeStatus::Failed),
            skipped = run.count(NodeStatus::Skipped),
            duration_ms = run.duration().map(|d| d.as_millis() as u64).unwrap_or(0),
            "Workflow run finished"
        );
        run
    }

    async fn drive(
        &self,
        definition: &WorkflowDefinition,
        run: &mut WorkflowRun,
    ) -> Result<RunStatus, EngineError> {
        let (graph, order) = self.plan(definition)?;
        let nodes: HashMap<&str, &Node> = definition
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();

        tracing::debug!(order = ?order.as_slice(), "Execution order");
        run.start()?;

        for node_id in &order {
            let Some(node) = nodes.get(node_id.as_str()) else {
                continue;
            };
            let upstream = graph.upstream(node_id);

            let result = match self.blocking_dependency(run, &upstream) {
                Some((dep, status)) => {
                    tracing::info!(node_id = %node_id, dependency = %dep, "Skipping node");
                    NodeResult::skipped(
                        &node.id,
                        &node.node_type,
                        format!("dependency '{}' {}", dep, status),
                    )
                }
                None => {
                    let inputs = Inputs::new(
                        upstream
                            .iter()
                            .filter_map(|dep| run.result(dep))
                            .map(|r| Upstream {
                                node_id: &r.node_id,
                                status: r.status,
                                payload: r.result.as_ref(),
                            })
                            .collect(),
                    );
                    let ctx = ProcessContext::new(inputs, run.input.as_ref());

                    tracing::debug!(node_id = %node_id, node_type = %node.node_type, "Dispatching node");
                    self.registry.dispatch(node, &ctx).await
                }
            };

            tracing::debug!(
                node_id = %node_id,
                status = %result.status,
                elapsed_ms = result.execution_time.as_millis() as u64,
                "Node finished"
            );
            run.record(result)?;
        }

        Ok(run.finish()?)
    }

    /// First dependency that did not complete, when the policy skips dependents
    fn blocking_dependency(
        &self,
        run: &WorkflowRun,
        upstream: &[&str],
    ) -> Option<(String, NodeStatus)> {
        if self.policy != FailurePolicy::SkipDownstream {
            return None;
        }
        upstream
            .iter()
            .filter_map(|dep| run.result(dep))
            .find(|r| !r.is_completed())
            .map(|r| (r.node_id.clone(), r.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Edge, NodeData, node_types};
    use crate::engine::RunStatus;
    use crate::generator::{GenerationRequest, Generation, GeneratorError, TextGenerator};
    use crate::processor::{NodeProcessor, ProcessorError};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    /// Generator that fails when the prompt mentions "fail"
    struct Scripted;

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GeneratorError> {
            if request.prompt.contains("fail") {
                return Err(GeneratorError::network("connection reset"));
            }
            Ok(Generation::new(format!("echo: {}", request.prompt)))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Processor recording the order it was called in
    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NodeProcessor for Recorder {
        async fn process(&self, node: &Node, ctx: &ProcessContext<'_>) -> Result<Value, ProcessorError> {
            self.calls.lock().unwrap().push(node.id.clone());
            let seen: Vec<&str> = ctx.inputs.iter().map(|u| u.node_id).collect();
            Ok(json!({"text": node.id, "seen": seen}))
        }
    }

    fn coordinator() -> RunCoordinator {
        RunCoordinator::new(ProcessorRegistry::with_builtins(Arc::new(Scripted)))
    }

    fn input(id: &str, content: &str) -> Node {
        Node::new(id, node_types::INPUT).with_data(NodeData {
            content: Some(content.into()),
            ..Default::default()
        })
    }

    fn ai(id: &str, prompt: &str) -> Node {
        Node::new(id, node_types::AI_MODEL).with_data(NodeData {
            prompt: Some(prompt.into()),
            ..Default::default()
        })
    }

    fn text_output(id: &str) -> Node {
        Node::new(id, node_types::OUTPUT).with_data(NodeData {
            format: Some("text".into()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_results_follow_execution_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProcessorRegistry::new();
        registry.register("step", Arc::new(Recorder { calls: calls.clone() }));

        let def = WorkflowDefinition::new(
            vec![Node::new("c", "step"), Node::new("a", "step"), Node::new("b", "step")],
            vec![Edge::between("a", "b"), Edge::between("b", "c")],
        );
        let run = RunCoordinator::new(registry).execute(&def).await;

        assert_eq!(run.status, RunStatus::Completed);
        let ids: Vec<&str> = run.node_results.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(run.result("c").unwrap().result.as_ref().unwrap()["seen"], json!(["b"]));
    }

    #[tokio::test]
    async fn test_run_input_reaches_input_nodes() {
        let def = WorkflowDefinition::new(
            vec![Node::new("in", node_types::INPUT), text_output("out")],
            vec![Edge::between("in", "out")],
        );
        let run = coordinator()
            .execute_with_input(&def, Some(json!({"text": "from caller"})))
            .await;

        assert!(run.is_completed());
        assert_eq!(run.final_text(), Some("from caller"));
        assert_eq!(run.input, Some(json!({"text": "from caller"})));
    }

    #[tokio::test]
    async fn test_continue_policy_dispatches_dependents() {
        let def = WorkflowDefinition::new(
            vec![input("in", "please fail"), ai("ai", "{{ input }}"), text_output("out")],
            vec![Edge::between("in", "ai"), Edge::between("ai", "out")],
        );
        let run = coordinator().execute(&def).await;

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.node_results.len(), 3);

        let ai = run.result("ai").unwrap();
        assert_eq!(ai.status, NodeStatus::Failed);
        assert!(ai.error.as_ref().unwrap().contains("connection reset"));

        // The output node still ran, with nothing to show for the failed dependency
        let out = run.result("out").unwrap();
        assert_eq!(out.status, NodeStatus::Completed);
        assert_eq!(out.result.as_ref().unwrap()["output"], "");
    }

    #[tokio::test]
    async fn test_skip_downstream_policy() {
        let def = WorkflowDefinition::new(
            vec![
                input("bad", "fail here"),
                input("good", "fine"),
                ai("ai_bad", "{{ input }}"),
                ai("ai_good", "{{ input }}"),
                text_output("out_bad"),
                text_output("out_good"),
            ],
            vec![
                Edge::between("bad", "ai_bad"),
                Edge::between("good", "ai_good"),
                Edge::between("ai_bad", "out_bad"),
                Edge::between("ai_good", "out_good"),
            ],
        );
        let run = coordinator()
            .with_policy(FailurePolicy::SkipDownstream)
            .execute(&def)
            .await;

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.node_results.len(), 6);
        assert_eq!(run.result("ai_bad").unwrap().status, NodeStatus::Failed);

        let skipped = run.result("out_bad").unwrap();
        assert_eq!(skipped.status, NodeStatus::Skipped);
        assert_eq!(skipped.error.as_deref(), Some("dependency 'ai_bad' failed"));
        assert!(skipped.result.is_none());

        assert_eq!(run.result("out_good").unwrap().status, NodeStatus::Completed);
        assert_eq!(run.count(NodeStatus::Completed), 4);
    }

    #[tokio::test]
    async fn test_skips_cascade_transitively() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProcessorRegistry::new();
        registry.register("step", Arc::new(Recorder { calls: calls.clone() }));

        let def = WorkflowDefinition::new(
            vec![
                Node::new("a", "missing"),
                Node::new("b", "step"),
                Node::new("c", "step"),
            ],
            vec![Edge::between("a", "b"), Edge::between("b", "c")],
        );
        let run = RunCoordinator::new(registry)
            .with_policy(FailurePolicy::SkipDownstream)
            .execute(&def)
            .await;

        assert_eq!(run.result("b").unwrap().status, NodeStatus::Skipped);
        let c = run.result("c").unwrap();
        assert_eq!(c.status, NodeStatus::Skipped);
        assert_eq!(c.error.as_deref(), Some("dependency 'b' skipped"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_node_aborts() {
        let def = WorkflowDefinition::new(
            vec![input("a", "x"), input("a", "y")],
            Vec::new(),
        );
        let run = coordinator().execute(&def).await;

        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.node_results.is_empty());
        assert!(run.error_message.unwrap().contains("appears more than once"));
    }

    #[tokio::test]
    async fn test_empty_definition_completes() {
        let run = coordinator()
            .execute(&WorkflowDefinition::new(Vec::new(), Vec::new()))
            .await;

        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.node_results.is_empty());
    }

    #[test]
    fn test_plan() {
        let def = WorkflowDefinition::new(
            vec![text_output("out"), input("in", "x")],
            vec![Edge::between("in", "out")],
        );
        let (graph, order) = coordinator().plan(&def).unwrap();

        assert_eq!(order.as_slice(), ["in", "out"]);
        assert_eq!(graph.upstream("out"), vec!["in"]);
    }

    #[test]
    fn test_policy_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: FailurePolicy,
        }

        let w: Wrapper = toml::from_str(r#"policy = "skip_downstream""#).unwrap();
        assert_eq!(w.policy, FailurePolicy::SkipDownstream);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Continue);
        assert_eq!(FailurePolicy::SkipDownstream.to_string(), "skip_downstream");
    }
}
