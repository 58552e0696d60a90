use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use skein_core::error::{Result, SkeinError};

use crate::builder::PipelineBuilder;
use crate::edge::{Edge, END};
use crate::node::NodeHandler;
use crate::state::State;

/// Default bound on handler runs per invocation.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// One handler run.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    /// Which node was executed.
    pub node: String,
    /// Whether its handler returned an update.
    pub succeeded: bool,
    /// Handler time in milliseconds.
    pub elapsed_ms: u64,
}

/// Outcome of one invocation.
#[derive(Debug)]
pub struct RunReport<S> {
    /// State as it stood when execution stopped. A failing node's update is
    /// never merged, so this holds exactly the merges of successful nodes.
    pub state: S,
    /// Handler runs in execution order.
    pub visited: Vec<NodeRecord>,
    /// Total execution time in milliseconds.
    pub total_elapsed_ms: u64,
    /// Why execution stopped early, if it did.
    pub error: Option<SkeinError>,
}

impl<S> RunReport<S> {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Names of the visited nodes, in order.
    pub fn path(&self) -> Vec<&str> {
        self.visited.iter().map(|r| r.node.as_str()).collect()
    }

    pub fn into_result(self) -> Result<S> {
        match self.error {
            None => Ok(self.state),
            Some(e) => Err(e),
        }
    }
}

/// A validated, immutable pipeline topology.
///
/// Built once with `PipelineBuilder`, invoked any number of times. Each
/// invocation owns its state, so a shared `&Pipeline` can serve concurrent
/// invocations without locking.
pub struct Pipeline<S: State> {
    nodes: HashMap<String, Arc<dyn NodeHandler<S>>>,
    order: Vec<String>,
    edges: HashMap<String, Edge<S>>,
    entry: String,
    max_steps: usize,
}

impl<S: State> Pipeline<S> {
    pub fn builder() -> PipelineBuilder<S> {
        PipelineBuilder::new()
    }

    pub(crate) fn from_parts(
        nodes: HashMap<String, Arc<dyn NodeHandler<S>>>,
        order: Vec<String>,
        edges: HashMap<String, Edge<S>>,
        entry: String,
        max_steps: usize,
    ) -> Self {
        Self {
            nodes,
            order,
            edges,
            entry,
            max_steps,
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Node names in registration order.
    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// A node with no outgoing edge set ends the invocation.
    pub fn is_terminal(&self, node: &str) -> bool {
        !self.edges.contains_key(node)
    }

    /// Run one invocation to completion and return the final state.
    pub async fn invoke(&self, initial: S) -> Result<S> {
        self.run(initial).await.into_result()
    }

    /// Run one invocation, keeping the trace and the state even on failure.
    pub async fn run(&self, initial: S) -> RunReport<S> {
        let start = Instant::now();
        let mut state = initial;
        let mut visited: Vec<NodeRecord> = Vec::new();
        let mut current = self.entry.clone();

        let error = loop {
            if visited.len() >= self.max_steps {
                warn!(
                    node = %current,
                    max_steps = self.max_steps,
                    "Step limit reached, stopping pipeline"
                );
                break Some(SkeinError::StepLimitExceeded(self.max_steps));
            }

            let handler = match self.nodes.get(&current) {
                Some(h) => h,
                None => {
                    break Some(SkeinError::InvalidPipeline(format!(
                        "node '{}' not found",
                        current
                    )));
                }
            };

            debug!(node = %current, step = visited.len() + 1, "Running node");
            let node_start = Instant::now();
            let result = handler.call(&state).await;
            let elapsed_ms = node_start.elapsed().as_millis() as u64;

            match result {
                Ok(update) => {
                    state.merge(update);
                    visited.push(NodeRecord {
                        node: current.clone(),
                        succeeded: true,
                        elapsed_ms,
                    });
                }
                Err(e) => {
                    error!(node = %current, error = %e, "Pipeline node failed");
                    visited.push(NodeRecord {
                        node: current.clone(),
                        succeeded: false,
                        elapsed_ms,
                    });
                    break Some(SkeinError::handler(current, e));
                }
            }

            let Some(edge) = self.edges.get(&current) else {
                debug!(node = %current, "No outgoing edge, pipeline complete");
                break None;
            };

            match edge.next(&current, &state) {
                Ok(next) if next == END => {
                    debug!(node = %current, "Reached END");
                    break None;
                }
                Ok(next) => {
                    debug!(from = %current, to = %next, "Following edge");
                    current = next;
                }
                Err(e) => {
                    error!(node = %current, error = %e, "Routing failed");
                    break Some(e);
                }
            }
        };

        let total_elapsed_ms = start.elapsed().as_millis() as u64;
        if error.is_none() {
            info!(
                steps = visited.len(),
                elapsed_ms = total_elapsed_ms,
                "Pipeline invocation complete"
            );
        }

        RunReport {
            state,
            visited,
            total_elapsed_ms,
            error,
        }
    }

    /// Like `invoke`, but stops with `Cancelled` once `cancel` fires.
    ///
    /// The pending handler future is dropped, which cancels any completion
    /// call it was awaiting. Other invocations are unaffected.
    pub async fn invoke_with_cancel(&self, initial: S, cancel: &CancellationToken) -> Result<S> {
        tokio::select! {
            result = self.invoke(initial) => result,
            _ = cancel.cancelled() => {
                warn!("Pipeline invocation cancelled");
                Err(SkeinError::Cancelled)
            }
        }
    }

    /// Run independent invocations concurrently, at most `concurrency` at a
    /// time. Results come back in input order.
    pub async fn invoke_all<I>(&self, inputs: I, concurrency: usize) -> Vec<Result<S>>
    where
        I: IntoIterator<Item = S>,
    {
        stream::iter(inputs)
            .map(|initial| self.invoke(initial))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

impl<S: State> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("entry", &self.entry)
            .field("nodes", &self.order)
            .field("edges", &self.edges)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use serde_json::json;

    use super::*;
    use crate::node::node_fn;
    use crate::state::PipelineState;

    /// Appends its own name to the `trail` array.
    fn mark(name: &'static str) -> impl NodeHandler<PipelineState> {
        node_fn(move |s: &PipelineState| {
            let mut trail = s
                .get("trail")
                .and_then(|v| v.as_array().cloned())
                .unwrap_or_default();
            trail.push(json!(name));
            Ok(PipelineState::new().with("trail", json!(trail)))
        })
    }

    fn trail(state: &PipelineState) -> Vec<String> {
        state
            .get("trail")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default()
    }

    struct Failing;

    impl NodeHandler<PipelineState> for Failing {
        fn call<'a>(&'a self, _state: &'a PipelineState) -> BoxFuture<'a, Result<PipelineState>> {
            Box::pin(async { Err(SkeinError::LlmRequest("HTTP 503: overloaded".into())) })
        }
    }

    struct Pending;

    impl NodeHandler<PipelineState> for Pending {
        fn call<'a>(&'a self, _state: &'a PipelineState) -> BoxFuture<'a, Result<PipelineState>> {
            Box::pin(futures::future::pending())
        }
    }

    fn branching() -> Pipeline<PipelineState> {
        Pipeline::builder()
            .add_node("read", mark("read"))
            .add_node("classify", mark("classify"))
            .add_node("spam", mark("spam"))
            .add_node("draft", mark("draft"))
            .add_node("notify", mark("notify"))
            .add_edge("read", "classify")
            .add_conditional_edges(
                "classify",
                |s: &PipelineState| {
                    if s.get_bool("is_spam").unwrap_or(false) {
                        "spam"
                    } else {
                        "legitimate"
                    }
                },
                [("spam", "spam"), ("legitimate", "draft")],
            )
            .add_edge("spam", END)
            .add_edge("draft", "notify")
            .set_entry("read")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_linear_execution_order() {
        let pipeline = Pipeline::builder()
            .add_node("a", mark("a"))
            .add_node("b", mark("b"))
            .add_node("c", mark("c"))
            .add_edge("a", "b")
            .add_edge("b", "c")
            .set_entry("a")
            .build()
            .unwrap();

        let report = pipeline.run(PipelineState::new()).await;
        assert!(report.succeeded());
        assert_eq!(report.path(), vec!["a", "b", "c"]);
        assert_eq!(trail(&report.state), vec!["a", "b", "c"]);
        assert!(report.visited.iter().all(|r| r.succeeded));
    }

    #[tokio::test]
    async fn test_conditional_routes_spam_branch() {
        let initial = PipelineState::new().with("is_spam", json!(true));
        let report = branching().run(initial).await;
        assert!(report.succeeded());
        assert_eq!(report.path(), vec!["read", "classify", "spam"]);
    }

    #[tokio::test]
    async fn test_conditional_routes_legitimate_branch() {
        let initial = PipelineState::new().with("is_spam", json!(false));
        let report = branching().run(initial).await;
        assert_eq!(report.path(), vec!["read", "classify", "draft", "notify"]);
    }

    #[tokio::test]
    async fn test_merge_semantics_across_nodes() {
        let pipeline = Pipeline::builder()
            .add_node("silent", node_fn(|_: &PipelineState| Ok(PipelineState::new())))
            .add_node(
                "writer",
                node_fn(|_: &PipelineState| Ok(PipelineState::new().with("x", json!("v")))),
            )
            .add_edge("silent", "writer")
            .set_entry("silent")
            .build()
            .unwrap();

        let initial = PipelineState::new()
            .with("x", json!("old"))
            .with("y", json!("kept"));
        let state = pipeline.invoke(initial).await.unwrap();
        assert_eq!(state.get_str("x"), Some("v"));
        assert_eq!(state.get_str("y"), Some("kept"));
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_route_label() {
        let pipeline = Pipeline::builder()
            .add_node("route", mark("route"))
            .add_node("next", mark("next"))
            .add_conditional_edges(
                "route",
                |_: &PipelineState| "sideways".to_string(),
                [("forward".to_string(), "next")],
            )
            .set_entry("route")
            .build()
            .unwrap();

        let report = pipeline.run(PipelineState::new()).await;
        match &report.error {
            Some(SkeinError::UnknownRouteLabel { node, label }) => {
                assert_eq!(node, "route");
                assert_eq!(label, "sideways");
            }
            other => panic!("expected UnknownRouteLabel, got {:?}", other),
        }
        // The router node itself ran and merged.
        assert_eq!(trail(&report.state), vec!["route"]);
    }

    #[tokio::test]
    async fn test_step_limit_on_cycle() {
        let pipeline = Pipeline::builder()
            .add_node("ping", mark("ping"))
            .add_node("pong", mark("pong"))
            .add_edge("ping", "pong")
            .add_edge("pong", "ping")
            .set_entry("ping")
            .max_steps(5)
            .build()
            .unwrap();

        let report = pipeline.run(PipelineState::new()).await;
        assert!(matches!(report.error, Some(SkeinError::StepLimitExceeded(5))));
        assert_eq!(report.visited.len(), 5);
        assert_eq!(trail(&report.state).len(), 5);
    }

    #[tokio::test]
    async fn test_step_limit_not_hit_at_exact_length() {
        let pipeline = Pipeline::builder()
            .add_node("a", mark("a"))
            .add_node("b", mark("b"))
            .add_edge("a", "b")
            .set_entry("a")
            .max_steps(2)
            .build()
            .unwrap();
        assert!(pipeline.invoke(PipelineState::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_handler_error_keeps_prior_merges() {
        let pipeline = Pipeline::builder()
            .add_node("first", mark("first"))
            .add_node("boom", Failing)
            .add_node("after", mark("after"))
            .add_edge("first", "boom")
            .add_edge("boom", "after")
            .set_entry("first")
            .build()
            .unwrap();

        let report = pipeline.run(PipelineState::new()).await;
        assert_eq!(trail(&report.state), vec!["first"]);
        assert_eq!(report.path(), vec!["first", "boom"]);
        assert!(!report.visited[1].succeeded);
        match report.into_result() {
            Err(SkeinError::Handler { node, source }) => {
                assert_eq!(node, "boom");
                assert!(matches!(*source, SkeinError::LlmRequest(_)));
            }
            other => panic!("expected Handler error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_same_declarations_same_behaviour() {
        let first = branching();
        let second = branching();
        for is_spam in [true, false] {
            let initial = PipelineState::new().with("is_spam", json!(is_spam));
            let a = first.run(initial.clone()).await;
            let b = second.run(initial).await;
            assert_eq!(a.path(), b.path());
            assert_eq!(a.state, b.state);
        }
    }

    #[tokio::test]
    async fn test_cancel_stops_pending_invocation() {
        let pipeline = Pipeline::builder()
            .add_node("wait", Pending)
            .set_entry("wait")
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });
        let result = pipeline.invoke_with_cancel(PipelineState::new(), &cancel).await;
        assert!(matches!(result, Err(SkeinError::Cancelled)));
    }

    #[tokio::test]
    async fn test_invoke_all_isolates_state_and_keeps_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let pipeline = Pipeline::builder()
            .add_node(
                "double",
                node_fn(move |s: &PipelineState| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let n = s.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
                    Ok(PipelineState::new().with("n", json!(n * 2)))
                }),
            )
            .set_entry("double")
            .build()
            .unwrap();

        let inputs = (1..=6).map(|n| PipelineState::new().with("n", json!(n)));
        let results = pipeline.invoke_all(inputs, 3).await;
        let values: Vec<i64> = results
            .into_iter()
            .map(|r| r.unwrap().get("n").and_then(|v| v.as_i64()).unwrap())
            .collect();
        assert_eq!(values, vec![2, 4, 6, 8, 10, 12]);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }
}
