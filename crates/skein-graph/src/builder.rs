use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use skein_core::error::{Result, SkeinError};

use crate::edge::{Edge, RouteFn, RouteLabel, END};
use crate::executor::{Pipeline, DEFAULT_MAX_STEPS};
use crate::node::NodeHandler;
use crate::state::State;

/// Collects nodes and edges, then validates them into a `Pipeline`.
///
/// Registration never fails on its own; every problem is reported by
/// `build`.
pub struct PipelineBuilder<S: State> {
    nodes: Vec<(String, Arc<dyn NodeHandler<S>>)>,
    edges: Vec<(String, Edge<S>)>,
    entry: Option<String>,
    max_steps: usize,
    problems: Vec<String>,
}

impl<S: State> PipelineBuilder<S> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            entry: None,
            max_steps: DEFAULT_MAX_STEPS,
            problems: Vec::new(),
        }
    }

    /// Register a named node.
    pub fn add_node(mut self, name: impl Into<String>, handler: impl NodeHandler<S>) -> Self {
        let handler: Arc<dyn NodeHandler<S>> = Arc::new(handler);
        self.nodes.push((name.into(), handler));
        self
    }

    /// Register an unconditional edge. `to` may be `END`.
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), Edge::Direct { to: to.into() }));
        self
    }

    /// Register a conditional dispatch table for `from`.
    ///
    /// After `from` runs, `route` is called with the merged state and the
    /// returned label selects the next node from `table`.
    pub fn add_conditional_edges<L, R, I, T>(
        mut self,
        from: impl Into<String>,
        route: R,
        table: I,
    ) -> Self
    where
        L: RouteLabel,
        R: Fn(&S) -> L + Send + Sync + 'static,
        I: IntoIterator<Item = (L, T)>,
        T: Into<String>,
    {
        let from = from.into();
        let table: HashMap<String, String> = table
            .into_iter()
            .map(|(label, to)| (label.to_string(), to.into()))
            .collect();

        if let Some(variants) = L::variants() {
            let mut missing: Vec<String> = variants
                .iter()
                .map(|v| v.to_string())
                .filter(|label| !table.contains_key(label))
                .collect();
            if !missing.is_empty() {
                missing.sort();
                self.problems.push(format!(
                    "node '{}' has no target for route label(s): {}",
                    from,
                    missing.join(", ")
                ));
            }
        }

        let route: RouteFn<S> = Arc::new(move |state: &S| route(state).to_string());
        self.edges.push((from, Edge::Conditional { route, table }));
        self
    }

    /// Designate the node every invocation starts from.
    pub fn set_entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Bound the number of handler runs per invocation.
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    /// Validate the topology and freeze it.
    pub fn build(self) -> Result<Pipeline<S>> {
        let mut problems = self.problems;

        let mut names: Vec<String> = Vec::with_capacity(self.nodes.len());
        let mut handlers = HashMap::with_capacity(self.nodes.len());
        for (name, handler) in self.nodes {
            if name == END {
                problems.push(format!("node name '{}' is reserved", END));
                continue;
            }
            if handlers.insert(name.clone(), handler).is_some() {
                problems.push(format!("duplicate node '{}'", name));
                continue;
            }
            names.push(name);
        }

        let mut edges = HashMap::with_capacity(self.edges.len());
        let mut seen_from = HashSet::new();
        for (from, edge) in self.edges {
            if !handlers.contains_key(&from) {
                problems.push(format!("edge from unknown node '{}'", from));
                continue;
            }
            for target in edge.targets() {
                if target != END && !handlers.contains_key(target) {
                    problems.push(format!(
                        "edge from '{}' targets unknown node '{}'",
                        from, target
                    ));
                }
            }
            if !seen_from.insert(from.clone()) {
                problems.push(format!("node '{}' has more than one outgoing edge set", from));
                continue;
            }
            edges.insert(from, edge);
        }

        let entry = match self.entry {
            Some(entry) if handlers.contains_key(&entry) => entry,
            Some(entry) => {
                problems.push(format!("entry node '{}' is not registered", entry));
                entry
            }
            None => {
                problems.push("no entry node set".to_string());
                String::new()
            }
        };

        if self.max_steps == 0 {
            problems.push("max_steps must be at least 1".to_string());
        }

        if !problems.is_empty() {
            return Err(SkeinError::InvalidPipeline(problems.join("; ")));
        }

        Ok(Pipeline::from_parts(
            handlers,
            names,
            edges,
            entry,
            self.max_steps,
        ))
    }
}

impl<S: State> Default for PipelineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;
    use crate::node::node_fn;
    use crate::state::PipelineState;

    #[derive(Clone, Copy, PartialEq)]
    enum Verdict {
        Accept,
        Reject,
    }

    impl fmt::Display for Verdict {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Verdict::Accept => write!(f, "accept"),
                Verdict::Reject => write!(f, "reject"),
            }
        }
    }

    impl RouteLabel for Verdict {
        fn variants() -> Option<Vec<Self>> {
            Some(vec![Verdict::Accept, Verdict::Reject])
        }
    }

    fn noop() -> impl NodeHandler<PipelineState> {
        node_fn(|_: &PipelineState| Ok(PipelineState::new()))
    }

    fn invalid_message(result: Result<Pipeline<PipelineState>>) -> String {
        match result {
            Err(SkeinError::InvalidPipeline(msg)) => msg,
            Err(other) => panic!("expected InvalidPipeline, got {:?}", other),
            Ok(_) => panic!("expected InvalidPipeline, got a pipeline"),
        }
    }

    #[test]
    fn test_valid_pipeline_builds() {
        let pipeline = PipelineBuilder::new()
            .add_node("a", noop())
            .add_node("b", noop())
            .add_edge("a", "b")
            .add_edge("b", END)
            .set_entry("a")
            .max_steps(10)
            .build()
            .unwrap();
        assert_eq!(pipeline.entry(), "a");
        assert_eq!(pipeline.node_names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(pipeline.max_steps(), 10);
        assert!(!pipeline.is_terminal("a"));
        assert!(pipeline.is_terminal("b"));
    }

    #[test]
    fn test_missing_entry() {
        let msg = invalid_message(PipelineBuilder::new().add_node("a", noop()).build());
        assert!(msg.contains("no entry node"));
    }

    #[test]
    fn test_unknown_entry() {
        let msg = invalid_message(
            PipelineBuilder::new()
                .add_node("a", noop())
                .set_entry("start")
                .build(),
        );
        assert!(msg.contains("entry node 'start'"));
    }

    #[test]
    fn test_duplicate_and_reserved_names() {
        let msg = invalid_message(
            PipelineBuilder::new()
                .add_node("a", noop())
                .add_node("a", noop())
                .add_node(END, noop())
                .set_entry("a")
                .build(),
        );
        assert!(msg.contains("duplicate node 'a'"));
        assert!(msg.contains("reserved"));
    }

    #[test]
    fn test_edges_to_and_from_unknown_nodes() {
        let msg = invalid_message(
            PipelineBuilder::new()
                .add_node("a", noop())
                .add_edge("a", "ghost")
                .add_edge("phantom", "a")
                .set_entry("a")
                .build(),
        );
        assert!(msg.contains("targets unknown node 'ghost'"));
        assert!(msg.contains("edge from unknown node 'phantom'"));
    }

    #[test]
    fn test_two_outgoing_edge_sets() {
        let msg = invalid_message(
            PipelineBuilder::new()
                .add_node("a", noop())
                .add_node("b", noop())
                .add_node("c", noop())
                .add_edge("a", "b")
                .add_edge("a", "c")
                .set_entry("a")
                .build(),
        );
        assert!(msg.contains("more than one outgoing edge set"));
    }

    #[test]
    fn test_incomplete_enum_routing_detected_at_build() {
        let msg = invalid_message(
            PipelineBuilder::new()
                .add_node("check", noop())
                .add_node("ok", noop())
                .add_conditional_edges(
                    "check",
                    |_: &PipelineState| Verdict::Accept,
                    [(Verdict::Accept, "ok")],
                )
                .set_entry("check")
                .build(),
        );
        assert!(msg.contains("no target for route label(s): reject"));
    }

    #[test]
    fn test_complete_enum_routing_builds() {
        let built = PipelineBuilder::new()
            .add_node("check", noop())
            .add_node("ok", noop())
            .add_conditional_edges(
                "check",
                |_: &PipelineState| Verdict::Reject,
                [(Verdict::Accept, "ok"), (Verdict::Reject, END)],
            )
            .set_entry("check")
            .build();
        assert!(built.is_ok());
    }

    #[test]
    fn test_zero_max_steps_rejected() {
        let msg = invalid_message(
            PipelineBuilder::new()
                .add_node("a", noop())
                .set_entry("a")
                .max_steps(0)
                .build(),
        );
        assert!(msg.contains("max_steps"));
    }
}
