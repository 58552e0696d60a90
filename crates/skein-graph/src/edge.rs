use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use skein_core::error::{Result, SkeinError};

/// Terminal marker. Routing to `END` finishes the invocation.
pub const END: &str = "__end__";

/// A label returned by a routing function.
///
/// Enumerated label types should override `variants` so the builder can
/// check that every label has a dispatch target before the pipeline runs.
/// Free-form labels (strings) can only be checked when they are returned.
pub trait RouteLabel: fmt::Display + Send + Sync + 'static {
    fn variants() -> Option<Vec<Self>>
    where
        Self: Sized,
    {
        None
    }
}

impl RouteLabel for String {}
impl RouteLabel for &'static str {}

pub(crate) type RouteFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// The outgoing edge set of one node.
pub(crate) enum Edge<S> {
    Direct {
        to: String,
    },
    Conditional {
        route: RouteFn<S>,
        table: HashMap<String, String>,
    },
}

impl<S> Edge<S> {
    /// Every node this edge set can lead to.
    pub(crate) fn targets(&self) -> Vec<&str> {
        match self {
            Edge::Direct { to } => vec![to.as_str()],
            Edge::Conditional { table, .. } => table.values().map(|t| t.as_str()).collect(),
        }
    }

    /// Pick the next node for `from`, given the state after its merge.
    pub(crate) fn next(&self, from: &str, state: &S) -> Result<String> {
        match self {
            Edge::Direct { to } => Ok(to.clone()),
            Edge::Conditional { route, table } => {
                let label = route(state);
                table
                    .get(&label)
                    .cloned()
                    .ok_or_else(|| SkeinError::UnknownRouteLabel {
                        node: from.to_string(),
                        label,
                    })
            }
        }
    }
}

impl<S> fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Direct { to } => f.debug_struct("Direct").field("to", to).finish(),
            Edge::Conditional { table, .. } => {
                f.debug_struct("Conditional").field("table", table).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditional(table: &[(&str, &str)]) -> Edge<bool> {
        Edge::Conditional {
            route: Arc::new(|flag: &bool| if *flag { "yes".into() } else { "no".into() }),
            table: table
                .iter()
                .map(|(l, t)| (l.to_string(), t.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_direct_edge() {
        let edge: Edge<bool> = Edge::Direct { to: "b".into() };
        assert_eq!(edge.next("a", &true).unwrap(), "b");
        assert_eq!(edge.targets(), vec!["b"]);
    }

    #[test]
    fn test_conditional_dispatch() {
        let edge = conditional(&[("yes", "accept"), ("no", END)]);
        assert_eq!(edge.next("check", &true).unwrap(), "accept");
        assert_eq!(edge.next("check", &false).unwrap(), END);
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        let edge = conditional(&[("yes", "accept")]);
        match edge.next("check", &false) {
            Err(SkeinError::UnknownRouteLabel { node, label }) => {
                assert_eq!(node, "check");
                assert_eq!(label, "no");
            }
            other => panic!("expected UnknownRouteLabel, got {:?}", other),
        }
    }

    #[test]
    fn test_string_labels_have_no_variants() {
        assert!(String::variants().is_none());
        assert!(<&'static str>::variants().is_none());
    }
}
