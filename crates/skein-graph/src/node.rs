use std::future::Future;

use futures::future::BoxFuture;

use skein_core::error::Result;

use crate::state::State;

/// A pipeline step.
///
/// Handlers read the running state and return a partial update to merge.
/// They hold no per-invocation state; anything they need across calls
/// (a completion boundary, a notifier) is injected at construction.
pub trait NodeHandler<S: State>: Send + Sync + 'static {
    fn call<'a>(&'a self, state: &'a S) -> BoxFuture<'a, Result<S::Update>>;
}

/// Handler backed by a synchronous closure.
pub struct FnNode<F>(F);

impl<S, F> NodeHandler<S> for FnNode<F>
where
    S: State,
    F: Fn(&S) -> Result<S::Update> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, state: &'a S) -> BoxFuture<'a, Result<S::Update>> {
        Box::pin(futures::future::ready((self.0)(state)))
    }
}

/// Wrap a synchronous closure as a node handler.
pub fn node_fn<S, F>(f: F) -> FnNode<F>
where
    S: State,
    F: Fn(&S) -> Result<S::Update> + Send + Sync + 'static,
{
    FnNode(f)
}

/// Handler backed by an async closure over a snapshot of the state.
pub struct AsyncFnNode<F>(F);

impl<S, F, Fut> NodeHandler<S> for AsyncFnNode<F>
where
    S: State + Clone,
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S::Update>> + Send + 'static,
{
    fn call<'a>(&'a self, state: &'a S) -> BoxFuture<'a, Result<S::Update>> {
        Box::pin((self.0)(state.clone()))
    }
}

/// Wrap an async closure as a node handler. The closure receives a clone
/// of the running state, so the returned future may outlive the borrow.
pub fn node_async<S, F, Fut>(f: F) -> AsyncFnNode<F>
where
    S: State + Clone,
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S::Update>> + Send + 'static,
{
    AsyncFnNode(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PipelineState;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_node_returns_update() {
        let node = node_fn(|s: &PipelineState| {
            let n = s.get("n").and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(PipelineState::new().with("n", json!(n + 1)))
        });
        let state = PipelineState::new().with("n", json!(41));
        let update = node.call(&state).await.unwrap();
        assert_eq!(update.get("n"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_async_node_sees_snapshot() {
        let node = node_async(|s: PipelineState| async move {
            tokio::task::yield_now().await;
            let subject = s.get_str("subject").unwrap_or_default().to_uppercase();
            Ok(PipelineState::new().with("subject", json!(subject)))
        });
        let state = PipelineState::new().with("subject", json!("hello"));
        let update = node.call(&state).await.unwrap();
        assert_eq!(update.get_str("subject"), Some("HELLO"));
        assert_eq!(state.get_str("subject"), Some("hello"));
    }
}
