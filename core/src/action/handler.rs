use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::types::ValueMap;

/// Context handed to an action implementation for one invocation.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub run_id: String,
    pub action: String,
    /// Parallel group index; `None` for a standalone execution.
    pub group: Option<usize>,
    /// Read-only view of the outputs committed by earlier groups.
    pub upstream: Arc<ValueMap>,
}

impl ActionContext {
    pub fn standalone(run_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            action: action.into(),
            group: None,
            upstream: Arc::new(ValueMap::new()),
        }
    }

    pub fn upstream_value(&self, key: &str) -> Option<&Value> {
        self.upstream.get(key)
    }
}

/// Implementation of an action: inputs in, outputs or an error out.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(&self, ctx: ActionContext, inputs: ValueMap) -> anyhow::Result<ValueMap>;
}

/// Adapter turning an async closure into an [`ActionHandler`].
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ActionHandler for FnHandler<F>
where
    F: Fn(ActionContext, ValueMap) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ValueMap>> + Send,
{
    async fn run(&self, ctx: ActionContext, inputs: ValueMap) -> anyhow::Result<ValueMap> {
        (self.f)(ctx, inputs).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ActionHandler>
where
    F: Fn(ActionContext, ValueMap) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ValueMap>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}
