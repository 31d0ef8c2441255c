//! High-level facade over the registry and executor.
//!
//! This is what boundary layers talk to: discovery, single execution and
//! whole call sets, with no knowledge of groups or namespaces.

use std::sync::Arc;

use crate::action::{Action, ActionCall, ActionMetadata, Category, Registry, ValueMap};
use crate::config::ExecutorConfig;
use crate::error::ActionError;
use crate::executor::{ActionResult, ExecutionResult, Executor};

#[derive(Debug, Clone)]
pub struct Operator {
    registry: Arc<Registry>,
    executor: Executor,
}

impl Operator {
    pub fn new(registry: Registry, config: ExecutorConfig) -> Self {
        let registry = Arc::new(registry);
        let executor = Executor::new(Arc::clone(&registry), config);
        Self { registry, executor }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Metadata of actions matching `query` (all of them for an empty query).
    pub fn discover_actions(&self, query: &str) -> Vec<ActionMetadata> {
        self.registry
            .search(query)
            .iter()
            .map(|a| a.metadata())
            .collect()
    }

    /// Metadata of every action, optionally restricted to one category.
    pub fn available_actions(&self, category: Option<Category>) -> Vec<ActionMetadata> {
        match category {
            Some(c) => self
                .registry
                .list_by_category(c)
                .iter()
                .map(|a| a.metadata())
                .collect(),
            None => self.registry.metadata(),
        }
    }

    pub fn get_action(&self, name: &str) -> Result<Arc<Action>, ActionError> {
        self.registry.get(name)
    }

    pub async fn execute_action(&self, name: &str, inputs: ValueMap) -> Result<ActionResult, ActionError> {
        let call = ActionCall {
            action: name.to_string(),
            inputs,
        };
        self.executor.execute_single(&call).await
    }

    pub fn validate_sequence(&self, calls: &[ActionCall]) -> Result<(), ActionError> {
        self.registry.validate_sequence(calls)
    }

    /// Planned groups of action names, without running anything.
    pub fn execution_plan(&self, calls: &[ActionCall]) -> Result<Vec<Vec<String>>, ActionError> {
        let groups = self.registry.execution_order(calls)?;
        Ok(groups
            .into_iter()
            .map(|g| g.into_iter().map(|c| c.action).collect())
            .collect())
    }

    pub async fn execute_sequence(&self, calls: &[ActionCall]) -> Result<ExecutionResult, ActionError> {
        self.executor.execute_parallel(calls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::handler_fn;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn operator() -> Operator {
        let mut registry = Registry::new();
        registry
            .register(
                Action::new(
                    "create_web_app",
                    "Create a Next.js web app",
                    Category::Create,
                    handler_fn(|_ctx, inputs: ValueMap| async move {
                        let mut out = ValueMap::new();
                        out.insert("app_path".into(), inputs["name"].clone());
                        Ok(out)
                    }),
                )
                .with_tags(["web"]),
            )
            .unwrap();
        registry
            .register(
                Action::new(
                    "deploy",
                    "Deploy the app",
                    Category::Deploy,
                    handler_fn(|_ctx, _inputs| async { Ok(ValueMap::new()) }),
                )
                .depends_on("create_web_app"),
            )
            .unwrap();
        Operator::new(registry, ExecutorConfig::default())
    }

    #[test]
    fn discovery() {
        let op = operator();
        assert_eq!(op.discover_actions("").len(), 2);
        assert_eq!(op.discover_actions("next")[0].name, "create_web_app");
        assert_eq!(op.available_actions(Some(Category::Deploy))[0].name, "deploy");
        assert_eq!(op.available_actions(None).len(), 2);
        assert!(op.get_action("nope").is_err());
    }

    #[test]
    fn plan_without_running() {
        let op = operator();
        let plan = op
            .execution_plan(&[ActionCall::new("deploy"), ActionCall::new("create_web_app")])
            .unwrap();
        assert_eq!(
            plan,
            vec![vec!["create_web_app".to_string()], vec!["deploy".to_string()]]
        );
    }

    #[tokio::test]
    async fn execute_single_and_sequence() {
        let op = operator();
        let mut inputs = ValueMap::new();
        inputs.insert("name".into(), json!("shop"));

        let single = op.execute_action("create_web_app", inputs).await.unwrap();
        assert_eq!(single.outputs["app_path"], json!("shop"));

        let result = op
            .execute_sequence(&[
                ActionCall::new("deploy"),
                ActionCall::new("create_web_app").with_input("name", "shop"),
            ])
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(
            result.result_for("deploy").unwrap().propagated_inputs,
            vec!["app_path".to_string()]
        );
    }
}
