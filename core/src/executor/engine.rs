use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::action::{Action, ActionCall, ActionContext, Registry, ValueMap};
use crate::config::ExecutorConfig;
use crate::error::ActionError;

use super::namespace::OutputNamespace;
use super::scheduler::execute_group_parallel;
use super::types::{ActionResult, ExecutionResult};

/// Runs single actions and whole call sets against a shared registry.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<Registry>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(registry: Arc<Registry>, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Execute one action with exactly the caller's inputs (plus declared
    /// defaults). Input validation errors are returned as `Err`; an
    /// implementation failure is a failed [`ActionResult`].
    pub async fn execute_single(&self, call: &ActionCall) -> Result<ActionResult, ActionError> {
        let action = self.registry.get(&call.action)?;
        let run_id = Uuid::new_v4().to_string();
        let ctx = ActionContext::standalone(run_id, &action.name);

        invoke(action, ctx, call.inputs.clone(), Vec::new()).await
    }

    /// Execute a call set group by group.
    ///
    /// Planning errors (unknown action, conflict, duplicate, cycle) are
    /// returned as `Err` before anything runs. Once execution starts every
    /// outcome is reported through the returned [`ExecutionResult`].
    pub async fn execute_parallel(&self, calls: &[ActionCall]) -> Result<ExecutionResult, ActionError> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        let groups = self.registry.execution_order(calls)?;
        let plan: Vec<Vec<String>> = groups
            .iter()
            .map(|g| g.iter().map(|c| c.action.clone()).collect())
            .collect();

        tracing::info!(
            target: "scaffold.executor",
            run_id = run_id.as_str(),
            actions = calls.len(),
            groups = plan.len(),
            "sequence start"
        );

        let mut namespace = OutputNamespace::new();
        let mut results: Vec<ActionResult> = Vec::with_capacity(calls.len());
        let mut success = true;

        for (group_idx, group) in groups.into_iter().enumerate() {
            let group_started = Instant::now();
            tracing::debug!(
                target: "scaffold.executor",
                run_id = run_id.as_str(),
                group = group_idx,
                actions = ?plan[group_idx],
                "group start"
            );

            let group_results = self
                .run_group(&run_id, group_idx, group, &namespace)
                .await?;

            if let Some(failed_at) = group_results.iter().position(|r| !r.success) {
                let also_failed = group_results.iter().filter(|r| !r.success).count() - 1;
                if also_failed > 0 {
                    tracing::warn!(
                        target: "scaffold.executor",
                        run_id = run_id.as_str(),
                        group = group_idx,
                        also_failed,
                        "additional failures in group not reported"
                    );
                }

                if let Some(failed) = group_results.into_iter().nth(failed_at) {
                    tracing::warn!(
                        target: "scaffold.executor",
                        run_id = run_id.as_str(),
                        group = group_idx,
                        action = failed.action.as_str(),
                        error = failed.error.as_deref().unwrap_or(""),
                        "group failed, stopping"
                    );
                    results.push(failed);
                }
                success = false;
                break;
            }

            for result in &group_results {
                namespace.commit(result);
            }
            results.extend(group_results);

            tracing::debug!(
                target: "scaffold.executor",
                run_id = run_id.as_str(),
                group = group_idx,
                duration_ms = group_started.elapsed().as_millis() as u64,
                "group finished"
            );
        }

        let total_duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            target: "scaffold.executor",
            run_id = run_id.as_str(),
            success,
            completed = results.len(),
            duration_ms = total_duration_ms,
            "sequence end"
        );

        Ok(ExecutionResult {
            run_id,
            success,
            results,
            outputs: namespace.into_values(),
            groups: plan,
            total_duration_ms,
        })
    }

    /// Run one group to completion. Results come back in submission order.
    async fn run_group(
        &self,
        run_id: &str,
        group_idx: usize,
        group: Vec<ActionCall>,
        namespace: &OutputNamespace,
    ) -> Result<Vec<ActionResult>, ActionError> {
        let upstream = namespace.snapshot();
        let names: Vec<String> = group.iter().map(|c| c.action.clone()).collect();

        let mut prepared = Vec::with_capacity(group.len());
        for call in group {
            let action = self.registry.get(&call.action)?;
            let (inputs, propagated) = namespace.enrich(&call.action, &call.inputs);
            let ctx = ActionContext {
                run_id: run_id.to_string(),
                action: call.action,
                group: Some(group_idx),
                upstream: Arc::clone(&upstream),
            };
            prepared.push((action, ctx, inputs, propagated));
        }

        let concurrency = self.config.concurrency_for(prepared.len());
        let outcomes = execute_group_parallel(
            prepared,
            concurrency,
            |(action, ctx, inputs, propagated): (Arc<Action>, ActionContext, ValueMap, Vec<String>)| async move {
                let name = action.name.clone();
                match invoke(action, ctx, inputs, propagated).await {
                    Ok(result) => result,
                    Err(err) => ActionResult::failed(name, &err, Duration::ZERO),
                }
            },
        )
        .await;

        Ok(outcomes
            .into_iter()
            .zip(names)
            .map(|(outcome, name)| {
                outcome.unwrap_or_else(|join_err| {
                    let err = ActionError::Join {
                        action: name.clone(),
                        message: join_err.to_string(),
                    };
                    ActionResult::failed(name, &err, Duration::ZERO)
                })
            })
            .collect())
    }
}

/// Validate, default and run one action.
async fn invoke(
    action: Arc<Action>,
    ctx: ActionContext,
    inputs: ValueMap,
    propagated: Vec<String>,
) -> Result<ActionResult, ActionError> {
    action.validate_inputs(&inputs)?;
    let inputs = action.apply_defaults(inputs);

    let started = Instant::now();
    let outcome = action.handler.run(ctx, inputs).await;
    let duration = started.elapsed();

    match outcome {
        Ok(outputs) => Ok(ActionResult::succeeded(
            action.name.clone(),
            outputs,
            duration,
            propagated,
        )),
        Err(e) => {
            let err = ActionError::ActionFailed {
                action: action.name.clone(),
                message: format!("{e:#}"),
            };
            tracing::debug!(
                target: "scaffold.executor",
                action = action.name.as_str(),
                error = %err,
                "action failed"
            );
            Ok(ActionResult::failed(action.name.clone(), &err, duration))
        }
    }
}
