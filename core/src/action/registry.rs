use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::ActionError;
use crate::executor::DependencyGraph;

use super::types::{Action, ActionCall, ActionMetadata, Category};

/// Name-keyed store of every known action.
///
/// Populated once at startup, then shared read-only (behind an `Arc`) by the
/// executor and the operator facade.
#[derive(Debug, Default)]
pub struct Registry {
    actions: HashMap<String, Arc<Action>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store an action. Names are unique.
    pub fn register(&mut self, action: Action) -> Result<(), ActionError> {
        action.validate()?;

        if self.actions.contains_key(&action.name) {
            return Err(ActionError::InvalidAction(format!(
                "action '{}' is already registered",
                action.name
            )));
        }

        tracing::debug!(
            action = action.name.as_str(),
            category = action.category.as_str(),
            "registered action"
        );
        self.actions.insert(action.name.clone(), Arc::new(action));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Action>, ActionError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| ActionError::ActionNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Every action, sorted by name.
    pub fn list(&self) -> Vec<Arc<Action>> {
        let mut all: Vec<Arc<Action>> = self.actions.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn list_by_category(&self, category: Category) -> Vec<Arc<Action>> {
        self.list()
            .into_iter()
            .filter(|a| a.category == category)
            .collect()
    }

    /// Case-insensitive substring match on name, description and tags.
    /// An empty query returns everything.
    pub fn search(&self, query: &str) -> Vec<Arc<Action>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.list();
        }

        self.list()
            .into_iter()
            .filter(|a| {
                a.name.to_lowercase().contains(&needle)
                    || a.description.to_lowercase().contains(&needle)
                    || a.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn metadata(&self) -> Vec<ActionMetadata> {
        self.list().iter().map(|a| a.metadata()).collect()
    }

    /// Check a call set before planning: every action exists, none appears
    /// twice, and no pair conflicts (in either direction).
    pub fn validate_sequence(&self, calls: &[ActionCall]) -> Result<(), ActionError> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(calls.len());
        let mut resolved: Vec<Arc<Action>> = Vec::with_capacity(calls.len());

        for call in calls {
            let action = self.get(&call.action)?;
            if !seen.insert(call.action.as_str()) {
                return Err(ActionError::DuplicateCall(call.action.clone()));
            }
            resolved.push(action);
        }

        for (i, a) in resolved.iter().enumerate() {
            for b in &resolved[i + 1..] {
                if a.conflicts.contains(&b.name) || b.conflicts.contains(&a.name) {
                    return Err(ActionError::ConflictDetected {
                        action: a.name.clone(),
                        other: b.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Dependency graph restricted to the call set. Dependencies on actions
    /// outside the set are ignored.
    pub fn dependency_graph(&self, calls: &[ActionCall]) -> Result<DependencyGraph<String>, ActionError> {
        let mut graph = DependencyGraph::new();
        for call in calls {
            graph.add_node(call.action.clone());
        }

        for call in calls {
            let action = self.get(&call.action)?;
            for dep in &action.dependencies {
                if graph.contains(dep) {
                    graph.add_edge(dep.clone(), call.action.clone());
                }
            }
        }

        Ok(graph)
    }

    /// Partition a call set into groups that may run concurrently. Every
    /// action lands in a later group than all of its in-set dependencies.
    pub fn execution_order(&self, calls: &[ActionCall]) -> Result<Vec<Vec<ActionCall>>, ActionError> {
        self.validate_sequence(calls)?;

        let graph = self.dependency_graph(calls)?;
        let groups = graph
            .parallel_groups()
            .map_err(|cycle| ActionError::CyclicDependency(cycle.0))?;

        let mut by_name: HashMap<&str, &ActionCall> =
            calls.iter().map(|c| (c.action.as_str(), c)).collect();

        Ok(groups
            .into_iter()
            .map(|group| {
                group
                    .iter()
                    .filter_map(|name| by_name.remove(name.as_str()).cloned())
                    .collect()
            })
            .collect())
    }
}
