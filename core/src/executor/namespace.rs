use std::collections::BTreeMap;
use std::sync::Arc;

use crate::action::ValueMap;

use super::types::ActionResult;

/// Accumulated outputs of every action committed so far in one run.
///
/// Each group sees an immutable snapshot taken before the group starts, so
/// siblings never observe each other's outputs. Committing a later group
/// overwrites keys produced earlier; the shadowing is logged.
#[derive(Debug, Clone, Default)]
pub struct OutputNamespace {
    values: Arc<ValueMap>,
    /// key -> action that produced the current value
    origin: BTreeMap<String, String>,
}

impl OutputNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<ValueMap> {
        Arc::clone(&self.values)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn producer_of(&self, key: &str) -> Option<&str> {
        self.origin.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build the effective inputs for `action`: every committed output,
    /// overlaid with the caller's explicit inputs. Returns the enriched map and
    /// the keys that came from upstream outputs.
    pub fn enrich(&self, action: &str, explicit: &ValueMap) -> (ValueMap, Vec<String>) {
        let mut merged = explicit.clone();
        let mut propagated = Vec::new();

        for (key, value) in self.values.iter() {
            if merged.contains_key(key) {
                continue;
            }
            tracing::debug!(
                target: "scaffold.executor",
                action,
                key = key.as_str(),
                from = self.producer_of(key).unwrap_or("?"),
                "propagating upstream output"
            );
            merged.insert(key.clone(), value.clone());
            propagated.push(key.clone());
        }

        (merged, propagated)
    }

    /// Merge a successful result's outputs. Returns the keys it shadowed.
    pub fn commit(&mut self, result: &ActionResult) -> Vec<String> {
        if !result.success || result.outputs.is_empty() {
            return Vec::new();
        }

        let values = Arc::make_mut(&mut self.values);
        let mut shadowed = Vec::new();

        for (key, value) in &result.outputs {
            if values.insert(key.clone(), value.clone()).is_some() {
                let previous = self
                    .origin
                    .get(key)
                    .map(String::as_str)
                    .unwrap_or("?");
                tracing::warn!(
                    target: "scaffold.executor",
                    key = key.as_str(),
                    previous,
                    action = result.action.as_str(),
                    "output key overwritten"
                );
                shadowed.push(key.clone());
            }
            self.origin.insert(key.clone(), result.action.clone());
        }

        shadowed
    }

    pub fn into_values(self) -> ValueMap {
        Arc::try_unwrap(self.values).unwrap_or_else(|shared| (*shared).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn ok(action: &str, outputs: &[(&str, serde_json::Value)]) -> ActionResult {
        let outputs = outputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        ActionResult::succeeded(action, outputs, Duration::ZERO, vec![])
    }

    #[test]
    fn explicit_inputs_win_over_upstream() {
        let mut ns = OutputNamespace::new();
        ns.commit(&ok("db", &[("db_url", json!("postgres://a")), ("db_name", json!("x"))]));

        let mut explicit = ValueMap::new();
        explicit.insert("db_url".into(), json!("postgres://mine"));

        let (inputs, propagated) = ns.enrich("auth", &explicit);
        assert_eq!(inputs["db_url"], json!("postgres://mine"));
        assert_eq!(inputs["db_name"], json!("x"));
        assert_eq!(propagated, vec!["db_name".to_string()]);
    }

    #[test]
    fn later_commit_shadows_and_records_origin() {
        let mut ns = OutputNamespace::new();
        ns.commit(&ok("a", &[("url", json!(1))]));
        let shadowed = ns.commit(&ok("b", &[("url", json!(2))]));

        assert_eq!(shadowed, vec!["url".to_string()]);
        assert_eq!(ns.get("url"), Some(&json!(2)));
        assert_eq!(ns.producer_of("url"), Some("b"));
    }

    #[test]
    fn snapshot_is_isolated_from_later_commits() {
        let mut ns = OutputNamespace::new();
        ns.commit(&ok("a", &[("k", json!("v1"))]));
        let snap = ns.snapshot();
        ns.commit(&ok("b", &[("k", json!("v2"))]));

        assert_eq!(snap.get("k"), Some(&json!("v1")));
        assert_eq!(ns.into_values().get("k"), Some(&json!("v2")));
    }

    #[test]
    fn failed_results_are_not_committed() {
        let mut ns = OutputNamespace::new();
        let err = crate::error::ActionError::ActionFailed {
            action: "a".into(),
            message: "nope".into(),
        };
        ns.commit(&ActionResult::failed("a", &err, Duration::ZERO));
        assert!(ns.is_empty());
    }
}
