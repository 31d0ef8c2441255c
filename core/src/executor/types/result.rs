use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::ValueMap;
use crate::error::ActionError;

/// Result of executing a single action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action: String,

    pub success: bool,

    #[serde(default, skip_serializing_if = "ValueMap::is_empty")]
    pub outputs: ValueMap,

    /// Error message; for implementation failures this is the message the
    /// implementation reported, unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Input keys filled from earlier actions' outputs rather than the caller.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub propagated_inputs: Vec<String>,

    /// The typed error behind a failure. Not serialized; see [`Self::failure`].
    #[serde(skip)]
    cause: Option<ActionError>,
}

impl ActionResult {
    pub fn succeeded(
        action: impl Into<String>,
        outputs: ValueMap,
        duration: Duration,
        propagated_inputs: Vec<String>,
    ) -> Self {
        Self {
            action: action.into(),
            success: true,
            outputs,
            error: None,
            error_kind: None,
            duration_ms: duration.as_millis() as u64,
            propagated_inputs,
            cause: None,
        }
    }

    pub fn failed(action: impl Into<String>, error: &ActionError, duration: Duration) -> Self {
        let message = match error {
            ActionError::ActionFailed { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            action: action.into(),
            success: false,
            outputs: ValueMap::new(),
            error: Some(message),
            error_kind: Some(error.kind().to_string()),
            duration_ms: duration.as_millis() as u64,
            propagated_inputs: Vec::new(),
            cause: Some(error.clone()),
        }
    }

    /// The error this result failed with, kind included (`MissingInput`,
    /// `InvalidInput`, `ActionFailed`, ...). A result read back from its
    /// serialized form has no typed cause; it comes back as `ActionFailed`
    /// with the recorded message, and `error_kind` keeps the original kind.
    pub fn failure(&self) -> Option<ActionError> {
        if self.success {
            return None;
        }
        Some(self.cause.clone().unwrap_or_else(|| ActionError::ActionFailed {
            action: self.action.clone(),
            message: self.error.clone().unwrap_or_default(),
        }))
    }
}

/// Result of executing a whole call set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub run_id: String,

    pub success: bool,

    /// Results in execution order. After a failure this ends with the failing
    /// action; nothing from later groups appears.
    pub results: Vec<ActionResult>,

    /// Union of the outputs of every committed action.
    pub outputs: ValueMap,

    /// Execution groups (for debugging)
    pub groups: Vec<Vec<String>>,

    pub total_duration_ms: u64,
}

impl ExecutionResult {
    pub fn failed_action(&self) -> Option<&ActionResult> {
        self.results.iter().find(|r| !r.success)
    }

    pub fn result_for(&self, action: &str) -> Option<&ActionResult> {
        self.results.iter().find(|r| r.action == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implementation_message_is_kept_verbatim() {
        let err = ActionError::ActionFailed {
            action: "setup_postgres".into(),
            message: "tiger CLI not found".into(),
        };
        let result = ActionResult::failed("setup_postgres", &err, Duration::from_millis(12));
        assert_eq!(result.error.as_deref(), Some("tiger CLI not found"));
        assert_eq!(result.error_kind.as_deref(), Some("ActionFailed"));
        assert_eq!(result.failure(), Some(err));
    }

    #[test]
    fn validation_failure_keeps_its_kind() {
        let err = ActionError::MissingInput {
            action: "create_web_app".into(),
            input: "name".into(),
        };
        let result = ActionResult::failed("create_web_app", &err, Duration::ZERO);
        assert_eq!(result.error_kind.as_deref(), Some("MissingInput"));
        assert_eq!(result.failure(), Some(err.clone()));

        // Over the wire only the kind name and message survive.
        let wire: ActionResult =
            serde_json::from_value(serde_json::to_value(&result).unwrap()).unwrap();
        assert_eq!(wire.error_kind.as_deref(), Some("MissingInput"));
        assert_eq!(
            wire.failure(),
            Some(ActionError::ActionFailed {
                action: "create_web_app".into(),
                message: err.to_string(),
            })
        );
    }

    #[test]
    fn successful_result_serializes_compactly() {
        let result = ActionResult::succeeded("a", ValueMap::new(), Duration::ZERO, vec![]);
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("outputs").is_none());
        assert_eq!(value["success"], serde_json::json!(true));
        assert!(result.failure().is_none());
    }
}
