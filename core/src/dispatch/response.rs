use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured reply to one tool request. Operation failures are reported
/// here with `success = false`, never as transport errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub operation: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl ToolResponse {
    pub fn ok(operation: impl Into<String>, message: impl Into<String>, data: Value) -> Self {
        Self {
            id: None,
            operation: operation.into(),
            success: true,
            message: message.into(),
            data,
            error_kind: None,
        }
    }

    pub fn failure(
        operation: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            operation: operation.into(),
            success: false,
            message: message.into(),
            data: Value::Null,
            error_kind: Some(kind.into()),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }
}
