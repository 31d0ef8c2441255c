use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{ActionCall, Category, ValueMap};

pub const DEFAULT_LOG_LINES: usize = 50;

fn default_log_lines() -> usize {
    DEFAULT_LOG_LINES
}

/// One named tool operation with its typed parameters.
///
/// Wire form: `{"operation": "<name>", "params": {...}}`. Unknown operations
/// and params of the wrong shape fail to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "params", rename_all = "snake_case")]
pub enum ToolRequest {
    DiscoverActions {
        #[serde(default)]
        query: String,
        #[serde(default)]
        category: Option<Category>,
    },
    GetAction {
        name: String,
    },
    ExecuteAction {
        name: String,
        #[serde(default)]
        inputs: ValueMap,
    },
    ExecuteSequence {
        calls: Vec<ActionCall>,
    },
    ValidateSequence {
        calls: Vec<ActionCall>,
    },
    StartProcess {
        path: String,
        #[serde(default)]
        port: u16,
    },
    StopProcess {
        process_id: String,
    },
    GetLogs {
        process_id: String,
        #[serde(default = "default_log_lines")]
        lines: usize,
    },
    ListProcesses {},
}

impl ToolRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::DiscoverActions { .. } => "discover_actions",
            Self::GetAction { .. } => "get_action",
            Self::ExecuteAction { .. } => "execute_action",
            Self::ExecuteSequence { .. } => "execute_sequence",
            Self::ValidateSequence { .. } => "validate_sequence",
            Self::StartProcess { .. } => "start_process",
            Self::StopProcess { .. } => "stop_process",
            Self::GetLogs { .. } => "get_logs",
            Self::ListProcesses {} => "list_processes",
        }
    }
}

/// A request as read off the wire: optional correlation id plus the request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFrame {
    pub id: Option<Value>,
    pub request: ToolRequest,
}

/// Why a frame could not be turned into a request.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameError {
    pub id: Option<Value>,
    pub operation: String,
    pub message: String,
}

/// Parse one JSON frame. A missing `params` object is treated as empty.
pub fn parse_frame(line: &str) -> Result<RequestFrame, FrameError> {
    let mut value: Value = serde_json::from_str(line).map_err(|e| FrameError {
        id: None,
        operation: String::new(),
        message: format!("invalid JSON: {e}"),
    })?;

    let Some(obj) = value.as_object_mut() else {
        return Err(FrameError {
            id: None,
            operation: String::new(),
            message: "request must be a JSON object".into(),
        });
    };

    let id = obj.remove("id");
    let operation = obj
        .get("operation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    obj.entry("params")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));

    match serde_json::from_value::<ToolRequest>(value) {
        Ok(request) => Ok(RequestFrame { id, request }),
        Err(e) => Err(FrameError {
            id,
            operation,
            message: e.to_string(),
        }),
    }
}
