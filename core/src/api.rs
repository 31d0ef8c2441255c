//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `scaffold_core::api` instead of reaching into internal modules.

pub use crate::action::{
    handler_fn, Action, ActionCall, ActionContext, ActionHandler, ActionMetadata, Category,
    InputSpec, OutputSpec, Registry, Tier, ValueMap, ValueType,
};
pub use crate::config::{
    apply_env_overrides, load_default, load_from_path, AppConfig, ExecutorConfig, LoggingConfig, RuntimeConfig,
};
pub use crate::dispatch::{serve_lines, Dispatcher, ToolRequest, ToolResponse, DEFAULT_LOG_LINES};
pub use crate::error::{ActionError, RuntimeError};
pub use crate::executor::{ActionResult, ExecutionResult, Executor};
pub use crate::operator::Operator;
pub use crate::runtime::{
    read_log_tail, tail_logs, ProcessInfo, ProcessManager, ProcessState, NO_LOGS_YET,
};
