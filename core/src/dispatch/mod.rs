//! Tool-dispatch boundary: typed requests in, structured responses out.

mod request;
mod response;

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::action::{ActionCall, Category, ValueMap};
use crate::error::ActionError;
use crate::operator::Operator;
use crate::runtime::{tail_logs, ProcessManager};

pub use request::{parse_frame, FrameError, RequestFrame, ToolRequest, DEFAULT_LOG_LINES};
pub use response::ToolResponse;

/// Lines of log shown right after a successful start.
const START_LOG_LINES: usize = 10;

/// Routes tool requests to the operator or the process runtime.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    operator: Operator,
    processes: Arc<ProcessManager>,
}

impl Dispatcher {
    pub fn new(operator: Operator, processes: Arc<ProcessManager>) -> Self {
        Self {
            operator,
            processes,
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn processes(&self) -> &Arc<ProcessManager> {
        &self.processes
    }

    pub async fn dispatch(&self, request: ToolRequest) -> ToolResponse {
        let operation = request.operation();
        tracing::debug!(operation, "dispatching tool request");

        match request {
            ToolRequest::DiscoverActions { query, category } => self.discover(&query, category),
            ToolRequest::GetAction { name } => self.get_action(&name),
            ToolRequest::ExecuteAction { name, inputs } => self.execute_action(&name, inputs).await,
            ToolRequest::ExecuteSequence { calls } => self.execute_sequence(&calls).await,
            ToolRequest::ValidateSequence { calls } => self.validate_sequence(&calls),
            ToolRequest::StartProcess { path, port } => self.start_process(&path, port).await,
            ToolRequest::StopProcess { process_id } => self.stop_process(&process_id).await,
            ToolRequest::GetLogs { process_id, lines } => self.get_logs(&process_id, lines).await,
            ToolRequest::ListProcesses {} => self.list_processes().await,
        }
    }

    /// Parse and dispatch one JSON frame. Parse failures become
    /// `InvalidRequest` responses.
    pub async fn handle_line(&self, line: &str) -> ToolResponse {
        match parse_frame(line) {
            Ok(RequestFrame { id, request }) => self.dispatch(request).await.with_id(id),
            Err(FrameError {
                id,
                operation,
                message,
            }) => ToolResponse::failure(operation, "InvalidRequest", message).with_id(id),
        }
    }

    fn discover(&self, query: &str, category: Option<Category>) -> ToolResponse {
        let mut found = self.operator.discover_actions(query);
        if let Some(c) = category {
            found.retain(|m| m.category == c);
        }
        let message = format!("Found {} action(s)", found.len());
        ToolResponse::ok("discover_actions", message, json!({ "actions": found }))
    }

    fn get_action(&self, name: &str) -> ToolResponse {
        match self.operator.get_action(name) {
            Ok(action) => ToolResponse::ok(
                "get_action",
                format!("{}: {}", action.name, action.description),
                to_data(action.as_ref()),
            ),
            Err(e) => action_failure("get_action", &e),
        }
    }

    async fn execute_action(&self, name: &str, inputs: ValueMap) -> ToolResponse {
        match self.operator.execute_action(name, inputs).await {
            Ok(result) if result.success => ToolResponse::ok(
                "execute_action",
                format!("Action '{}' completed in {}ms", result.action, result.duration_ms),
                to_data(&result),
            ),
            Ok(result) => ToolResponse::failure(
                "execute_action",
                result.error_kind.clone().unwrap_or_else(|| "ActionFailed".into()),
                format!(
                    "Action '{}' failed: {}",
                    result.action,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            )
            .with_data(to_data(&result)),
            Err(e) => action_failure("execute_action", &e),
        }
    }

    async fn execute_sequence(&self, calls: &[ActionCall]) -> ToolResponse {
        match self.operator.execute_sequence(calls).await {
            Ok(result) if result.success => ToolResponse::ok(
                "execute_sequence",
                format!(
                    "Executed {} action(s) in {} group(s) ({}ms)",
                    result.results.len(),
                    result.groups.len(),
                    result.total_duration_ms
                ),
                to_data(&result),
            ),
            Ok(result) => {
                let (kind, message) = match result.failed_action() {
                    Some(failed) => (
                        failed.error_kind.clone().unwrap_or_else(|| "ActionFailed".into()),
                        format!(
                            "Action '{}' failed: {}",
                            failed.action,
                            failed.error.as_deref().unwrap_or("unknown error")
                        ),
                    ),
                    None => ("ActionFailed".to_string(), "sequence failed".to_string()),
                };
                ToolResponse::failure("execute_sequence", kind, message).with_data(to_data(&result))
            }
            Err(e) => action_failure("execute_sequence", &e),
        }
    }

    fn validate_sequence(&self, calls: &[ActionCall]) -> ToolResponse {
        let validated = self
            .operator
            .validate_sequence(calls)
            .and_then(|_| self.operator.execution_plan(calls));
        match validated {
            Ok(groups) => ToolResponse::ok(
                "validate_sequence",
                format!("Sequence is valid ({} group(s))", groups.len()),
                json!({ "groups": groups }),
            ),
            Err(e) => action_failure("validate_sequence", &e),
        }
    }

    async fn start_process(&self, path: &str, port: u16) -> ToolResponse {
        match self.processes.deploy(path, port).await {
            Ok(info) => {
                let logs = tail_logs(&info.log_file, START_LOG_LINES).await;
                let message = format!(
                    "Started process: {}\nPort: {}\nURL: {}\n\nRecent logs:\n{}",
                    info.id, info.port, info.url, logs
                );
                ToolResponse::ok("start_process", message, to_data(&info))
            }
            Err(e) => ToolResponse::failure(
                "start_process",
                e.kind(),
                format!("Failed to start process: {e}"),
            )
            .with_data(json!({ "path": path })),
        }
    }

    async fn stop_process(&self, process_id: &str) -> ToolResponse {
        match self.processes.stop(process_id).await {
            Ok(info) => ToolResponse::ok(
                "stop_process",
                format!("Stopped process: {process_id}"),
                to_data(&info),
            ),
            Err(e) => ToolResponse::failure(
                "stop_process",
                e.kind(),
                format!("Failed to stop process: {e}"),
            )
            .with_data(json!({ "process_id": process_id })),
        }
    }

    async fn get_logs(&self, process_id: &str, lines: usize) -> ToolResponse {
        let lines = if lines == 0 { DEFAULT_LOG_LINES } else { lines };
        match self.processes.log_file(process_id).await {
            Ok(path) => {
                let logs = tail_logs(&path, lines).await;
                ToolResponse::ok(
                    "get_logs",
                    format!("Logs for process {process_id}:\n\n{logs}"),
                    json!({ "process_id": process_id, "logs": logs, "lines": lines }),
                )
            }
            Err(e) => ToolResponse::failure("get_logs", e.kind(), e.to_string())
                .with_data(json!({ "process_id": process_id })),
        }
    }

    async fn list_processes(&self) -> ToolResponse {
        let processes = self.processes.list_processes().await;
        if processes.is_empty() {
            return ToolResponse::ok(
                "list_processes",
                "No processes currently running",
                json!({ "processes": [] }),
            );
        }

        let mut message = String::from("Running processes:\n\n");
        for (i, p) in processes.iter().enumerate() {
            message.push_str(&format!(
                "{}. Process ID: {}\n   Path:     {}\n   Port:     {}\n   URL:      {}\n   State:    {}\n   Log File: {}\n\n",
                i + 1,
                p.id,
                p.path.display(),
                p.port,
                p.url,
                p.state.as_str(),
                p.log_file.display()
            ));
        }
        ToolResponse::ok("list_processes", message, json!({ "processes": processes }))
    }
}

fn action_failure(operation: &str, err: &ActionError) -> ToolResponse {
    let data = match err.action() {
        Some(action) => json!({ "action": action }),
        None => Value::Null,
    };
    ToolResponse::failure(operation, err.kind(), err.to_string()).with_data(data)
}

fn to_data<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "serialization_error": e.to_string() }))
}

/// Serve JSON-lines requests from `reader` until EOF, one response line per
/// request. Blank lines are skipped.
///
/// Requests run concurrently: a slow `start_process` does not hold up a
/// `list_processes` sent after it. Responses are written as they complete,
/// so callers correlate them through the request `id`.
pub async fn serve_lines<R, W>(dispatcher: &Dispatcher, reader: R, mut writer: W) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut in_flight = FuturesUnordered::new();
    let mut handled = 0u64;
    let mut eof = false;

    loop {
        tokio::select! {
            line = lines.next_line(), if !eof => match line? {
                Some(line) => {
                    let line = line.trim().to_string();
                    if !line.is_empty() {
                        in_flight.push(async move { dispatcher.handle_line(&line).await });
                    }
                }
                None => eof = true,
            },
            Some(response) = in_flight.next(), if !in_flight.is_empty() => {
                let mut frame = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
                frame.push(b'\n');
                writer.write_all(&frame).await?;
                writer.flush().await?;
                handled += 1;
            }
            else => break,
        }
    }

    Ok(handled)
}
