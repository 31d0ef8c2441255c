use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;

/// Lifecycle of a supervised process.
///
/// ```text
/// Spawning → Running → Healthy | Unhealthy → Exited | Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    Spawning,
    Running,
    Healthy,
    Unhealthy,
    /// The child ended on its own; logs stay readable until stopped.
    Exited,
    Stopped,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spawning => "spawning",
            Self::Running => "running",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::Exited => "exited",
            Self::Stopped => "stopped",
        }
    }

    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;
        matches!(
            (self, next),
            (Spawning, Running | Stopped)
                | (Running, Healthy | Unhealthy | Exited | Stopped)
                | (Healthy, Exited | Stopped)
                | (Unhealthy, Exited | Stopped)
                | (Exited, Stopped)
        )
    }

    pub fn is_alive(self) -> bool {
        matches!(self, Self::Spawning | Self::Running | Self::Healthy | Self::Unhealthy)
    }
}

/// Serializable snapshot of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub id: String,
    pub path: PathBuf,
    pub kind: String,
    pub port: u16,
    pub url: String,
    pub log_file: PathBuf,
    pub state: ProcessState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub started_at: String,
}

#[derive(Debug, Clone, Copy)]
struct Status {
    state: ProcessState,
    exit_code: Option<i32>,
}

#[derive(Debug, Default)]
struct Tasks {
    supervisor: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<Result<u64, RuntimeError>>>,
}

/// One supervised child process and the tasks attached to it.
///
/// The child itself is owned by the supervisor task; everything else talks
/// to it through the cancellation token.
#[derive(Debug)]
pub struct Process {
    pub id: String,
    pub path: PathBuf,
    pub kind: String,
    pub port: u16,
    pub url: String,
    pub log_file: PathBuf,
    pub pid: Option<u32>,
    pub started_at: String,
    cancel: CancellationToken,
    status: watch::Sender<Status>,
    tasks: Mutex<Tasks>,
}

impl Process {
    pub fn new(
        id: String,
        path: PathBuf,
        kind: &str,
        port: u16,
        log_file: PathBuf,
        pid: Option<u32>,
        cancel: CancellationToken,
    ) -> Self {
        let (status, _) = watch::channel(Status {
            state: ProcessState::Spawning,
            exit_code: None,
        });
        Self {
            id,
            path,
            kind: kind.to_string(),
            port,
            url: format!("http://localhost:{port}"),
            log_file,
            pid,
            started_at: chrono::Local::now().to_rfc3339(),
            cancel,
            status,
            tasks: Mutex::new(Tasks::default()),
        }
    }

    pub fn state(&self) -> ProcessState {
        self.status.borrow().state
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Move to `next` if the state machine allows it. Returns false otherwise.
    pub fn transition(&self, next: ProcessState) -> bool {
        let id = self.id.as_str();
        self.status.send_if_modified(|status| {
            if !status.state.can_transition_to(next) {
                tracing::debug!(
                    process_id = id,
                    from = status.state.as_str(),
                    to = next.as_str(),
                    "ignoring state transition"
                );
                return false;
            }
            tracing::debug!(
                process_id = id,
                from = status.state.as_str(),
                to = next.as_str(),
                "process state"
            );
            status.state = next;
            true
        })
    }

    pub(crate) fn mark_exited(&self, exit_code: Option<i32>) {
        if self.transition(ProcessState::Exited) {
            self.status.send_modify(|s| s.exit_code = exit_code);
        }
    }

    pub(crate) async fn attach(
        &self,
        supervisor: JoinHandle<()>,
        writer: JoinHandle<Result<u64, RuntimeError>>,
    ) {
        let mut tasks = self.tasks.lock().await;
        tasks.supervisor = Some(supervisor);
        tasks.writer = Some(writer);
    }

    /// Tear everything down: cancel the context (the supervisor kills the
    /// child and the pumps stop), then wait for the supervisor and the log
    /// writer, each for at most `grace`.
    pub(crate) async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();

        let (supervisor, writer) = {
            let mut tasks = self.tasks.lock().await;
            (tasks.supervisor.take(), tasks.writer.take())
        };

        if let Some(handle) = supervisor {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(process_id = self.id.as_str(), error = %e, "supervisor task failed"),
                Err(_) => tracing::warn!(process_id = self.id.as_str(), "supervisor did not finish in time"),
            }
        }

        if let Some(handle) = writer {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(Ok(lines))) => {
                    tracing::debug!(process_id = self.id.as_str(), lines, "log writer closed")
                }
                Ok(Ok(Err(e))) => tracing::warn!(process_id = self.id.as_str(), error = %e, "log writer failed"),
                Ok(Err(e)) => tracing::warn!(process_id = self.id.as_str(), error = %e, "log writer task failed"),
                Err(_) => tracing::warn!(process_id = self.id.as_str(), "log writer did not finish in time"),
            }
        }

        self.transition(ProcessState::Stopped);
    }

    pub fn info(&self) -> ProcessInfo {
        let status = *self.status.borrow();
        ProcessInfo {
            id: self.id.clone(),
            path: self.path.clone(),
            kind: self.kind.clone(),
            port: self.port,
            url: self.url.clone(),
            log_file: self.log_file.clone(),
            state: status.state,
            pid: self.pid,
            exit_code: status.exit_code,
            started_at: self.started_at.clone(),
        }
    }
}
