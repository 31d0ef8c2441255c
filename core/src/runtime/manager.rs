use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::util::process_id;

use super::detect::{detect_app_kind, run_install};
use super::group::kill_process_group;
use super::health::{HealthOutcome, HealthProbe};
use super::io_pump::{pump_stderr, pump_stdout, spawn_log_writer, LogLine};
use super::port::allocate_port;
use super::process::{Process, ProcessInfo, ProcessState};

/// Supervises locally running applications, one child process each.
///
/// The table is guarded by a read/write lock: lookups run concurrently,
/// registration and removal are exclusive.
#[derive(Debug)]
pub struct ProcessManager {
    config: RuntimeConfig,
    processes: RwLock<HashMap<String, Arc<Process>>>,
}

impl ProcessManager {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            processes: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Start the application in `path` on `port` (0 = pick one) and wait until
    /// it answers HTTP. Nothing is registered if a step before spawning fails;
    /// a failed health check tears the process down through [`Self::stop`].
    pub async fn deploy(&self, path: impl AsRef<Path>, port: u16) -> Result<ProcessInfo, RuntimeError> {
        let dir = resolve_dir(path.as_ref()).await?;
        let kind = detect_app_kind(&dir)?;
        let port = allocate_port(port).await?;
        let probe = HealthProbe::new(format!("http://127.0.0.1:{port}"), &self.config)?;

        if self.config.install_dependencies {
            if let Some(plan) = kind.install_plan(&dir) {
                run_install(&plan, &dir).await?;
            }
        }

        let log_dir = self.config.resolved_log_dir();
        tokio::fs::create_dir_all(&log_dir).await?;

        let (id, log_file, sink) = create_log(&log_dir, &process_id(&dir, chrono::Local::now())).await?;

        let mut child = kind
            .start_command(&dir, port, &self.config.port_env)
            .spawn()
            .map_err(|e| RuntimeError::Spawn(format!("{} app in {}: {e}", kind.name(), dir.display())))?;

        let cancel = CancellationToken::new();
        let (line_tx, line_rx) = mpsc::channel::<LogLine>(256);
        let writer = spawn_log_writer(sink, line_rx);
        if let Some(stdout) = child.stdout.take() {
            pump_stdout(stdout, line_tx.clone(), cancel.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            pump_stderr(stderr, line_tx, cancel.clone());
        }

        let process = Arc::new(Process::new(
            id.clone(),
            dir,
            kind.name(),
            port,
            log_file,
            child.id(),
            cancel,
        ));
        process.transition(ProcessState::Running);

        let supervisor = tokio::spawn(supervise(child, Arc::clone(&process)));
        process.attach(supervisor, writer).await;

        let registered = match self.processes.write().await.entry(id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&process));
                true
            }
            Entry::Occupied(_) => false,
        };
        if !registered {
            process
                .shutdown(Duration::from_millis(self.config.stop_grace_ms))
                .await;
            return Err(RuntimeError::Spawn(format!("process id {id} is already registered")));
        }

        tracing::info!(
            process_id = id.as_str(),
            kind = kind.name(),
            port,
            pid = process.pid,
            "process started"
        );

        match probe.wait(process.cancel_token()).await {
            HealthOutcome::Healthy => {
                process.transition(ProcessState::Healthy);
                tracing::info!(process_id = id.as_str(), url = process.url.as_str(), "process healthy");
                Ok(process.info())
            }
            outcome => {
                process.transition(ProcessState::Unhealthy);
                tracing::warn!(
                    process_id = id.as_str(),
                    outcome = ?outcome,
                    log_file = %process.log_file.display(),
                    "health check failed, stopping"
                );
                if let Err(e) = self.stop(&id).await {
                    tracing::warn!(process_id = id.as_str(), error = %e, "cleanup after failed health check");
                }
                Err(RuntimeError::HealthCheckTimeout {
                    process_id: id,
                    timeout_ms: self.config.health_timeout_ms,
                })
            }
        }
    }

    /// The single teardown path. Removes the entry first, so a second stop of
    /// the same id fails with `ProcessNotFound`.
    pub async fn stop(&self, id: &str) -> Result<ProcessInfo, RuntimeError> {
        let process = self
            .processes
            .write()
            .await
            .remove(id)
            .ok_or_else(|| RuntimeError::ProcessNotFound(id.to_string()))?;

        process
            .shutdown(Duration::from_millis(self.config.stop_grace_ms))
            .await;

        tracing::info!(process_id = id, "process stopped");
        Ok(process.info())
    }

    /// Stop every registered process. Returns how many were stopped.
    pub async fn stop_all(&self) -> usize {
        let ids: Vec<String> = self.processes.read().await.keys().cloned().collect();
        let mut stopped = 0;
        for id in ids {
            match self.stop(&id).await {
                Ok(_) => stopped += 1,
                Err(e) => tracing::debug!(process_id = id.as_str(), error = %e, "already gone"),
            }
        }
        stopped
    }

    pub async fn get_process(&self, id: &str) -> Option<ProcessInfo> {
        self.processes.read().await.get(id).map(|p| p.info())
    }

    /// Snapshots of all registered processes, oldest first.
    pub async fn list_processes(&self) -> Vec<ProcessInfo> {
        let mut all: Vec<ProcessInfo> = self
            .processes
            .read()
            .await
            .values()
            .map(|p| p.info())
            .collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub async fn log_file(&self, id: &str) -> Result<PathBuf, RuntimeError> {
        self.processes
            .read()
            .await
            .get(id)
            .map(|p| p.log_file.clone())
            .ok_or_else(|| RuntimeError::ProcessNotFound(id.to_string()))
    }
}

const MAX_ID_ATTEMPTS: usize = 100;

/// Claim a fresh log file for `base`, suffixing `-1`, `-2`, ... while the
/// name is taken. The file name doubles as the process id reservation.
async fn create_log(
    log_dir: &Path,
    base: &str,
) -> Result<(String, PathBuf, tokio::fs::File), RuntimeError> {
    for attempt in 0..MAX_ID_ATTEMPTS {
        let id = if attempt == 0 {
            base.to_string()
        } else {
            format!("{base}-{attempt}")
        };
        let path = log_dir.join(format!("{id}.log"));
        match tokio::fs::OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((id, path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(RuntimeError::Spawn(format!("no free process id for {base}")))
}

async fn resolve_dir(path: &Path) -> Result<PathBuf, RuntimeError> {
    let dir = tokio::fs::canonicalize(path)
        .await
        .map_err(|_| RuntimeError::InvalidPath(path.to_path_buf()))?;
    if !dir.is_dir() {
        return Err(RuntimeError::InvalidPath(dir));
    }
    Ok(dir)
}

/// Owns the child. A natural exit marks the process `Exited` and cancels its
/// context so the pumps finish; a cancellation kills the child's whole
/// process group, then reaps the child. Leftover group members are killed
/// after a natural exit too, so nothing keeps the port.
async fn supervise(mut child: Child, process: Arc<Process>) {
    let cancel = process.cancel_token().clone();
    let pid = child.id();

    tokio::select! {
        status = child.wait() => {
            let code = status.as_ref().ok().and_then(|s| s.code());
            match &status {
                Ok(s) => tracing::info!(process_id = process.id.as_str(), status = %s, "process exited"),
                Err(e) => tracing::warn!(process_id = process.id.as_str(), error = %e, "waiting on process failed"),
            }
            kill_group(pid, &process);
            process.mark_exited(code);
            cancel.cancel();
        }
        _ = cancel.cancelled() => {
            kill_group(pid, &process);
            if let Err(e) = child.kill().await {
                tracing::warn!(process_id = process.id.as_str(), error = %e, "failed to kill process");
            }
        }
    }
}

fn kill_group(pid: Option<u32>, process: &Process) {
    let Some(pid) = pid else { return };
    if let Err(e) = kill_process_group(pid) {
        tracing::warn!(process_id = process.id.as_str(), pid, error = %e, "failed to kill process group");
    }
}
