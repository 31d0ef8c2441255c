use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scaffold_core::api::{AppConfig, ProcessManager};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::commands::cli::RunArgs;
use crate::error::CliError;

/// Reads whatever complete lines were appended to a log file since the last poll.
#[derive(Debug)]
pub struct LogFollower {
    path: PathBuf,
    offset: u64,
}

impl LogFollower {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A trailing partial line stays unread until its newline arrives.
    pub async fn poll(&mut self) -> std::io::Result<Vec<String>> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        let len = file.metadata().await?.len();
        if len < self.offset {
            // truncated
            self.offset = 0;
        }
        if len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut buf = Vec::with_capacity((len - self.offset) as usize);
        file.read_to_end(&mut buf).await?;

        let Some(last_nl) = buf.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };
        self.offset += (last_nl + 1) as u64;

        Ok(String::from_utf8_lossy(&buf[..last_nl])
            .lines()
            .map(str::to_string)
            .collect())
    }
}

/// Handle run command: deploy, print where the app lives, follow its log
/// until Ctrl-C or until the app exits, then stop it.
pub async fn handle_run(args: RunArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let mut runtime = cfg.runtime.clone();
    args.runtime.apply(&mut runtime);
    let manager = ProcessManager::new(runtime);

    let info = manager.deploy(&args.path, args.port).await?;
    println!("Started process: {}", info.id);
    println!("Port: {}", info.port);
    println!("URL: {}", info.url);
    println!("Logs: {}", info.log_file.display());
    println!();

    let mut follower = LogFollower::new(&info.log_file);
    let interval = Duration::from_millis(args.follow_interval_ms.max(50));
    let mut ticker = tokio::time::interval(interval);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let exit = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!(process_id = info.id.as_str(), "interrupted");
                break 0;
            }
            _ = ticker.tick() => {
                match follower.poll().await {
                    Ok(lines) => lines.iter().for_each(|l| println!("{l}")),
                    Err(e) => tracing::warn!(log_file = %follower.path().display(), error = %e, "reading log failed"),
                }

                let alive = manager
                    .get_process(&info.id)
                    .await
                    .map(|p| p.state.is_alive())
                    .unwrap_or(false);
                if !alive {
                    eprintln!("process {} exited", info.id);
                    break 1;
                }
            }
        }
    };

    let stopped = manager.stop(&info.id).await?;
    tracing::info!(
        process_id = stopped.id.as_str(),
        state = stopped.state.as_str(),
        "run finished"
    );
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncWriteExt;

    async fn append(path: &Path, text: &str) {
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .unwrap();
        f.write_all(text.as_bytes()).await.unwrap();
        f.flush().await.unwrap();
    }

    #[tokio::test]
    async fn follows_only_complete_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "[t] [stdout] one\n[t] [stdout] tw").await;

        let mut follower = LogFollower::new(&path);
        assert_eq!(follower.poll().await.unwrap(), vec!["[t] [stdout] one"]);
        assert!(follower.poll().await.unwrap().is_empty());

        append(&path, "o\n[t] [stderr] three\n").await;
        assert_eq!(
            follower.poll().await.unwrap(),
            vec!["[t] [stdout] two", "[t] [stderr] three"]
        );
    }

    #[tokio::test]
    async fn truncation_restarts_from_the_top() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "first line that is long\n").await;

        let mut follower = LogFollower::new(&path);
        follower.poll().await.unwrap();

        tokio::fs::write(&path, "short\n").await.unwrap();
        assert_eq!(follower.poll().await.unwrap(), vec!["short"]);
    }
}
