use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy,
    TimedOut,
    /// The process went away (its context was cancelled) before answering.
    Exited,
}

/// HTTP readiness probe. Any response below 500 counts as healthy.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
    url: String,
    interval: Duration,
    timeout: Duration,
}

impl HealthProbe {
    /// Fails `InvalidConfig` when `probe_timeout_ms` is 0, which would make
    /// every probe fail immediately.
    pub fn new(url: impl Into<String>, cfg: &RuntimeConfig) -> Result<Self, RuntimeError> {
        if cfg.probe_timeout_ms == 0 {
            return Err(RuntimeError::InvalidConfig("probe_timeout_ms must be positive".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.probe_timeout_ms))
            .build()
            .map_err(|e| RuntimeError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            client,
            url: url.into(),
            interval: Duration::from_millis(cfg.health_interval_ms.max(1)),
            timeout: Duration::from_millis(cfg.health_timeout_ms),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn check_once(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) => !resp.status().is_server_error(),
            Err(e) => {
                tracing::trace!(url = self.url.as_str(), error = %e, "health probe failed");
                false
            }
        }
    }

    /// Poll until healthy, the deadline passes, or `cancel` fires.
    pub async fn wait(&self, cancel: &CancellationToken) -> HealthOutcome {
        let deadline = Instant::now() + self.timeout;

        loop {
            if cancel.is_cancelled() {
                return HealthOutcome::Exited;
            }
            if self.check_once().await {
                return HealthOutcome::Healthy;
            }

            let now = Instant::now();
            if now >= deadline {
                return HealthOutcome::TimedOut;
            }

            let pause = self.interval.min(deadline - now);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = cancel.cancelled() => return HealthOutcome::Exited,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fast_cfg(timeout_ms: u64) -> RuntimeConfig {
        RuntimeConfig {
            health_timeout_ms: timeout_ms,
            health_interval_ms: 20,
            probe_timeout_ms: 200,
            ..RuntimeConfig::default()
        }
    }

    async fn serve(status_line: &'static str) -> u16 {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 1024];
                let _ = sock.read(&mut buf).await;
                let resp = format!("{status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        port
    }

    #[tokio::test]
    async fn client_error_status_counts_as_healthy() {
        let port = serve("HTTP/1.1 404 Not Found").await;
        let probe = HealthProbe::new(format!("http://127.0.0.1:{port}"), &fast_cfg(2_000)).unwrap();
        assert_eq!(probe.wait(&CancellationToken::new()).await, HealthOutcome::Healthy);
    }

    #[tokio::test]
    async fn server_errors_until_deadline_time_out() {
        let port = serve("HTTP/1.1 503 Service Unavailable").await;
        let probe = HealthProbe::new(format!("http://127.0.0.1:{port}"), &fast_cfg(150)).unwrap();
        assert_eq!(probe.wait(&CancellationToken::new()).await, HealthOutcome::TimedOut);
    }

    #[tokio::test]
    async fn cancellation_ends_the_wait() {
        let port = crate::runtime::port::find_free_port().await.unwrap();
        let probe = HealthProbe::new(format!("http://127.0.0.1:{port}"), &fast_cfg(10_000)).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        assert_eq!(probe.wait(&cancel).await, HealthOutcome::Exited);
    }
}
