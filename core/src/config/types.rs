use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "scaffold_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutorConfig {
    /// Maximum actions running at once inside one parallel group. 0 = no cap.
    #[serde(default)]
    pub max_parallel: usize,
}

impl ExecutorConfig {
    /// Effective concurrency for a group of `group_len` actions.
    pub fn concurrency_for(&self, group_len: usize) -> usize {
        let group_len = group_len.max(1);
        if self.max_parallel == 0 {
            group_len
        } else {
            self.max_parallel.min(group_len)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory for per-process log files. Defaults to `<tmp>/scaffold-logs`.
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,

    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,

    /// Per-request timeout of a single health probe.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    #[serde(default = "default_install_dependencies")]
    pub install_dependencies: bool,

    /// Environment variable carrying the allocated port to the child.
    #[serde(default = "default_port_env")]
    pub port_env: String,

    /// How long `stop` waits for the supervisor to reap a killed child.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

fn default_health_timeout_ms() -> u64 {
    30_000
}

fn default_health_interval_ms() -> u64 {
    500
}

fn default_probe_timeout_ms() -> u64 {
    2_000
}

fn default_install_dependencies() -> bool {
    true
}

fn default_port_env() -> String {
    "PORT".to_string()
}

fn default_stop_grace_ms() -> u64 {
    2_000
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            health_timeout_ms: default_health_timeout_ms(),
            health_interval_ms: default_health_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            install_dependencies: default_install_dependencies(),
            port_env: default_port_env(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

impl RuntimeConfig {
    pub fn resolved_log_dir(&self) -> std::path::PathBuf {
        match self
            .log_dir
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(dir) => std::path::PathBuf::from(dir),
            None => std::env::temp_dir().join("scaffold-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.runtime.health_timeout_ms, 30_000);
        assert_eq!(cfg.runtime.health_interval_ms, 500);
        assert_eq!(cfg.runtime.port_env, "PORT");
        assert_eq!(cfg.executor.max_parallel, 0);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [runtime]
            health_timeout_ms = 1500
            log_dir = "/var/tmp/apps"

            [executor]
            max_parallel = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.runtime.health_timeout_ms, 1500);
        assert_eq!(cfg.runtime.probe_timeout_ms, 2_000);
        assert_eq!(
            cfg.runtime.resolved_log_dir(),
            std::path::PathBuf::from("/var/tmp/apps")
        );
        assert_eq!(cfg.executor.concurrency_for(5), 2);
        assert_eq!(cfg.executor.concurrency_for(1), 1);
    }

    #[test]
    fn unbounded_concurrency_matches_group_size() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.concurrency_for(7), 7);
        assert_eq!(cfg.concurrency_for(0), 1);
    }
}
