use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default scaffold data directory: ~/.scaffold
pub fn get_scaffold_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".scaffold"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.scaffold/config.toml
    let user_config = get_scaffold_data_dir()
        .map(|dir| dir.join("config.toml"))
        .ok();

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = match user_config.filter(|p| p.exists()) {
        Some(path) => load_from_path(&path)?,
        None if local_config.exists() => load_from_path(local_config)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority).
pub fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Some(v) = env_non_empty("SCAFFOLD_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_non_empty("SCAFFOLD_LOG_DIR") {
        cfg.runtime.log_dir = Some(v);
    }
    if let Some(v) = env_non_empty("SCAFFOLD_HEALTH_TIMEOUT_MS") {
        match v.parse::<u64>() {
            Ok(ms) => cfg.runtime.health_timeout_ms = ms,
            Err(_) => tracing::warn!(value = %v, "ignoring invalid SCAFFOLD_HEALTH_TIMEOUT_MS"),
        }
    }
    if let Some(v) = env_non_empty("SCAFFOLD_MAX_PARALLEL") {
        match v.parse::<usize>() {
            Ok(n) => cfg.executor.max_parallel = n,
            Err(_) => tracing::warn!(value = %v, "ignoring invalid SCAFFOLD_MAX_PARALLEL"),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
