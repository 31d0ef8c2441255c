use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the local process runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("application path does not exist: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error(
        "unsupported application type in {} (no Procfile, package.json, requirements.txt or go.mod found)",
        .0.display()
    )]
    UnsupportedAppType(PathBuf),

    #[error("port {0} is already in use")]
    PortInUse(u16),

    #[error("failed to allocate port: {0}")]
    PortAllocation(#[source] std::io::Error),

    #[error("failed to install dependencies with `{command}`: {message}")]
    InstallFailed { command: String, message: String },

    #[error("failed to start process: {0}")]
    Spawn(String),

    #[error("process {process_id} did not become healthy within {timeout_ms}ms")]
    HealthCheckTimeout { process_id: String, timeout_ms: u64 },

    #[error("invalid runtime config: {0}")]
    InvalidConfig(String),

    #[error("process not found: {0}")]
    ProcessNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Stable kind name used by the dispatch boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPath(_) => "InvalidPath",
            Self::UnsupportedAppType(_) => "UnsupportedAppType",
            Self::PortInUse(_) => "PortInUse",
            Self::PortAllocation(_) => "PortAllocation",
            Self::InstallFailed { .. } => "InstallFailed",
            Self::Spawn(_) => "Spawn",
            Self::HealthCheckTimeout { .. } => "HealthCheckTimeout",
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::ProcessNotFound(_) => "ProcessNotFound",
            Self::Io(_) => "Io",
        }
    }
}
