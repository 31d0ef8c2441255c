use scaffold_core::api::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit code for an error that ends the program.
    ///
    /// 11: config error, 20: runtime start / IO error, 50: internal.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Runtime(_) => 20,
            CliError::Io(_) => 20,
            CliError::Command(_) => 20,
            CliError::Anyhow(_) => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(CliError::Config("bad".into()).exit_code(), 11);
        assert_eq!(
            CliError::from(RuntimeError::PortInUse(8080)).exit_code(),
            20
        );
        assert_eq!(CliError::from(anyhow::anyhow!("boom")).exit_code(), 50);
    }
}
