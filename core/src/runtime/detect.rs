use std::path::Path;
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;

use crate::error::RuntimeError;

/// Kind of application found in a directory, decided by its manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AppKind {
    /// `web:` entry of a Procfile, run through `sh -c`.
    Procfile { command: String },
    Node,
    Python { entry: String },
    Go,
}

/// Detection order: Procfile, package.json, requirements.txt, go.mod.
pub fn detect_app_kind(dir: &Path) -> Result<AppKind, RuntimeError> {
    if let Some(command) = procfile_web_command(&dir.join("Procfile")) {
        return Ok(AppKind::Procfile { command });
    }
    if dir.join("package.json").is_file() {
        return Ok(AppKind::Node);
    }
    if dir.join("requirements.txt").is_file() {
        if let Some(entry) = ["app.py", "main.py"].into_iter().find(|f| dir.join(f).is_file()) {
            return Ok(AppKind::Python {
                entry: entry.to_string(),
            });
        }
    }
    if dir.join("go.mod").is_file() {
        return Ok(AppKind::Go);
    }
    Err(RuntimeError::UnsupportedAppType(dir.to_path_buf()))
}

fn procfile_web_command(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    text.lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#'))
        .find_map(|l| l.strip_prefix("web:"))
        .map(|cmd| cmd.trim().to_string())
        .filter(|cmd| !cmd.is_empty())
}

/// Dependency installation step for an app kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub program: &'static str,
    pub args: Vec<&'static str>,
}

impl InstallPlan {
    pub fn display(&self) -> String {
        std::iter::once(self.program)
            .chain(self.args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl AppKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Procfile { .. } => "procfile",
            Self::Node => "node",
            Self::Python { .. } => "python",
            Self::Go => "go",
        }
    }

    /// Install step, or `None` when the kind has none or its dependency cache
    /// directory already exists.
    pub fn install_plan(&self, dir: &Path) -> Option<InstallPlan> {
        match self {
            Self::Node if !dir.join("node_modules").exists() => Some(InstallPlan {
                program: "npm",
                args: vec!["install"],
            }),
            Self::Python { .. } if !dir.join(".deps").exists() => Some(InstallPlan {
                program: "pip",
                args: vec!["install", "-r", "requirements.txt", "--target", ".deps"],
            }),
            _ => None,
        }
    }

    /// Start command with the working directory and port variable set and
    /// both output streams piped.
    pub fn start_command(&self, dir: &Path, port: u16, port_env: &str) -> Command {
        let mut cmd = match self {
            Self::Procfile { command } => {
                let mut c = Command::new("sh");
                c.arg("-c").arg(shell_line(command));
                c
            }
            Self::Node => {
                let mut c = Command::new("npm");
                c.args(["run", "dev"]);
                c
            }
            Self::Python { entry } => {
                let mut c = Command::new("python3");
                c.arg(entry).env("PYTHONPATH", dir.join(".deps"));
                c
            }
            Self::Go => {
                let mut c = Command::new("go");
                c.args(["run", "."]);
                c
            }
        };

        cmd.current_dir(dir)
            .env(port_env, port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// Simple commands are exec'd so that killing the shell kills the server.
fn shell_line(command: &str) -> String {
    if command.contains(['|', '&', ';', '\n']) || command.starts_with("exec ") {
        command.to_string()
    } else {
        format!("exec {command}")
    }
}

/// Run an install step to completion inside `dir`.
pub async fn run_install(plan: &InstallPlan, dir: &Path) -> Result<(), RuntimeError> {
    tracing::info!(command = %plan.display(), dir = %dir.display(), "installing dependencies");

    let output = Command::new(plan.program)
        .args(&plan.args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| RuntimeError::InstallFailed {
            command: plan.display(),
            message: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: Vec<&str> = stderr.lines().rev().take(10).collect();
    let message = if tail.is_empty() {
        format!("exited with {}", output.status)
    } else {
        tail.into_iter().rev().collect::<Vec<_>>().join("\n")
    };
    Err(RuntimeError::InstallFailed {
        command: plan.display(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn detection_order_prefers_procfile() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert_eq!(detect_app_kind(dir.path()).unwrap(), AppKind::Node);

        fs::write(dir.path().join("Procfile"), "# dev\nweb: node server.js\n").unwrap();
        assert_eq!(
            detect_app_kind(dir.path()).unwrap(),
            AppKind::Procfile {
                command: "node server.js".into()
            }
        );
    }

    #[test]
    fn python_needs_an_entry_point() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();
        assert!(matches!(
            detect_app_kind(dir.path()),
            Err(RuntimeError::UnsupportedAppType(_))
        ));

        fs::write(dir.path().join("main.py"), "").unwrap();
        assert_eq!(
            detect_app_kind(dir.path()).unwrap(),
            AppKind::Python {
                entry: "main.py".into()
            }
        );
    }

    #[test]
    fn empty_directory_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = detect_app_kind(dir.path()).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedAppType");
    }

    #[test]
    fn install_is_skipped_when_cache_exists() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            AppKind::Node.install_plan(dir.path()).unwrap().display(),
            "npm install"
        );
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        assert!(AppKind::Node.install_plan(dir.path()).is_none());
        assert!(AppKind::Go.install_plan(dir.path()).is_none());
    }

    #[test]
    fn simple_procfile_commands_are_execd() {
        assert_eq!(shell_line("python3 -m http.server $PORT"), "exec python3 -m http.server $PORT");
        assert_eq!(shell_line("make build && ./server"), "make build && ./server");
    }
}
