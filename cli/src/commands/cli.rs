use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use scaffold_core::api::RuntimeConfig;

#[derive(Parser, Debug)]
#[command(name = "scaffold", version, about = "Orchestrate scaffolding actions and run the apps they produce")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.scaffold/config.toml or ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Overrides shared by the commands that start processes.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RuntimeArgs {
    /// Directory for per-process log files.
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Skip `npm install` / `pip install` before starting an app.
    #[arg(long, default_value_t = false)]
    pub no_install: bool,

    #[arg(long)]
    pub health_timeout_ms: Option<u64>,
}

impl RuntimeArgs {
    pub fn apply(&self, cfg: &mut RuntimeConfig) {
        if let Some(dir) = self.log_dir.as_ref() {
            cfg.log_dir = Some(dir.clone());
        }
        if self.no_install {
            cfg.install_dependencies = false;
        }
        if let Some(ms) = self.health_timeout_ms {
            cfg.health_timeout_ms = ms;
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Cap on actions running at once inside one parallel group (0 = none).
    #[arg(long)]
    pub max_parallel: Option<usize>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Application directory.
    pub path: PathBuf,

    /// Port to bind (0 picks a free one).
    #[arg(long, default_value_t = 0)]
    pub port: u16,

    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Poll interval while following the log.
    #[arg(long, default_value_t = 500)]
    pub follow_interval_ms: u64,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LogsArgs {
    /// Log file written by a previous `run` or `serve`.
    pub file: PathBuf,

    #[arg(short = 'n', long, default_value_t = scaffold_core::api::DEFAULT_LOG_LINES)]
    pub lines: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer JSON tool requests on stdin, one per line.
    Serve(ServeArgs),
    /// Start one app, follow its log until Ctrl-C, then stop it.
    Run(RunArgs),
    /// Print the last lines of a process log file.
    Logs(LogsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let args = Args::parse_from([
            "scaffold",
            "run",
            "./shop",
            "--port",
            "8080",
            "--no-install",
            "--log-dir",
            "/tmp/apps",
        ]);
        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.path, PathBuf::from("./shop"));
        assert_eq!(run.port, 8080);

        let mut cfg = RuntimeConfig::default();
        run.runtime.apply(&mut cfg);
        assert!(!cfg.install_dependencies);
        assert_eq!(cfg.log_dir.as_deref(), Some("/tmp/apps"));
        assert_eq!(cfg.health_timeout_ms, 30_000);
    }

    #[test]
    fn logs_defaults_to_fifty_lines() {
        let args = Args::parse_from(["scaffold", "logs", "app.log"]);
        let Commands::Logs(logs) = args.command else {
            panic!("expected logs");
        };
        assert_eq!(logs.lines, 50);

        let args = Args::parse_from(["scaffold", "--config", "c.toml", "logs", "app.log", "-n", "5"]);
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        let Commands::Logs(logs) = args.command else {
            panic!("expected logs");
        };
        assert_eq!(logs.lines, 5);
    }
}
