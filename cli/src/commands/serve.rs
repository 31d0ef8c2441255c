use std::sync::Arc;

use scaffold_core::api::{serve_lines, AppConfig, Dispatcher, Operator, ProcessManager, Registry};
use tokio::io::BufReader;

use crate::commands::cli::ServeArgs;
use crate::error::CliError;

/// Build the dispatcher a `serve` session runs with.
///
/// Actions are contributed by the embedding host; the stock binary starts
/// with an empty registry and only the process operations do work.
pub fn build_dispatcher(args: &ServeArgs, cfg: &AppConfig, registry: Registry) -> Dispatcher {
    let mut executor = cfg.executor.clone();
    if let Some(n) = args.max_parallel {
        executor.max_parallel = n;
    }
    let mut runtime = cfg.runtime.clone();
    args.runtime.apply(&mut runtime);

    Dispatcher::new(
        Operator::new(registry, executor),
        Arc::new(ProcessManager::new(runtime)),
    )
}

/// Handle serve command: JSON lines in on stdin, JSON lines out on stdout.
/// Every process started during the session is stopped on EOF or Ctrl-C.
pub async fn handle_serve(args: ServeArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let dispatcher = build_dispatcher(&args, cfg, Registry::new());
    tracing::info!(
        actions = dispatcher.operator().registry().len(),
        "serving tool requests on stdin"
    );

    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    let outcome = tokio::select! {
        res = serve_lines(&dispatcher, reader, writer) => Some(res),
        _ = tokio::signal::ctrl_c() => None,
    };

    let stopped = dispatcher.processes().stop_all().await;
    match outcome {
        Some(res) => {
            let handled = res?;
            tracing::info!(handled, stopped, "stdin closed, serve finished");
        }
        None => tracing::info!(stopped, "interrupted, serve finished"),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::RuntimeArgs;

    #[test]
    fn flags_override_loaded_config() {
        let args = ServeArgs {
            runtime: RuntimeArgs {
                log_dir: Some("/tmp/scaffold-test-logs".into()),
                no_install: true,
                health_timeout_ms: Some(1_000),
            },
            max_parallel: Some(3),
        };
        let d = build_dispatcher(&args, &AppConfig::default(), Registry::new());
        let runtime = d.processes().config();
        assert!(!runtime.install_dependencies);
        assert_eq!(runtime.health_timeout_ms, 1_000);
        assert_eq!(runtime.log_dir.as_deref(), Some("/tmp/scaffold-test-logs"));
        assert!(d.operator().registry().is_empty());
    }
}
