#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scaffold_core::api::{
    handler_fn, Action, Category, InputSpec, OutputSpec, Registry, RuntimeConfig, ValueMap,
    ValueType,
};
use serde_json::json;

/// Shared log of action start/finish events, in the order they happened.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// An action that records `start:<name>` / `end:<name>`, sleeps, then emits
/// `outputs`.
pub fn journaled(
    name: &str,
    category: Category,
    delay_ms: u64,
    outputs: &[(&str, serde_json::Value)],
    journal: &Journal,
) -> Action {
    let label = name.to_string();
    let outputs: ValueMap = outputs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    let journal = journal.clone();

    Action::new(
        name,
        format!("{name} (test double)"),
        category,
        handler_fn(move |_ctx, _inputs| {
            let label = label.clone();
            let outputs = outputs.clone();
            let journal = journal.clone();
            async move {
                journal.lock().unwrap().push(format!("start:{label}"));
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                journal.lock().unwrap().push(format!("end:{label}"));
                Ok(outputs)
            }
        }),
    )
}

/// Registry shaped like a typical web-app scaffolding flow.
pub fn scaffolding_registry(journal: &Journal) -> Registry {
    let mut registry = Registry::new();

    registry
        .register(
            journaled(
                "create_web_app",
                Category::Create,
                40,
                &[("app_path", json!("/tmp/shop"))],
                journal,
            )
            .input(InputSpec::new("name", ValueType::String).required())
            .output(OutputSpec::new("app_path", ValueType::String))
            .with_tags(["web", "nextjs"]),
        )
        .unwrap();
    registry
        .register(
            journaled(
                "setup_postgres",
                Category::Setup,
                10,
                &[("database_url", json!("postgres://localhost/shop"))],
                journal,
            )
            .conflicts_with("setup_sqlite")
            .with_tags(["database"]),
        )
        .unwrap();
    registry
        .register(
            journaled(
                "setup_sqlite",
                Category::Setup,
                10,
                &[("database_url", json!("file:shop.db"))],
                journal,
            )
            .conflicts_with("setup_postgres")
            .with_tags(["database"]),
        )
        .unwrap();
    registry
        .register(
            journaled("add_auth", Category::Add, 5, &[("auth", json!("jwt"))], journal)
                .depends_on("create_web_app")
                .depends_on("setup_postgres")
                .input(InputSpec::new("app_path", ValueType::String).required()),
        )
        .unwrap();
    registry
        .register(
            journaled("deploy", Category::Deploy, 5, &[("url", json!("https://shop.example"))], journal)
                .depends_on("add_auth"),
        )
        .unwrap();

    registry
}

pub fn position(journal: &Journal, event: &str) -> usize {
    journal
        .lock()
        .unwrap()
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("missing journal event {event}"))
}

/// Runtime settings tuned for tests: short timeouts, logs under `log_dir`.
pub fn test_runtime_config(log_dir: &Path, health_timeout_ms: u64) -> RuntimeConfig {
    RuntimeConfig {
        log_dir: Some(log_dir.to_string_lossy().to_string()),
        health_timeout_ms,
        health_interval_ms: 50,
        probe_timeout_ms: 500,
        install_dependencies: false,
        stop_grace_ms: 2_000,
        ..RuntimeConfig::default()
    }
}

pub fn has_binary(name: &str) -> bool {
    std::process::Command::new(name)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
