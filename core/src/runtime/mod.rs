//! Local process runtime: detect, install, spawn, health-check, log and stop
//! scaffolded applications.

mod detect;
mod group;
mod health;
mod io_pump;
mod logs;
mod manager;
mod port;
mod process;

pub use detect::{detect_app_kind, run_install, AppKind, InstallPlan};
pub use health::{HealthOutcome, HealthProbe};
pub use io_pump::{
    format_log_line, pump_stderr, pump_stdout, spawn_log_writer, LogLine, LogStream, MAX_LINE_BYTES,
};
pub use logs::{read_log_tail, tail_logs, NO_LOGS_YET};
pub use manager::ProcessManager;
pub use port::{allocate_port, find_free_port, is_port_free};
pub use process::{Process, ProcessInfo, ProcessState};
