use scaffold_core::api::{read_log_tail, NO_LOGS_YET};

use crate::commands::cli::LogsArgs;
use crate::error::CliError;

/// Handle logs command
pub async fn handle_logs(args: LogsArgs) -> Result<i32, CliError> {
    let lines = read_log_tail(&args.file, args.lines).await?;
    if lines.is_empty() {
        eprintln!("{NO_LOGS_YET}");
        return Ok(0);
    }
    for line in lines {
        println!("{line}");
    }
    Ok(0)
}
