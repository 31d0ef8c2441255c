use std::path::Path;

use crate::error::RuntimeError;

pub const NO_LOGS_YET: &str = "no logs available yet";

/// Last `n` lines of a log file, in file order.
pub async fn read_log_tail(path: &Path, n: usize) -> Result<Vec<String>, RuntimeError> {
    let bytes = tokio::fs::read(path).await?;
    let text = String::from_utf8_lossy(&bytes);

    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(n);
    Ok(all[start..].iter().map(|l| l.to_string()).collect())
}

/// Human-readable tail: the last `n` lines joined by newlines, a sentinel for
/// an empty log, or the read error rendered as text.
pub async fn tail_logs(path: &Path, n: usize) -> String {
    let is_empty = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len() == 0,
        Err(e) => return format!("Error reading logs: {e}"),
    };
    if is_empty {
        return NO_LOGS_YET.to_string();
    }

    match read_log_tail(path, n).await {
        Ok(lines) => lines.join("\n"),
        Err(e) => format!("Error reading logs: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn empty_log_returns_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        tokio::fs::write(&path, "").await.unwrap();

        assert_eq!(tail_logs(&path, 10).await, NO_LOGS_YET);
    }

    #[tokio::test]
    async fn returns_last_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let body: String = (1..=5).map(|i| format!("line {i}\n")).collect();
        tokio::fs::write(&path, body).await.unwrap();

        assert_eq!(tail_logs(&path, 2).await, "line 4\nline 5");
        assert_eq!(read_log_tail(&path, 50).await.unwrap().len(), 5);
        assert!(read_log_tail(&path, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_reported_inline() {
        let dir = tempfile::tempdir().unwrap();
        let out = tail_logs(&dir.path().join("missing.log"), 5).await;
        assert!(out.starts_with("Error reading logs: "), "{out}");
        assert!(read_log_tail(&dir.path().join("missing.log"), 5).await.is_err());
    }
}
