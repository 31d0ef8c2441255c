use chrono::{DateTime, Local};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;

#[derive(Debug)]
pub struct LogLine {
    pub line: String,
    pub stream: LogStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl LogStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// `[<timestamp>] [<stream>] <content>`
pub fn format_log_line(at: DateTime<Local>, stream: LogStream, line: &str) -> String {
    format!(
        "[{}] [{}] {}\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        stream.as_str(),
        line
    )
}

/// Single owner of a log sink. Every pump sends through `rx`, so lines from
/// different streams never interleave. Ends once all senders are dropped.
pub fn spawn_log_writer<W>(mut wr: W, mut rx: mpsc::Receiver<LogLine>) -> JoinHandle<Result<u64, RuntimeError>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut written = 0u64;
        while let Some(tap) = rx.recv().await {
            let formatted = format_log_line(Local::now(), tap.stream, &tap.line);
            wr.write_all(formatted.as_bytes()).await?;
            written += 1;
        }
        wr.flush().await?;
        wr.shutdown().await?;
        Ok(written)
    })
}

pub fn pump_stdout<R>(rd: R, line_tx: mpsc::Sender<LogLine>, cancel: CancellationToken) -> JoinHandle<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pump(rd, line_tx, cancel, LogStream::Stdout)
}

pub fn pump_stderr<R>(rd: R, line_tx: mpsc::Sender<LogLine>, cancel: CancellationToken) -> JoinHandle<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pump(rd, line_tx, cancel, LogStream::Stderr)
}

/// Longest line kept in memory; longer output is logged in pieces.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Split a child stream into lines and forward them until EOF or cancellation.
/// Data already readable is drained before cancellation is honoured.
fn pump<R>(mut rd: R, line_tx: mpsc::Sender<LogLine>, cancel: CancellationToken, stream: LogStream) -> JoinHandle<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut lines = 0u64;
        let mut line_buf: Vec<u8> = Vec::with_capacity(8 * 1024);

        loop {
            let n = tokio::select! {
                biased;
                read = rd.read(&mut buf) => match read {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::debug!(stream = stream.as_str(), error = %e, "log stream read failed");
                        0
                    }
                },
                _ = cancel.cancelled() => break,
            };
            if n == 0 {
                break;
            }

            line_buf.extend_from_slice(&buf[..n]);
            loop {
                // Overlong lines are cut at the cap rather than buffered whole.
                let one = match line_buf.iter().position(|&b| b == b'\n') {
                    Some(pos) if pos <= MAX_LINE_BYTES => {
                        let mut one = line_buf.drain(..=pos).collect::<Vec<u8>>();
                        trim_newline(&mut one);
                        one
                    }
                    _ if line_buf.len() >= MAX_LINE_BYTES => {
                        line_buf.drain(..MAX_LINE_BYTES).collect::<Vec<u8>>()
                    }
                    _ => break,
                };
                let line = String::from_utf8_lossy(&one).to_string();
                if line_tx.send(LogLine { line, stream }).await.is_err() {
                    return lines;
                }
                lines += 1;
            }
        }

        // Deliver the last partial line if it doesn't end with '\n'.
        trim_newline(&mut line_buf);
        if !line_buf.is_empty() {
            let line = String::from_utf8_lossy(&line_buf).to_string();
            if line_tx.send(LogLine { line, stream }).await.is_ok() {
                lines += 1;
            }
        }

        lines
    })
}

fn trim_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn flushes_last_line_without_newline_on_eof() {
        let (mut wr, rd) = tokio::io::duplex(1024);
        let (tx, mut rx) = mpsc::channel::<LogLine>(8);

        let task = pump_stdout(rd, tx, CancellationToken::new());

        wr.write_all(b"first\r\nhello").await.unwrap();
        drop(wr);

        let tap = rx.recv().await.expect("expected first line");
        assert_eq!(tap.line, "first");
        let tap = rx.recv().await.expect("expected partial line");
        assert_eq!(tap.line, "hello");
        assert_eq!(tap.stream, LogStream::Stdout);

        assert_eq!(task.await.unwrap(), 2);
    }

    #[tokio::test]
    async fn overlong_line_is_split_at_the_cap() {
        let (mut wr, rd) = tokio::io::duplex(16 * 1024);
        let (tx, mut rx) = mpsc::channel::<LogLine>(8);
        let task = pump_stdout(rd, tx, CancellationToken::new());

        let writer = tokio::spawn(async move {
            let blob = vec![b'x'; 2 * MAX_LINE_BYTES + 10];
            wr.write_all(&blob).await.unwrap();
            wr.write_all(b"\nend\n").await.unwrap();
        });

        let mut got = Vec::new();
        while let Some(tap) = rx.recv().await {
            got.push(tap.line.len());
            if tap.line == "end" {
                break;
            }
        }
        writer.await.unwrap();

        assert_eq!(got, vec![MAX_LINE_BYTES, MAX_LINE_BYTES, 10, 3]);
        assert_eq!(task.await.unwrap(), 4);
    }

    #[tokio::test]
    async fn cancellation_stops_an_idle_pump() {
        let (_wr, rd) = tokio::io::duplex(64);
        let (tx, _rx) = mpsc::channel::<LogLine>(8);
        let cancel = CancellationToken::new();

        let task = pump_stderr(rd, tx, cancel.clone());
        cancel.cancel();

        let lines = tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("pump should stop on cancel")
            .unwrap();
        assert_eq!(lines, 0);
    }

    #[tokio::test]
    async fn writer_prefixes_and_serializes_lines() {
        let (tx, rx) = mpsc::channel::<LogLine>(8);
        let (sink, mut out) = tokio::io::duplex(4096);
        let writer = spawn_log_writer(sink, rx);

        tx.send(LogLine { line: "ready".into(), stream: LogStream::Stdout }).await.unwrap();
        tx.send(LogLine { line: "warn".into(), stream: LogStream::Stderr }).await.unwrap();
        drop(tx);

        assert_eq!(writer.await.unwrap().unwrap(), 2);

        let mut text = String::new();
        out.read_to_string(&mut text).await.unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] [stdout] ready"));
        assert!(lines[1].ends_with("] [stderr] warn"));
    }

    #[test]
    fn line_format() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        assert_eq!(
            format_log_line(at, LogStream::Stderr, "boom"),
            "[2024-05-01 09:30:00] [stderr] boom\n"
        );
    }
}
