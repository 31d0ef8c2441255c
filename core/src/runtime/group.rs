//! Process-group teardown.
//!
//! Apps are spawned as leaders of their own process group so wrapper
//! processes (`sh -c`, `npm run`, `go run`) and the servers they start can
//! be killed together.

/// Send SIGKILL to every member of the group led by `pid`. A group with no
/// members left is not an error.
#[cfg(unix)]
pub(crate) fn kill_process_group(pid: u32) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pid)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("pid {pid} out of range")))?;
    if pgid <= 1 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("refusing to signal process group {pgid}"),
        ));
    }

    // SAFETY: FFI call to libc::killpg; it only sends a signal.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_process_group(_pid: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn kills_children_of_the_group_leader() {
        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg("sleep 30 & wait")
            .stdout(std::process::Stdio::piped())
            .process_group(0)
            .kill_on_drop(true)
            .spawn()
            .unwrap();
        let leader = child.id().unwrap();
        let mut stdout = child.stdout.take().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        kill_process_group(leader).unwrap();
        child.wait().await.unwrap();

        // The background sleeper shares the pipe; EOF means it is gone too.
        let mut rest = Vec::new();
        let eof = tokio::time::timeout(Duration::from_secs(5), stdout.read_to_end(&mut rest)).await;
        assert!(eof.is_ok(), "a group member still holds stdout open");

        kill_process_group(leader).unwrap();
    }

    #[test]
    fn refuses_init_and_own_group() {
        assert!(kill_process_group(0).is_err());
        assert!(kill_process_group(1).is_err());
    }
}
