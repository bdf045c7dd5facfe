//! PID-file based single-instance enforcement.
//!
//! A second daemon instance would race the first for the motor device and
//! the request socket, so startup claims a PID file first. A file whose
//! recorded process is still alive means "refuse to start"; a stale file
//! (dead process, unclean shutdown) is reclaimed silently.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Errors while claiming the PID file.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// Another live daemon holds the PID file.
    #[error("daemon already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the file.
        pid: i32,
    },

    /// Reading or writing the file itself failed.
    #[error("pid file {path}: {source}")]
    Io {
        /// PID file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Claimed PID file. Removed again on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Claim the PID file for this process.
    ///
    /// # Errors
    /// - `AlreadyRunning` when the recorded process is still alive
    /// - `Io` when the file cannot be written
    pub fn acquire(path: &Path) -> Result<Self, PidFileError> {
        if let Some(pid) = read_pid(path) {
            if is_process_alive(pid) {
                return Err(PidFileError::AlreadyRunning { pid });
            }
            debug!(pid, "reclaiming stale pid file");
        }

        std::fs::write(path, format!("{}\n", std::process::id())).map_err(|source| {
            PidFileError::Io {
                path: path.to_owned(),
                source,
            }
        })?;
        info!(path = %path.display(), pid = std::process::id(), "pid file claimed");
        Ok(Self {
            path: path.to_owned(),
        })
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), "pid file cleanup failed: {e}");
        }
    }
}

/// Parse the recorded PID, if the file exists and holds one.
fn read_pid(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Check whether a process is alive using `kill(pid, 0)`.
fn is_process_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // A null signal tests for existence without delivering anything.
    match kill(Pid::from_raw(pid), None) {
        Ok(_) => true,
        Err(nix::Error::ESRCH) => false, // No such process
        Err(nix::Error::EPERM) => true,  // Exists, owned by someone else
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// PID of a process that has already exited and been reaped.
    fn dead_pid() -> i32 {
        let mut child = std::process::Command::new("true")
            .spawn()
            .expect("spawn helper");
        let pid = child.id() as i32;
        child.wait().expect("reap helper");
        pid
    }

    #[test]
    fn acquire_writes_our_pid_and_drop_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptzd.pid");

        let pidfile = PidFile::acquire(&path).unwrap();
        assert_eq!(read_pid(&path), Some(std::process::id() as i32));

        drop(pidfile);
        assert!(!path.exists());
    }

    #[test]
    fn live_pid_refuses_a_second_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptzd.pid");
        // Our own test process is very much alive.
        std::fs::write(&path, format!("{}\n", std::process::id())).unwrap();

        let err = PidFile::acquire(&path).unwrap_err();
        assert!(matches!(err, PidFileError::AlreadyRunning { .. }));
    }

    #[test]
    fn stale_pid_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptzd.pid");
        std::fs::write(&path, format!("{}\n", dead_pid())).unwrap();

        let _pidfile = PidFile::acquire(&path).unwrap();
        assert_eq!(read_pid(&path), Some(std::process::id() as i32));
    }

    #[test]
    fn garbage_content_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptzd.pid");
        std::fs::write(&path, "not-a-pid\n").unwrap();

        assert!(PidFile::acquire(&path).is_ok());
    }
}
