//! Cross-process stop signal backed by a named POSIX shared memory object.
//!
//! The motor device handle cannot be shared between processes, so a process
//! that wants to interrupt motion driven by someone else has exactly one
//! channel: a system-visible object both sides know by name. The flag
//! carries no payload: presence means "a stop was requested".
//!
//! Both lifecycle operations are idempotent so that two processes can race
//! on either side:
//! - [`StopFlag::ensure_present`] succeeds when the object already exists.
//! - [`StopFlag::ensure_absent`] succeeds when the object is already gone.

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use thiserror::Error;
use tracing::debug;

use crate::consts::STOP_FLAG_NAME;

/// Size given to the backing object. The content is never read.
const FLAG_SIZE: i64 = 1;

/// Errors from the underlying shared memory calls.
///
/// `ENOENT`/`EEXIST` never surface here; those are the expected race
/// outcomes the operations absorb.
#[derive(Debug, Error)]
pub enum StopFlagError {
    /// A shm call failed for a reason other than presence/absence.
    #[error("stop flag {name}: {source}")]
    Shm {
        /// Object name.
        name: String,
        /// Underlying errno.
        source: Errno,
    },
}

/// Handle on the named stop flag.
///
/// Holds no OS resources; every operation re-opens the object by name, so
/// clones and copies across processes are all equivalent.
#[derive(Debug, Clone)]
pub struct StopFlag {
    name: String,
}

impl StopFlag {
    /// Flag under a caller-chosen name (tests use per-process names).
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Object name this flag operates on.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raise the flag. Idempotent: an already-present flag is success.
    pub fn ensure_present(&self) -> Result<(), StopFlagError> {
        let fd = shm_open(
            self.name.as_str(),
            OFlag::O_CREAT | OFlag::O_RDWR,
            Mode::from_bits_truncate(0o666),
        )
        .map_err(|e| self.error(e))?;
        // Give the object a real size; some tools refuse zero-length shm.
        let _ = ftruncate(&fd, FLAG_SIZE);
        debug!(name = %self.name, "stop flag raised");
        Ok(())
    }

    /// Clear the flag. Idempotent: an already-absent flag is success.
    pub fn ensure_absent(&self) -> Result<(), StopFlagError> {
        match shm_unlink(self.name.as_str()) {
            Ok(()) => {
                debug!(name = %self.name, "stop flag cleared");
                Ok(())
            }
            Err(Errno::ENOENT) => Ok(()),
            Err(e) => Err(self.error(e)),
        }
    }

    /// Check for the flag without touching it.
    pub fn is_present(&self) -> Result<bool, StopFlagError> {
        match shm_open(self.name.as_str(), OFlag::O_RDONLY, Mode::empty()) {
            Ok(_fd) => Ok(true),
            Err(Errno::ENOENT) => Ok(false),
            Err(e) => Err(self.error(e)),
        }
    }

    fn error(&self, source: Errno) -> StopFlagError {
        StopFlagError::Shm {
            name: self.name.clone(),
            source,
        }
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new(STOP_FLAG_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Per-test flag name so parallel test runs stay disjoint.
    fn test_flag(tag: &str) -> StopFlag {
        let flag = StopFlag::new(format!("/ptzd_test_{}_{}", tag, std::process::id()));
        flag.ensure_absent().unwrap();
        flag
    }

    #[test]
    fn raise_check_clear_cycle() {
        let flag = test_flag("cycle");
        assert!(!flag.is_present().unwrap());

        flag.ensure_present().unwrap();
        assert!(flag.is_present().unwrap());

        flag.ensure_absent().unwrap();
        assert!(!flag.is_present().unwrap());
    }

    #[test]
    fn double_raise_is_idempotent() {
        let flag = test_flag("raise2");
        flag.ensure_present().unwrap();
        flag.ensure_present().unwrap();
        assert!(flag.is_present().unwrap());
        flag.ensure_absent().unwrap();
    }

    #[test]
    fn double_clear_is_a_noop() {
        let flag = test_flag("clear2");
        flag.ensure_present().unwrap();
        flag.ensure_absent().unwrap();
        flag.ensure_absent().unwrap();
        assert!(!flag.is_present().unwrap());
    }

    #[test]
    fn default_flag_uses_the_wellknown_name() {
        assert_eq!(StopFlag::default().name(), STOP_FLAG_NAME);
    }
}
