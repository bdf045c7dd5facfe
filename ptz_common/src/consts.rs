//! System-wide constants for the PTZ workspace.
//!
//! Single source of truth for speed limits, default paths and polling
//! intervals. Imported by all crates — no duplication permitted.

use std::time::Duration;

/// Lowest step speed the motor driver accepts [steps/s].
pub const MIN_SPEED: u32 = 10;

/// Highest step speed clients are allowed to command [steps/s].
pub const MAX_SPEED: u32 = 900;

/// Session speed before any set-speed request arrives [steps/s].
pub const DEFAULT_SPEED: u32 = 900;

/// Default motor character device path.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/motor";

/// Default Unix socket the daemon listens on.
pub const DEFAULT_SOCKET_PATH: &str = "/run/ptzd.sock";

/// Default PID file used for single-instance enforcement.
pub const DEFAULT_PID_PATH: &str = "/run/ptzd.pid";

/// Name of the POSIX shared memory object used as the stop flag.
pub const STOP_FLAG_NAME: &str = "/ptzd_stop";

/// Listen backlog requested for the daemon socket.
pub const SOCKET_BACKLOG: u32 = 5;

/// Sleep between busy-state polls while waiting for a move to finish.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sleep between device-open retries in the stop requester.
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long the daemon waits for a connected client to send its request.
pub const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);
