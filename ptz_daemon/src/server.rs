//! Unix-socket transport: accept loop and per-request error policy.
//!
//! One listener, strictly sequential service: accept a connection, read
//! one request frame, dispatch it to completion, write one reply frame
//! (query commands only), close, and only then accept the next client.
//! Requests are therefore served in connection-accept order, never
//! interleaved.
//!
//! Per-request failures (malformed frames, client hangups, device errors)
//! are logged and the daemon keeps serving. Only listener-level failures
//! are fatal.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use ptz_common::consts::REQUEST_READ_TIMEOUT;
use ptz_common::protocol;

use crate::dispatch::Dispatcher;

/// Sleep between accept polls while idle.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Listener-level transport errors. All of these are fatal to the daemon.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Binding the request socket failed.
    #[error("failed to bind {path}: {source}")]
    Bind {
        /// Socket path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The accept call failed in a non-retryable way.
    #[error("fatal accept failure: {0}")]
    Accept(io::Error),
}

/// Request socket server.
pub struct Server {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl Server {
    /// Bind the request socket, replacing any stale socket file.
    ///
    /// The PID file already guarantees no live daemon owns a leftover
    /// socket, so an existing file is debris from an unclean shutdown.
    pub fn bind(path: &Path) -> Result<Self, TransportError> {
        let bind_err = |source| TransportError::Bind {
            path: path.to_owned(),
            source,
        };

        if path.exists() {
            debug!(path = %path.display(), "removing stale socket file");
            std::fs::remove_file(path).map_err(bind_err)?;
        }
        let listener = UnixListener::bind(path).map_err(bind_err)?;
        // Non-blocking accepts let the serve loop notice shutdown requests.
        listener.set_nonblocking(true).map_err(bind_err)?;

        info!(path = %path.display(), "listening for requests");
        Ok(Self {
            listener,
            socket_path: path.to_owned(),
        })
    }

    /// Path the server is bound to.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serve until `running` goes false.
    ///
    /// # Errors
    /// Returns `TransportError::Accept` on a fatal listener failure;
    /// everything below the listener is logged and survived.
    pub fn serve(
        &self,
        dispatcher: &mut Dispatcher,
        running: &AtomicBool,
    ) -> Result<(), TransportError> {
        while running.load(Ordering::SeqCst) {
            let stream = match self.listener.accept() {
                Ok((stream, _addr)) => stream,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Accept(e)),
            };
            handle_connection(stream, dispatcher);
        }
        info!("serve loop stopped");
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            debug!(path = %self.socket_path.display(), "socket cleanup failed: {e}");
        }
    }
}

/// Serve a single connection. Never fatal.
fn handle_connection(mut stream: UnixStream, dispatcher: &mut Dispatcher) {
    // The accepted stream must block again (reads would otherwise spin),
    // but a dead client gets a bounded wait, not a wedged daemon.
    if let Err(e) = stream.set_nonblocking(false) {
        warn!("failed to restore blocking mode: {e}");
        return;
    }
    if let Err(e) = stream.set_read_timeout(Some(REQUEST_READ_TIMEOUT)) {
        warn!("failed to set read timeout: {e}");
    }

    let request = match protocol::read_request(&mut stream) {
        Ok(request) => request,
        Err(e) => {
            warn!("discarding request: {e}");
            return;
        }
    };
    debug!(command = ?request.command, "request accepted");

    match dispatcher.dispatch(&request) {
        Ok(Some(status)) => {
            if let Err(e) = protocol::write_reply(&mut stream, &status) {
                warn!("failed to write reply: {e}");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(command = ?request.command, "request failed: {e}"),
    }
    // One request per connection: closing happens on drop.
}
