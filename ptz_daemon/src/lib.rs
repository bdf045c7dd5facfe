//! PTZ session daemon internals.
//!
//! The daemon owns the motor character device and serializes access to it
//! for short-lived clients talking over a Unix socket.
//!
//! # Module Structure
//!
//! - [`device`] - Hardware ioctl contract and the real backend
//! - [`sim`] - Simulation backend for development and tests
//! - [`motion`] - Typed motion facade (inversion, ordering, busy-wait)
//! - [`session`] - Daemon-lifetime speed and inversion memory
//! - [`dispatch`] - One handler per request command
//! - [`server`] - Accept loop and per-request error policy
//! - [`pidfile`] - Single-instance enforcement

pub mod device;
pub mod dispatch;
pub mod motion;
pub mod pidfile;
pub mod server;
pub mod session;
pub mod sim;
