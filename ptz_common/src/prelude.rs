//! Prelude module for common re-exports.
//!
//! `use ptz_common::prelude::*;` pulls in the types both binaries touch on
//! nearly every code path.

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, DaemonConfig};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED};

// ─── Wire protocol ──────────────────────────────────────────────────
pub use crate::protocol::{Command, MoveType, ProtocolError, Request};

// ─── Status & inversion ─────────────────────────────────────────────
pub use crate::types::{InversionFlags, InvertAxis, MotorState, MotorStatus};

// ─── Stop signal ────────────────────────────────────────────────────
pub use crate::stopflag::{StopFlag, StopFlagError};
