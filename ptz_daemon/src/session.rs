//! Session-scoped speed and inversion memory.
//!
//! Lives for the daemon's lifetime and dies with it; nothing here is
//! persisted. Only the dispatcher mutates it, in response to set-speed and
//! invert requests; every move reads it.

use ptz_common::consts::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED};
use ptz_common::types::{InversionFlags, InvertAxis};

/// Cross-request daemon state.
#[derive(Debug, Clone)]
pub struct SessionState {
    speed: u32,
    inversion: InversionFlags,
}

impl SessionState {
    /// Fresh session with the given starting speed and no inversion.
    pub fn new(default_speed: u32) -> Self {
        Self {
            speed: default_speed.clamp(MIN_SPEED, MAX_SPEED),
            inversion: InversionFlags::empty(),
        }
    }

    /// Sticky speed used when a move carries no explicit speed.
    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Store a new speed, capping silently into the driver's range.
    /// Out-of-range requests are a client habit, not a fault.
    ///
    /// Returns the value actually applied.
    pub fn set_speed(&mut self, requested: u32) -> u32 {
        self.speed = requested.clamp(MIN_SPEED, MAX_SPEED);
        self.speed
    }

    /// Flip the inversion bit(s) for the given axis. Toggling is relative:
    /// the same request twice restores the prior state.
    ///
    /// Returns the flags now in effect.
    pub fn toggle_inversion(&mut self, axis: InvertAxis) -> InversionFlags {
        self.inversion.toggle(axis.mask());
        self.inversion
    }

    /// Inversion flags currently in effect.
    pub fn inversion(&self) -> InversionFlags {
        self.inversion
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_speed_caps_at_the_maximum() {
        let mut session = SessionState::default();
        assert_eq!(session.set_speed(5000), MAX_SPEED);
        assert_eq!(session.speed(), MAX_SPEED);
    }

    #[test]
    fn set_speed_lifts_to_the_minimum() {
        let mut session = SessionState::default();
        assert_eq!(session.set_speed(1), MIN_SPEED);
    }

    #[test]
    fn set_speed_is_idempotent() {
        let mut session = SessionState::default();
        let first = session.set_speed(440);
        let second = session.set_speed(440);
        assert_eq!(first, second);
        assert_eq!(session.speed(), 440);
    }

    #[test]
    fn in_range_speeds_pass_through() {
        let mut session = SessionState::default();
        for v in [MIN_SPEED, 250, 500, MAX_SPEED] {
            assert_eq!(session.set_speed(v), v.min(MAX_SPEED));
        }
    }

    #[test]
    fn toggling_twice_restores_inversion() {
        let mut session = SessionState::default();
        for axis in [InvertAxis::X, InvertAxis::Y, InvertAxis::Both] {
            let before = session.inversion();
            session.toggle_inversion(axis);
            assert_ne!(session.inversion(), before);
            session.toggle_inversion(axis);
            assert_eq!(session.inversion(), before);
        }
    }

    #[test]
    fn new_session_clamps_its_default() {
        assert_eq!(SessionState::new(0).speed(), MIN_SPEED);
        assert_eq!(SessionState::new(u32::MAX).speed(), MAX_SPEED);
        assert_eq!(SessionState::default().speed(), DEFAULT_SPEED);
    }
}
