//! Motor status and axis-inversion types.
//!
//! These types cross the daemon/client boundary: the daemon fills a
//! [`MotorStatus`] from the device (stamping the session's inversion flags
//! on the way out), the client decodes it from the reply frame.

use bitflags::bitflags;

bitflags! {
    /// Per-axis sign-flip flags.
    ///
    /// An inverted axis has its commanded step/delta value negated before
    /// it reaches the hardware, compensating for reversed motor wiring or
    /// an upside-down mount. The device itself never sees these flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InversionFlags: u32 {
        /// Negate commanded X steps.
        const INVERT_X = 0x1;
        /// Negate commanded Y steps.
        const INVERT_Y = 0x2;
    }
}

impl Default for InversionFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Axis selector for inversion toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvertAxis {
    /// Pan axis only.
    X,
    /// Tilt axis only.
    Y,
    /// Both axes at once.
    Both,
}

impl InvertAxis {
    /// Flag mask this selector toggles.
    #[inline]
    pub const fn mask(self) -> InversionFlags {
        match self {
            Self::X => InversionFlags::INVERT_X,
            Self::Y => InversionFlags::INVERT_Y,
            Self::Both => InversionFlags::all(),
        }
    }
}

/// Motion state reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorState {
    /// Both motors at rest.
    #[default]
    Idle,
    /// At least one motor is stepping.
    Moving,
}

impl MotorState {
    /// Decode from the wire/ioctl representation. Nonzero means moving.
    #[inline]
    pub const fn from_wire(value: u32) -> Self {
        if value == 0 { Self::Idle } else { Self::Moving }
    }

    /// Wire/ioctl representation (0 idle, 1 moving).
    #[inline]
    pub const fn as_wire(self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::Moving => 1,
        }
    }
}

/// Snapshot of the motor pair, produced on demand and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotorStatus {
    /// Current absolute pan position [steps].
    pub x: i32,
    /// Current absolute tilt position [steps].
    pub y: i32,
    /// Motion state.
    pub state: MotorState,
    /// Currently commanded speed [steps/s].
    pub speed: u32,
    /// Pan travel limit [steps].
    pub x_max_steps: u32,
    /// Tilt travel limit [steps].
    pub y_max_steps: u32,
    /// Session inversion flags, stamped by the dispatcher.
    pub inversion: InversionFlags,
}

impl MotorStatus {
    /// True while the device reports a move in progress.
    #[inline]
    pub const fn is_moving(&self) -> bool {
        matches!(self.state, MotorState::Moving)
    }
}
