//! Hardware ioctl contract and the real device backend.
//!
//! This module is the only place that knows the motor driver's command
//! codes and argument struct shapes. Everything above it talks through the
//! [`MotorDevice`] trait, so the simulation backend and tests plug in
//! without touching hardware.
//!
//! The handle is exclusive: the driver admits a single opener, and open
//! failure is the observable signal that another process owns the motors.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use ptz_common::types::{MotorState, MotorStatus};

/// Errors for motor device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device handle was never acquired; no hardware call attempted.
    #[error("motor device not acquired")]
    Unavailable,

    /// Opening the character device failed.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Device path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An ioctl against the open handle failed.
    #[error("{op} ioctl failed: {source}")]
    Ioctl {
        /// Which operation was issued.
        op: &'static str,
        /// Underlying errno.
        source: nix::Error,
    },
}

/// Step deltas for the move ioctl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct MotorSteps {
    /// Pan steps (sign is direction).
    pub x: i32,
    /// Tilt steps (sign is direction).
    pub y: i32,
}

/// Reset payload. Zeroed before the call; the driver fills it in.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
struct MotorResetData {
    x_max_steps: u32,
    y_max_steps: u32,
    x_cur_step: u32,
    y_cur_step: u32,
}

/// Status block returned by the get-status ioctl.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
struct RawMotorMessage {
    x: i32,
    y: i32,
    state: u32,
    speed: i32,
    x_max_steps: u32,
    y_max_steps: u32,
}

/// Raw motor backend: one method per ioctl in the driver contract.
///
/// Implementations translate calls 1:1 to their backend and nothing more.
/// Inversion, delta computation and call ordering live in the motion
/// controller.
pub trait MotorDevice: Send {
    /// Halt motion immediately.
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Re-home the position counters.
    fn reset(&mut self) -> Result<(), DeviceError>;

    /// Step both axes by a signed delta.
    fn move_steps(&mut self, steps: MotorSteps) -> Result<(), DeviceError>;

    /// Write the speed register. Takes effect for the next move command.
    fn set_speed(&mut self, speed: u32) -> Result<(), DeviceError>;

    /// Return to the position held before the last move.
    fn go_back(&mut self) -> Result<(), DeviceError>;

    /// Run until stopped or a travel limit is hit.
    fn cruise(&mut self) -> Result<(), DeviceError>;

    /// Fresh status snapshot. Never cached by callers.
    fn status(&mut self) -> Result<MotorStatus, DeviceError>;
}

// ioctl command codes of the motor character driver. The driver predates
// the _IO() encoding convention, hence the `_bad` macro variants.
const MOTOR_STOP: u32 = 0x1;
const MOTOR_RESET: u32 = 0x2;
const MOTOR_MOVE: u32 = 0x3;
const MOTOR_GET_STATUS: u32 = 0x4;
const MOTOR_SPEED: u32 = 0x5;
const MOTOR_GOBACK: u32 = 0x6;
const MOTOR_CRUISE: u32 = 0x7;

mod ioctls {
    use super::{
        MOTOR_CRUISE, MOTOR_GET_STATUS, MOTOR_GOBACK, MOTOR_MOVE, MOTOR_RESET, MOTOR_SPEED,
        MOTOR_STOP, MotorResetData, MotorSteps, RawMotorMessage,
    };

    nix::ioctl_none_bad!(motor_stop, MOTOR_STOP);
    nix::ioctl_readwrite_bad!(motor_reset, MOTOR_RESET, MotorResetData);
    nix::ioctl_write_ptr_bad!(motor_move, MOTOR_MOVE, MotorSteps);
    nix::ioctl_read_bad!(motor_get_status, MOTOR_GET_STATUS, RawMotorMessage);
    nix::ioctl_write_ptr_bad!(motor_speed, MOTOR_SPEED, libc::c_int);
    nix::ioctl_none_bad!(motor_goback, MOTOR_GOBACK);
    nix::ioctl_none_bad!(motor_cruise, MOTOR_CRUISE);
}

/// Real motor backend over the character device.
#[derive(Debug)]
pub struct IoctlMotor {
    file: File,
}

impl IoctlMotor {
    /// Acquire the device handle.
    ///
    /// # Errors
    /// Returns `DeviceError::Open` when the device cannot be opened, most
    /// commonly because another process already holds it.
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = File::open(path).map_err(|source| DeviceError::Open {
            path: path.to_owned(),
            source,
        })?;
        debug!(path = %path.display(), fd = file.as_raw_fd(), "motor device acquired");
        Ok(Self { file })
    }

    fn ioctl_err(op: &'static str) -> impl FnOnce(nix::Error) -> DeviceError {
        move |source| DeviceError::Ioctl { op, source }
    }
}

impl MotorDevice for IoctlMotor {
    fn stop(&mut self) -> Result<(), DeviceError> {
        unsafe { ioctls::motor_stop(self.file.as_raw_fd()) }
            .map_err(Self::ioctl_err("stop"))
            .map(drop)
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        // The driver only performs the reset when the payload arrives
        // zeroed; it writes the fresh counters back into it.
        let mut data = MotorResetData::default();
        unsafe { ioctls::motor_reset(self.file.as_raw_fd(), &mut data) }
            .map_err(Self::ioctl_err("reset"))
            .map(drop)
    }

    fn move_steps(&mut self, steps: MotorSteps) -> Result<(), DeviceError> {
        unsafe { ioctls::motor_move(self.file.as_raw_fd(), &steps) }
            .map_err(Self::ioctl_err("move"))
            .map(drop)
    }

    fn set_speed(&mut self, speed: u32) -> Result<(), DeviceError> {
        let raw = speed as libc::c_int;
        unsafe { ioctls::motor_speed(self.file.as_raw_fd(), &raw) }
            .map_err(Self::ioctl_err("speed"))
            .map(drop)
    }

    fn go_back(&mut self) -> Result<(), DeviceError> {
        unsafe { ioctls::motor_goback(self.file.as_raw_fd()) }
            .map_err(Self::ioctl_err("go-back"))
            .map(drop)
    }

    fn cruise(&mut self) -> Result<(), DeviceError> {
        unsafe { ioctls::motor_cruise(self.file.as_raw_fd()) }
            .map_err(Self::ioctl_err("cruise"))
            .map(drop)
    }

    fn status(&mut self) -> Result<MotorStatus, DeviceError> {
        let mut raw = RawMotorMessage::default();
        unsafe { ioctls::motor_get_status(self.file.as_raw_fd(), &mut raw) }
            .map_err(Self::ioctl_err("get-status"))?;
        Ok(MotorStatus {
            x: raw.x,
            y: raw.y,
            state: MotorState::from_wire(raw.state),
            speed: raw.speed.max(0) as u32,
            x_max_steps: raw.x_max_steps,
            y_max_steps: raw.y_max_steps,
            inversion: Default::default(),
        })
    }
}
