//! Typed motion facade over the raw device contract.
//!
//! Everything the dispatcher asks for goes through here: axis inversion is
//! applied exactly once at this boundary, absolute targets become step
//! deltas from a fresh status read, and the driver's speed-before-move
//! call ordering is enforced in one place.
//!
//! The controller also runs the busy-wait that follows a move. The driver
//! offers no blocking completion call, so waiting means polling the status
//! and watching for the cross-process stop flag.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use ptz_common::stopflag::StopFlag;
use ptz_common::types::{InversionFlags, MotorStatus};

use crate::device::{DeviceError, MotorDevice, MotorSteps};

/// How a busy-wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The device reported idle.
    Completed,
    /// The stop flag appeared; the wait was abandoned early.
    Stopped,
}

/// Motion controller owning the (possibly unacquired) device handle.
pub struct MotionController {
    device: Option<Box<dyn MotorDevice>>,
    poll_interval: Duration,
}

impl MotionController {
    /// Wrap a device handle. `None` models "another process owns the
    /// motors": every operation except [`reset`](Self::reset) then fails
    /// fast with [`DeviceError::Unavailable`].
    pub fn new(device: Option<Box<dyn MotorDevice>>, poll_interval: Duration) -> Self {
        Self {
            device,
            poll_interval,
        }
    }

    /// Whether the device handle was acquired.
    pub fn acquired(&self) -> bool {
        self.device.is_some()
    }

    fn device(&mut self) -> Result<&mut (dyn MotorDevice + '_), DeviceError> {
        match self.device.as_deref_mut() {
            Some(device) => Ok(device as &mut (dyn MotorDevice + '_)),
            None => Err(DeviceError::Unavailable),
        }
    }

    /// Re-home the position counters. Safe to call at any time; without a
    /// device handle this is a logged no-op rather than an error.
    pub fn reset(&mut self) -> Result<(), DeviceError> {
        match self.device.as_deref_mut() {
            Some(device) => device.reset(),
            None => {
                debug!("reset skipped, no device handle");
                Ok(())
            }
        }
    }

    /// Relative move. Inverted axes have their delta negated here, before
    /// anything reaches the driver.
    pub fn move_steps(
        &mut self,
        dx: i32,
        dy: i32,
        speed: u32,
        inversion: InversionFlags,
    ) -> Result<(), DeviceError> {
        let steps = apply_inversion(dx, dy, inversion);
        let device = self.device()?;
        // The driver latches the speed register when the move command
        // arrives, so the speed write must come first.
        device.set_speed(speed)?;
        debug!(dx = steps.x, dy = steps.y, speed, "starting relative move");
        device.move_steps(steps)
    }

    /// Absolute move: a fresh status read turns the target into deltas.
    pub fn set_position(
        &mut self,
        x: i32,
        y: i32,
        speed: u32,
        inversion: InversionFlags,
    ) -> Result<(), DeviceError> {
        let current = self.device()?.status()?;
        let (dx, dy) = (x - current.x, y - current.y);
        debug!(
            from_x = current.x,
            from_y = current.y,
            to_x = x,
            to_y = y,
            "starting absolute move"
        );
        self.move_steps(dx, dy, speed, inversion)
    }

    /// Halt motion immediately.
    pub fn stop(&mut self) -> Result<(), DeviceError> {
        self.device()?.stop()
    }

    /// Run until stopped or a travel limit is hit.
    pub fn cruise(&mut self) -> Result<(), DeviceError> {
        self.device()?.cruise()
    }

    /// Return to the position held before the last move.
    pub fn go_back(&mut self) -> Result<(), DeviceError> {
        self.device()?.go_back()
    }

    /// Write the speed register without moving.
    pub fn set_speed(&mut self, speed: u32) -> Result<(), DeviceError> {
        self.device()?.set_speed(speed)
    }

    /// Fresh status snapshot.
    pub fn status(&mut self) -> Result<MotorStatus, DeviceError> {
        self.device()?.status()
    }

    /// Busy-wait until the device reports idle or the stop flag appears.
    ///
    /// The flag is consumed on exit either way: acting on it removes it,
    /// and a flag left behind by a stop nobody waited on must not cancel
    /// the next move.
    pub fn wait_idle(&mut self, stop: &StopFlag) -> Result<WaitOutcome, DeviceError> {
        let poll = self.poll_interval;
        let outcome = loop {
            let status = self.device()?.status()?;
            if !status.is_moving() {
                break WaitOutcome::Completed;
            }
            match stop.is_present() {
                Ok(true) => {
                    debug!("stop flag observed, abandoning wait");
                    break WaitOutcome::Stopped;
                }
                Ok(false) => {}
                Err(e) => warn!("stop flag check failed: {e}"),
            }
            thread::sleep(poll);
        };
        if let Err(e) = stop.ensure_absent() {
            warn!("failed to clear stop flag: {e}");
        }
        Ok(outcome)
    }
}

/// Negate the axes marked inverted.
fn apply_inversion(dx: i32, dy: i32, inversion: InversionFlags) -> MotorSteps {
    MotorSteps {
        x: if inversion.contains(InversionFlags::INVERT_X) {
            -dx
        } else {
            dx
        },
        y: if inversion.contains(InversionFlags::INVERT_Y) {
            -dy
        } else {
            dy
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use ptz_common::types::MotorState;

    /// Records every backend call so ordering and arguments can be
    /// asserted; statuses are served from a script.
    #[derive(Default)]
    struct Recording {
        calls: Vec<String>,
        statuses: Vec<MotorStatus>,
    }

    #[derive(Clone, Default)]
    struct RecordingMotor(Arc<Mutex<Recording>>);

    impl RecordingMotor {
        fn push_status(&self, status: MotorStatus) {
            self.0.lock().unwrap().statuses.push(status);
        }

        fn calls(&self) -> Vec<String> {
            self.0.lock().unwrap().calls.clone()
        }

        fn record(&self, call: String) {
            self.0.lock().unwrap().calls.push(call);
        }
    }

    impl MotorDevice for RecordingMotor {
        fn stop(&mut self) -> Result<(), DeviceError> {
            self.record("stop".into());
            Ok(())
        }

        fn reset(&mut self) -> Result<(), DeviceError> {
            self.record("reset".into());
            Ok(())
        }

        fn move_steps(&mut self, steps: MotorSteps) -> Result<(), DeviceError> {
            self.record(format!("move({},{})", steps.x, steps.y));
            Ok(())
        }

        fn set_speed(&mut self, speed: u32) -> Result<(), DeviceError> {
            self.record(format!("speed({speed})"));
            Ok(())
        }

        fn go_back(&mut self) -> Result<(), DeviceError> {
            self.record("go_back".into());
            Ok(())
        }

        fn cruise(&mut self) -> Result<(), DeviceError> {
            self.record("cruise".into());
            Ok(())
        }

        fn status(&mut self) -> Result<MotorStatus, DeviceError> {
            self.record("status".into());
            let mut inner = self.0.lock().unwrap();
            if inner.statuses.is_empty() {
                Ok(MotorStatus::default())
            } else {
                Ok(inner.statuses.remove(0))
            }
        }
    }

    fn controller(motor: &RecordingMotor) -> MotionController {
        MotionController::new(Some(Box::new(motor.clone())), Duration::from_millis(1))
    }

    fn unacquired() -> MotionController {
        MotionController::new(None, Duration::from_millis(1))
    }

    fn test_flag(tag: &str) -> StopFlag {
        let flag = StopFlag::new(format!("/ptzd_motion_{}_{}", tag, std::process::id()));
        flag.ensure_absent().unwrap();
        flag
    }

    #[test]
    fn speed_is_written_before_the_move() {
        let motor = RecordingMotor::default();
        controller(&motor).move_steps(10, -5, 500, InversionFlags::empty()).unwrap();
        assert_eq!(motor.calls(), vec!["speed(500)", "move(10,-5)"]);
    }

    #[test]
    fn inversion_negates_only_the_flagged_axis() {
        let motor = RecordingMotor::default();
        controller(&motor)
            .move_steps(10, 20, 500, InversionFlags::INVERT_Y)
            .unwrap();
        assert_eq!(motor.calls(), vec!["speed(500)", "move(10,-20)"]);
    }

    #[test]
    fn absolute_move_issues_the_delta_from_a_fresh_status() {
        let motor = RecordingMotor::default();
        motor.push_status(MotorStatus {
            x: 30,
            y: 10,
            ..Default::default()
        });
        controller(&motor)
            .set_position(100, 0, 700, InversionFlags::empty())
            .unwrap();
        assert_eq!(motor.calls(), vec!["status", "speed(700)", "move(70,-10)"]);
    }

    #[test]
    fn operations_fail_fast_without_a_handle() {
        let mut motion = unacquired();
        assert!(matches!(
            motion.move_steps(1, 1, 500, InversionFlags::empty()),
            Err(DeviceError::Unavailable)
        ));
        assert!(matches!(motion.status(), Err(DeviceError::Unavailable)));
        assert!(matches!(motion.cruise(), Err(DeviceError::Unavailable)));
        // Reset is the exception: a safe no-op.
        assert!(motion.reset().is_ok());
    }

    #[test]
    fn wait_idle_returns_when_the_device_goes_idle() {
        let motor = RecordingMotor::default();
        let moving = MotorStatus {
            state: MotorState::Moving,
            ..Default::default()
        };
        motor.push_status(moving);
        motor.push_status(moving);
        // Third scripted status is the default (idle).

        let flag = test_flag("idle");
        let outcome = controller(&motor).wait_idle(&flag).unwrap();
        assert_eq!(outcome, WaitOutcome::Completed);
        assert!(!flag.is_present().unwrap());
    }

    #[test]
    fn wait_idle_aborts_and_clears_the_flag_when_raised() {
        let motor = RecordingMotor::default();
        // Stays busy forever unless the flag interrupts.
        for _ in 0..1000 {
            motor.push_status(MotorStatus {
                state: MotorState::Moving,
                ..Default::default()
            });
        }

        let flag = test_flag("abort");
        flag.ensure_present().unwrap();
        let outcome = controller(&motor).wait_idle(&flag).unwrap();
        assert_eq!(outcome, WaitOutcome::Stopped);
        assert!(!flag.is_present().unwrap());
        // Clearing again stays a no-op.
        flag.ensure_absent().unwrap();
    }

    #[test]
    fn wait_idle_clears_a_stale_flag_after_normal_completion() {
        let motor = RecordingMotor::default();
        let flag = test_flag("stale");
        flag.ensure_present().unwrap();
        // Device is already idle; the flag never interrupts anything but
        // must not survive to cancel a later move.
        let outcome = controller(&motor).wait_idle(&flag).unwrap();
        assert_eq!(outcome, WaitOutcome::Completed);
        assert!(!flag.is_present().unwrap());
    }
}
