//! Request dispatch: one handler per command variant.
//!
//! The daemon is strictly request-synchronous: the dispatcher handles one
//! request to completion (including any busy-wait) before the transport
//! accepts the next connection. Query commands return the reply payload;
//! everything else returns nothing.

use tracing::{debug, info};

use ptz_common::protocol::{Command, MoveType, Request};
use ptz_common::stopflag::StopFlag;
use ptz_common::types::MotorStatus;

use crate::device::DeviceError;
use crate::motion::{MotionController, WaitOutcome};
use crate::session::SessionState;

/// Stateful command dispatcher.
pub struct Dispatcher {
    session: SessionState,
    motion: MotionController,
    stop_flag: StopFlag,
}

impl Dispatcher {
    /// Build a dispatcher over the given session, motion controller and
    /// stop flag.
    pub fn new(session: SessionState, motion: MotionController, stop_flag: StopFlag) -> Self {
        Self {
            session,
            motion,
            stop_flag,
        }
    }

    /// Handle one request to completion.
    ///
    /// Returns the status payload for query commands, `None` otherwise.
    /// Errors are per-request: the caller logs them and keeps serving.
    pub fn dispatch(&mut self, request: &Request) -> Result<Option<MotorStatus>, DeviceError> {
        match request.command {
            Command::Move => self.handle_move(request).map(|()| None),
            Command::Reset => self.handle_reset().map(|()| None),
            Command::SetSpeed => self.handle_set_speed(request).map(|()| None),
            Command::Invert => {
                self.handle_invert(request);
                Ok(None)
            }
            Command::QueryStatus
            | Command::QueryPosition
            | Command::QueryBusy
            | Command::QueryInitial => self.handle_query().map(Some),
        }
    }

    /// Speed for this move: an explicit request speed becomes the session
    /// speed before the move goes out, so "set and move" works in one
    /// round trip; otherwise the sticky session speed applies.
    fn effective_speed(&mut self, request: &Request) -> u32 {
        match request.speed {
            Some(speed) => self.session.set_speed(speed),
            None => self.session.speed(),
        }
    }

    fn handle_move(&mut self, request: &Request) -> Result<(), DeviceError> {
        let speed = self.effective_speed(request);
        let inversion = self.session.inversion();
        match request.move_type {
            MoveType::RelativeSteps => {
                self.motion.move_steps(request.x, request.y, speed, inversion)?;
                self.finish_move()
            }
            MoveType::AbsolutePosition => {
                // An omitted axis targets its current position; with both
                // omitted this is a legal net-zero move.
                let current = self.motion.status()?;
                let x = if request.x_supplied { request.x } else { current.x };
                let y = if request.y_supplied { request.y } else { current.y };
                self.motion.set_position(x, y, speed, inversion)?;
                self.finish_move()
            }
            MoveType::Cruise => {
                self.motion.cruise()?;
                self.finish_move()
            }
            MoveType::GoBack => {
                self.motion.go_back()?;
                self.finish_move()
            }
            MoveType::Stop => self.motion.stop(),
        }
    }

    /// Block until the move ends, by completion or by the stop flag.
    fn finish_move(&mut self) -> Result<(), DeviceError> {
        match self.motion.wait_idle(&self.stop_flag)? {
            WaitOutcome::Completed => Ok(()),
            WaitOutcome::Stopped => {
                info!("move abandoned on external stop request");
                Ok(())
            }
        }
    }

    fn handle_reset(&mut self) -> Result<(), DeviceError> {
        info!("re-homing position counters");
        self.motion.reset()
    }

    fn handle_set_speed(&mut self, request: &Request) -> Result<(), DeviceError> {
        let Some(requested) = request.speed else {
            debug!("set-speed without a value, session speed unchanged");
            return Ok(());
        };
        let applied = self.session.set_speed(requested);
        debug!(requested, applied, "session speed updated");
        // Also push it to the hardware right away, not just at next move.
        self.motion.set_speed(applied)
    }

    fn handle_invert(&mut self, request: &Request) {
        let flags = self.session.toggle_inversion(request.invert_axis());
        info!(?flags, "axis inversion toggled");
    }

    fn handle_query(&mut self) -> Result<MotorStatus, DeviceError> {
        let mut status = self.motion.status()?;
        // The device knows nothing of inversion; stamp the session's view.
        status.inversion = self.session.inversion();
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ptz_common::types::{InversionFlags, InvertAxis};

    use crate::sim::SimMotor;

    fn test_flag(tag: &str) -> StopFlag {
        let flag = StopFlag::new(format!("/ptzd_dispatch_{}_{}", tag, std::process::id()));
        flag.ensure_absent().unwrap();
        flag
    }

    fn dispatcher(tag: &str) -> Dispatcher {
        let motion = MotionController::new(
            Some(Box::new(SimMotor::new())),
            Duration::from_millis(2),
        );
        Dispatcher::new(SessionState::default(), motion, test_flag(tag))
    }

    fn query_status(dispatcher: &mut Dispatcher) -> MotorStatus {
        dispatcher
            .dispatch(&Request::query(Command::QueryStatus))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn relative_move_lands_on_the_target() {
        let mut d = dispatcher("rel");
        d.dispatch(&Request::move_relative(9, 4, None)).unwrap();
        let status = query_status(&mut d);
        assert_eq!((status.x, status.y), (9, 4));
        assert!(!status.is_moving());
    }

    #[test]
    fn sticky_speed_applies_to_later_moves() {
        let mut d = dispatcher("sticky");
        d.dispatch(&Request::set_speed(500)).unwrap();
        d.dispatch(&Request::move_relative(10, 0, None)).unwrap();
        // The sim reports the last commanded speed.
        assert_eq!(query_status(&mut d).speed, 500);
    }

    #[test]
    fn explicit_speed_updates_the_session_before_the_move() {
        let mut d = dispatcher("explicit");
        d.dispatch(&Request::move_relative(5, 0, Some(300))).unwrap();
        assert_eq!(query_status(&mut d).speed, 300);
        // And it sticks for the next speedless move.
        d.dispatch(&Request::move_relative(5, 0, None)).unwrap();
        assert_eq!(query_status(&mut d).speed, 300);
    }

    #[test]
    fn set_speed_without_a_value_changes_nothing() {
        let mut d = dispatcher("nochange");
        d.dispatch(&Request::set_speed(500)).unwrap();
        // A zero/absent speed decodes to `None` and must not disturb the
        // stored value.
        let mut req = Request::set_speed(500);
        req.speed = None;
        d.dispatch(&req).unwrap();
        assert_eq!(query_status(&mut d).speed, 500);
    }

    #[test]
    fn absolute_move_with_no_axes_is_a_net_zero_move() {
        let mut d = dispatcher("netzero");
        d.dispatch(&Request::move_relative(9, 4, None)).unwrap();
        let before = query_status(&mut d);

        d.dispatch(&Request::move_absolute(None, None, None)).unwrap();
        let after = query_status(&mut d);
        assert_eq!((before.x, before.y), (after.x, after.y));
        assert!(!after.is_moving());
    }

    #[test]
    fn absolute_move_substitutes_only_the_omitted_axis() {
        let mut d = dispatcher("subst");
        d.dispatch(&Request::move_relative(9, 4, None)).unwrap();
        d.dispatch(&Request::move_absolute(Some(20), None, None)).unwrap();
        let status = query_status(&mut d);
        assert_eq!((status.x, status.y), (20, 4));
    }

    #[test]
    fn inversion_is_applied_to_moves_and_reported_in_queries() {
        let mut d = dispatcher("invert");
        d.dispatch(&Request::move_relative(10, 10, None)).unwrap();

        d.dispatch(&Request::invert(InvertAxis::X)).unwrap();
        assert_eq!(query_status(&mut d).inversion, InversionFlags::INVERT_X);

        // +5 on an inverted X axis steps backwards.
        d.dispatch(&Request::move_relative(5, 0, None)).unwrap();
        assert_eq!(query_status(&mut d).x, 5);

        // Toggling again restores normal behavior.
        d.dispatch(&Request::invert(InvertAxis::X)).unwrap();
        assert_eq!(query_status(&mut d).inversion, InversionFlags::empty());
        d.dispatch(&Request::move_relative(5, 0, None)).unwrap();
        assert_eq!(query_status(&mut d).x, 10);
    }

    #[test]
    fn reset_rehomes_the_counters() {
        let mut d = dispatcher("reset");
        d.dispatch(&Request::move_relative(9, 4, None)).unwrap();
        d.dispatch(&Request::reset()).unwrap();
        let status = query_status(&mut d);
        assert_eq!((status.x, status.y), (0, 0));
    }

    #[test]
    fn queries_work_without_a_device_handle_failing_fast() {
        let motion = MotionController::new(None, Duration::from_millis(2));
        let mut d = Dispatcher::new(SessionState::default(), motion, test_flag("nodev"));
        assert!(matches!(
            d.dispatch(&Request::query(Command::QueryStatus)),
            Err(DeviceError::Unavailable)
        ));
        // Reset stays a safe no-op.
        assert!(d.dispatch(&Request::reset()).unwrap().is_none());
    }

    #[test]
    fn initial_query_returns_the_live_status_payload() {
        // Long-standing behavior: the "initial parameters" query reports
        // live state, and clients depend on that shape.
        let mut d = dispatcher("initial");
        d.dispatch(&Request::move_relative(9, 0, None)).unwrap();
        let live = query_status(&mut d);
        let initial = d
            .dispatch(&Request::query(Command::QueryInitial))
            .unwrap()
            .unwrap();
        assert_eq!(initial, live);
    }
}
