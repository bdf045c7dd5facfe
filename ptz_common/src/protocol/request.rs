//! Request frame: command tags and the fixed-layout codec.
//!
//! Tag bytes keep the ASCII mnemonics the protocol has always used, so a
//! packet capture still reads naturally (`d` move, `r` reset, `s` set
//! speed, ...). The axis-inversion command is the one later addition and
//! uses `v`.

use super::{
    FRAME_HEADER_LEN, PROTOCOL_VERSION, ProtocolError, REQUEST_FRAME_LEN, REQUEST_PAYLOAD_LEN,
};
use crate::types::InvertAxis;

// Request payload layout (little-endian, after the 2-byte preamble):
//   [0]      command:    u8
//   [1]      move_type:  u8
//   [2..6]   x:          i32
//   [6..10]  x_supplied: u32 (0/1)
//   [10..14] y:          i32
//   [14..18] y_supplied: u32 (0/1)
//   [18..22] speed:      i32 (<= 0 means "use session speed")

/// Command selector carried in the first payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Start or stop a movement; the payload's move type says which.
    Move = b'd',
    /// Re-home the position counters.
    Reset = b'r',
    /// Update the session speed (and the hardware speed register).
    SetSpeed = b's',
    /// Toggle per-axis inversion for the rest of the session.
    Invert = b'v',
    /// Full status snapshot.
    QueryStatus = b'S',
    /// Position snapshot (same payload, client formats `x,y`).
    QueryPosition = b'p',
    /// Busy probe (same payload, client maps state to its exit code).
    QueryBusy = b'b',
    /// Startup parameters (same live payload; see the dispatcher notes).
    QueryInitial = b'i',
}

impl Command {
    /// Decode a tag byte. Returns `None` for bytes outside the contract.
    pub const fn from_wire(tag: u8) -> Option<Self> {
        match tag {
            b'd' => Some(Self::Move),
            b'r' => Some(Self::Reset),
            b's' => Some(Self::SetSpeed),
            b'v' => Some(Self::Invert),
            b'S' => Some(Self::QueryStatus),
            b'p' => Some(Self::QueryPosition),
            b'b' => Some(Self::QueryBusy),
            b'i' => Some(Self::QueryInitial),
            _ => None,
        }
    }

    /// True for the commands the daemon answers with a status reply.
    #[inline]
    pub const fn expects_reply(self) -> bool {
        matches!(
            self,
            Self::QueryStatus | Self::QueryPosition | Self::QueryBusy | Self::QueryInitial
        )
    }
}

/// Movement variant, meaningful only when the command is [`Command::Move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MoveType {
    /// Step both axes by a signed delta.
    RelativeSteps = b'g',
    /// Drive to an absolute position.
    AbsolutePosition = b'h',
    /// Run until stopped or a travel limit is hit.
    Cruise = b'c',
    /// Return to the position held before the last move.
    GoBack = b'b',
    /// Halt motion immediately.
    Stop = b's',
}

impl MoveType {
    /// Decode a tag byte. Returns `None` for bytes outside the contract.
    pub const fn from_wire(tag: u8) -> Option<Self> {
        match tag {
            b'g' => Some(Self::RelativeSteps),
            b'h' => Some(Self::AbsolutePosition),
            b'c' => Some(Self::Cruise),
            b'b' => Some(Self::GoBack),
            b's' => Some(Self::Stop),
            _ => None,
        }
    }
}

/// One command issued by a client.
///
/// `x_supplied`/`y_supplied` distinguish "caller omitted this axis" from
/// "caller explicitly asked for 0". For [`Command::Invert`] the same two
/// booleans select the axis to toggle (neither or both selects both axes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Command selector.
    pub command: Command,
    /// Movement variant, meaningful only for `Move`.
    pub move_type: MoveType,
    /// Pan steps or absolute pan position.
    pub x: i32,
    /// Whether the caller supplied `x`.
    pub x_supplied: bool,
    /// Tilt steps or absolute tilt position.
    pub y: i32,
    /// Whether the caller supplied `y`.
    pub y_supplied: bool,
    /// Explicit speed for this request; `None` reuses the session speed.
    pub speed: Option<u32>,
}

impl Request {
    /// Baseline request: a stop move with nothing supplied.
    const fn bare(command: Command) -> Self {
        Self {
            command,
            move_type: MoveType::Stop,
            x: 0,
            x_supplied: false,
            y: 0,
            y_supplied: false,
            speed: None,
        }
    }

    /// Relative move by `(x, y)` steps.
    pub const fn move_relative(x: i32, y: i32, speed: Option<u32>) -> Self {
        Self {
            command: Command::Move,
            move_type: MoveType::RelativeSteps,
            x,
            x_supplied: true,
            y,
            y_supplied: true,
            speed,
        }
    }

    /// Absolute move; an omitted axis keeps its current position.
    pub const fn move_absolute(x: Option<i32>, y: Option<i32>, speed: Option<u32>) -> Self {
        Self {
            command: Command::Move,
            move_type: MoveType::AbsolutePosition,
            x: match x {
                Some(v) => v,
                None => 0,
            },
            x_supplied: x.is_some(),
            y: match y {
                Some(v) => v,
                None => 0,
            },
            y_supplied: y.is_some(),
            speed,
        }
    }

    /// Cruise until stopped.
    pub const fn cruise(speed: Option<u32>) -> Self {
        let mut req = Self::bare(Command::Move);
        req.move_type = MoveType::Cruise;
        req.speed = speed;
        req
    }

    /// Return to the previous position.
    pub const fn go_back(speed: Option<u32>) -> Self {
        let mut req = Self::bare(Command::Move);
        req.move_type = MoveType::GoBack;
        req.speed = speed;
        req
    }

    /// Halt motion.
    pub const fn stop_motion() -> Self {
        Self::bare(Command::Move)
    }

    /// Re-home the position counters.
    pub const fn reset() -> Self {
        Self::bare(Command::Reset)
    }

    /// Update the session speed.
    pub const fn set_speed(speed: u32) -> Self {
        let mut req = Self::bare(Command::SetSpeed);
        req.speed = Some(speed);
        req
    }

    /// Toggle inversion of the given axis.
    pub const fn invert(axis: InvertAxis) -> Self {
        let mut req = Self::bare(Command::Invert);
        match axis {
            InvertAxis::X => req.x_supplied = true,
            InvertAxis::Y => req.y_supplied = true,
            InvertAxis::Both => {
                req.x_supplied = true;
                req.y_supplied = true;
            }
        }
        req
    }

    /// Query request for one of the `Query*` commands.
    pub const fn query(command: Command) -> Self {
        Self::bare(command)
    }

    /// Axis selector encoded in the supplied flags of an `Invert` request.
    pub const fn invert_axis(&self) -> InvertAxis {
        match (self.x_supplied, self.y_supplied) {
            (true, false) => InvertAxis::X,
            (false, true) => InvertAxis::Y,
            _ => InvertAxis::Both,
        }
    }

    /// Encode into a full wire frame.
    pub fn encode(&self) -> [u8; REQUEST_FRAME_LEN] {
        let mut frame = [0u8; REQUEST_FRAME_LEN];
        frame[0] = PROTOCOL_VERSION;
        frame[1] = REQUEST_PAYLOAD_LEN as u8;

        let p = &mut frame[FRAME_HEADER_LEN..];
        p[0] = self.command as u8;
        p[1] = self.move_type as u8;
        p[2..6].copy_from_slice(&self.x.to_le_bytes());
        p[6..10].copy_from_slice(&u32::from(self.x_supplied).to_le_bytes());
        p[10..14].copy_from_slice(&self.y.to_le_bytes());
        p[14..18].copy_from_slice(&u32::from(self.y_supplied).to_le_bytes());
        let speed = self.speed.map_or(0i32, |s| s as i32);
        p[18..22].copy_from_slice(&speed.to_le_bytes());
        frame
    }

    /// Decode a full wire frame (preamble included).
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < REQUEST_FRAME_LEN {
            return Err(ProtocolError::Truncated {
                want: REQUEST_FRAME_LEN,
            });
        }
        super::check_header([frame[0], frame[1]], REQUEST_PAYLOAD_LEN as u8)?;
        let mut payload = [0u8; REQUEST_PAYLOAD_LEN];
        payload.copy_from_slice(&frame[FRAME_HEADER_LEN..REQUEST_FRAME_LEN]);
        decode_payload(&payload)
    }
}

/// Decode a request payload (preamble already validated).
pub(super) fn decode_payload(p: &[u8; REQUEST_PAYLOAD_LEN]) -> Result<Request, ProtocolError> {
    let command = Command::from_wire(p[0]).ok_or(ProtocolError::UnknownCommand(p[0]))?;
    let move_type = MoveType::from_wire(p[1]).ok_or(ProtocolError::UnknownMoveType(p[1]))?;

    let x = i32::from_le_bytes([p[2], p[3], p[4], p[5]]);
    let x_supplied = u32::from_le_bytes([p[6], p[7], p[8], p[9]]) != 0;
    let y = i32::from_le_bytes([p[10], p[11], p[12], p[13]]);
    let y_supplied = u32::from_le_bytes([p[14], p[15], p[16], p[17]]) != 0;
    let speed_raw = i32::from_le_bytes([p[18], p[19], p[20], p[21]]);
    // Zero has always meant "no speed given"; negatives get the same
    // treatment rather than wrapping into huge unsigned speeds.
    let speed = (speed_raw > 0).then_some(speed_raw as u32);

    Ok(Request {
        command,
        move_type,
        x,
        x_supplied,
        y,
        y_supplied,
        speed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bytes_keep_their_mnemonics() {
        assert_eq!(Command::Move as u8, b'd');
        assert_eq!(Command::QueryStatus as u8, b'S');
        assert_eq!(MoveType::RelativeSteps as u8, b'g');
        assert_eq!(MoveType::GoBack as u8, b'b');
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let mut frame = Request::reset().encode();
        frame[FRAME_HEADER_LEN] = b'z';
        assert!(matches!(
            Request::decode(&frame),
            Err(ProtocolError::UnknownCommand(b'z'))
        ));

        let mut frame = Request::reset().encode();
        frame[FRAME_HEADER_LEN + 1] = b'q';
        assert!(matches!(
            Request::decode(&frame),
            Err(ProtocolError::UnknownMoveType(b'q'))
        ));
    }

    #[test]
    fn zero_speed_decodes_as_unset() {
        let frame = Request::move_relative(5, 5, None).encode();
        let req = Request::decode(&frame).unwrap();
        assert_eq!(req.speed, None);
    }

    #[test]
    fn negative_speed_decodes_as_unset() {
        let mut frame = Request::move_relative(5, 5, None).encode();
        frame[FRAME_HEADER_LEN + 18..].copy_from_slice(&(-200i32).to_le_bytes());
        let req = Request::decode(&frame).unwrap();
        assert_eq!(req.speed, None);
    }

    #[test]
    fn omitted_axis_is_distinguished_from_zero() {
        let explicit = Request::move_absolute(Some(0), None, None);
        let frame = explicit.encode();
        let req = Request::decode(&frame).unwrap();
        assert_eq!(req.x, 0);
        assert!(req.x_supplied);
        assert!(!req.y_supplied);
    }

    #[test]
    fn invert_axis_selector_roundtrip() {
        for axis in [InvertAxis::X, InvertAxis::Y, InvertAxis::Both] {
            let req = Request::decode(&Request::invert(axis).encode()).unwrap();
            assert_eq!(req.invert_axis(), axis);
        }
    }

    #[test]
    fn query_commands_expect_a_reply_and_moves_do_not() {
        assert!(Command::QueryBusy.expects_reply());
        assert!(Command::QueryInitial.expects_reply());
        assert!(!Command::Move.expects_reply());
        assert!(!Command::SetSpeed.expects_reply());
    }
}
