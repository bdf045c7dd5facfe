//! Status reply frame codec.
//!
//! The daemon sends the full status snapshot for every query-class
//! command; which fields the user actually sees is the client's concern.

use super::{FRAME_HEADER_LEN, PROTOCOL_VERSION, ProtocolError, REPLY_FRAME_LEN, REPLY_PAYLOAD_LEN};
use crate::types::{InversionFlags, MotorState, MotorStatus};

// Status reply payload layout (little-endian, after the 2-byte preamble):
//   [0..4]   x:           i32
//   [4..8]   y:           i32
//   [8..12]  state:       u32 (0 idle / 1 moving)
//   [12..16] speed:       u32
//   [16..20] x_max_steps: u32
//   [20..24] y_max_steps: u32
//   [24..28] inversion:   u32 (InversionFlags bits)

/// Encode a status snapshot into a full wire frame.
pub fn encode_status(status: &MotorStatus) -> [u8; REPLY_FRAME_LEN] {
    let mut frame = [0u8; REPLY_FRAME_LEN];
    frame[0] = PROTOCOL_VERSION;
    frame[1] = REPLY_PAYLOAD_LEN as u8;

    let p = &mut frame[FRAME_HEADER_LEN..];
    p[0..4].copy_from_slice(&status.x.to_le_bytes());
    p[4..8].copy_from_slice(&status.y.to_le_bytes());
    p[8..12].copy_from_slice(&status.state.as_wire().to_le_bytes());
    p[12..16].copy_from_slice(&status.speed.to_le_bytes());
    p[16..20].copy_from_slice(&status.x_max_steps.to_le_bytes());
    p[20..24].copy_from_slice(&status.y_max_steps.to_le_bytes());
    p[24..28].copy_from_slice(&status.inversion.bits().to_le_bytes());
    frame
}

/// Decode a full status reply frame (preamble included).
pub fn decode_status(frame: &[u8]) -> Result<MotorStatus, ProtocolError> {
    if frame.len() < REPLY_FRAME_LEN {
        return Err(ProtocolError::Truncated {
            want: REPLY_FRAME_LEN,
        });
    }
    super::check_header([frame[0], frame[1]], REPLY_PAYLOAD_LEN as u8)?;
    let mut payload = [0u8; REPLY_PAYLOAD_LEN];
    payload.copy_from_slice(&frame[FRAME_HEADER_LEN..REPLY_FRAME_LEN]);
    Ok(decode_payload(&payload))
}

/// Decode a status payload (preamble already validated).
pub(super) fn decode_payload(p: &[u8; REPLY_PAYLOAD_LEN]) -> MotorStatus {
    MotorStatus {
        x: i32::from_le_bytes([p[0], p[1], p[2], p[3]]),
        y: i32::from_le_bytes([p[4], p[5], p[6], p[7]]),
        state: MotorState::from_wire(u32::from_le_bytes([p[8], p[9], p[10], p[11]])),
        speed: u32::from_le_bytes([p[12], p[13], p[14], p[15]]),
        x_max_steps: u32::from_le_bytes([p[16], p[17], p[18], p[19]]),
        y_max_steps: u32::from_le_bytes([p[20], p[21], p[22], p[23]]),
        inversion: InversionFlags::from_bits_truncate(u32::from_le_bytes([
            p[24], p[25], p[26], p[27],
        ])),
    }
}
