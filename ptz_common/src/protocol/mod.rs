//! Fixed-layout wire protocol between client and daemon.
//!
//! Every frame starts with a two-byte preamble (`version`, `payload_len`)
//! so that a peer speaking a different revision fails loudly instead of
//! silently mis-slicing fields. Payloads are little-endian with a fixed
//! field order documented next to each codec; the layout is part of the
//! contract, independent of any in-memory struct.
//!
//! - Request frames flow client → daemon ([`request`]).
//! - Status reply frames flow daemon → client, and only for query-class
//!   commands ([`response`]).

pub mod request;
pub mod response;

use std::io::{Read, Write};

use thiserror::Error;

pub use request::{Command, MoveType, Request};
pub use response::{decode_status, encode_status};

use crate::types::MotorStatus;

/// Wire protocol revision. Bumped on any layout change.
pub const PROTOCOL_VERSION: u8 = 1;

/// Preamble length: version byte + payload length byte.
pub const FRAME_HEADER_LEN: usize = 2;

/// Request payload length in bytes.
pub const REQUEST_PAYLOAD_LEN: usize = 22;

/// Full request frame length in bytes.
pub const REQUEST_FRAME_LEN: usize = FRAME_HEADER_LEN + REQUEST_PAYLOAD_LEN;

/// Status reply payload length in bytes.
pub const REPLY_PAYLOAD_LEN: usize = 28;

/// Full status reply frame length in bytes.
pub const REPLY_FRAME_LEN: usize = FRAME_HEADER_LEN + REPLY_PAYLOAD_LEN;

static_assertions::const_assert_eq!(REQUEST_FRAME_LEN, 24);
static_assertions::const_assert_eq!(REPLY_FRAME_LEN, 30);

/// Errors raised while encoding or decoding wire frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Peer speaks a different protocol revision.
    #[error("protocol version mismatch: got {got}, want {want}")]
    VersionMismatch {
        /// Version byte received.
        got: u8,
        /// Version this build speaks.
        want: u8,
    },

    /// Payload length byte disagrees with this revision's layout.
    #[error("payload length mismatch: got {got}, want {want}")]
    LengthMismatch {
        /// Length byte received.
        got: u8,
        /// Length this revision expects.
        want: u8,
    },

    /// Stream ended before a full frame arrived.
    #[error("frame truncated before {want} bytes")]
    Truncated {
        /// Bytes the frame needed.
        want: usize,
    },

    /// Command tag byte is not part of the contract.
    #[error("unknown command tag {0:#04x}")]
    UnknownCommand(u8),

    /// Move type tag byte is not part of the contract.
    #[error("unknown move type tag {0:#04x}")]
    UnknownMoveType(u8),

    /// Underlying stream error.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate a frame preamble against this revision's expectations.
fn check_header(header: [u8; FRAME_HEADER_LEN], want_len: u8) -> Result<(), ProtocolError> {
    if header[0] != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch {
            got: header[0],
            want: PROTOCOL_VERSION,
        });
    }
    if header[1] != want_len {
        return Err(ProtocolError::LengthMismatch {
            got: header[1],
            want: want_len,
        });
    }
    Ok(())
}

/// Read exactly `N` bytes, mapping a premature EOF to [`ProtocolError::Truncated`].
fn read_array<const N: usize>(reader: &mut impl Read) -> Result<[u8; N], ProtocolError> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ProtocolError::Truncated { want: N }
        } else {
            ProtocolError::Io(e)
        }
    })?;
    Ok(buf)
}

/// Read one request frame from a stream.
pub fn read_request(reader: &mut impl Read) -> Result<Request, ProtocolError> {
    let header = read_array::<FRAME_HEADER_LEN>(reader)?;
    check_header(header, REQUEST_PAYLOAD_LEN as u8)?;
    let payload = read_array::<REQUEST_PAYLOAD_LEN>(reader)?;
    request::decode_payload(&payload)
}

/// Write one request frame to a stream.
pub fn write_request(writer: &mut impl Write, request: &Request) -> std::io::Result<()> {
    writer.write_all(&request.encode())
}

/// Read one status reply frame from a stream.
pub fn read_reply(reader: &mut impl Read) -> Result<MotorStatus, ProtocolError> {
    let header = read_array::<FRAME_HEADER_LEN>(reader)?;
    check_header(header, REPLY_PAYLOAD_LEN as u8)?;
    let payload = read_array::<REPLY_PAYLOAD_LEN>(reader)?;
    Ok(response::decode_payload(&payload))
}

/// Write one status reply frame to a stream.
pub fn write_reply(writer: &mut impl Write, status: &MotorStatus) -> std::io::Result<()> {
    writer.write_all(&encode_status(status))
}
