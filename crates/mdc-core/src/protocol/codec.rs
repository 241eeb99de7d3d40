//! Binary codec for MDC (Multiple Display Control) frames.
//!
//! Wire format:
//! ```text
//! [header:1 = 0xAA][command:1][device_id:1][payload_len:1][payload:N][checksum:1]
//! ```
//! The checksum is the low byte of the sum of every preceding byte, header
//! included: `(0xAA + command + device_id + payload_len + Σ payload) mod 256`.
//!
//! The codec is pure: it never touches a socket and never retries.  The
//! device session decides what to do with a [`ProtocolError`].

use thiserror::Error;

use crate::protocol::commands::CommandCode;

/// Fixed first byte of every MDC frame.
pub const FRAME_HEADER: u8 = 0xAA;

/// Size of the fixed prefix: header, command, device id, payload length.
pub const HEADER_SIZE: usize = 4;

/// Largest payload expressible in the one-byte length field.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// Errors that can occur while encoding or decoding an MDC frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer than [`HEADER_SIZE`] bytes were supplied.
    #[error("frame too short: need at least {HEADER_SIZE} bytes, got {len}")]
    FrameTooShort { len: usize },

    /// The first byte is not [`FRAME_HEADER`].
    #[error("invalid frame header: 0x{0:02X}")]
    InvalidHeader(u8),

    /// The frame is addressed to a different display.
    #[error("device id mismatch: expected {expected}, got {actual}")]
    DeviceIdMismatch { expected: u8, actual: u8 },

    /// The checksum byte does not match the recomputed checksum.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// The declared payload length runs past the end of the buffer.
    #[error("malformed frame: declared payload of {declared} bytes, {available} available")]
    Malformed { declared: usize, available: usize },

    /// The payload does not fit in the one-byte length field.
    #[error("invalid payload: {len} bytes exceeds the {MAX_PAYLOAD_LEN}-byte limit")]
    InvalidPayload { len: usize },
}

/// The useful part of a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Command byte echoed by the display. Unknown codes are kept as-is.
    pub command: CommandCode,
    /// Payload bytes, without length prefix or checksum.
    pub payload: Vec<u8>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Computes the MDC checksum for the given frame fields.
pub fn checksum(command: CommandCode, device_id: u8, payload: &[u8]) -> u8 {
    let sum = payload
        .iter()
        .fold(0u32, |acc, byte| acc + u32::from(*byte));
    let total = u32::from(FRAME_HEADER)
        + u32::from(command.0)
        + u32::from(device_id)
        + payload.len() as u32
        + sum;
    (total & 0xFF) as u8
}

/// Encodes one frame addressed to `device_id`.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidPayload`] if `payload` is longer than
/// [`MAX_PAYLOAD_LEN`] bytes.
///
/// # Examples
///
/// ```rust
/// use mdc_core::protocol::{encode_frame, CommandCode};
///
/// let bytes = encode_frame(1, CommandCode::POWER, &[0x01]).unwrap();
/// assert_eq!(bytes, vec![0xAA, 0x11, 0x01, 0x01, 0x01, 0xBE]);
/// ```
pub fn encode_frame(
    device_id: u8,
    command: CommandCode,
    payload: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::InvalidPayload { len: payload.len() });
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + 1);
    buf.push(FRAME_HEADER);
    buf.push(command.0);
    buf.push(device_id);
    buf.push(payload.len() as u8);
    buf.extend_from_slice(payload);
    buf.push(checksum(command, device_id, payload));
    Ok(buf)
}

/// Decodes one frame from the beginning of `bytes`.
///
/// Trailing bytes after the checksum are ignored.
///
/// # Errors
///
/// Returns the first [`ProtocolError`] found, checked in this order:
/// too short, bad header, wrong device id, truncated payload, bad checksum.
///
/// # Examples
///
/// ```rust
/// use mdc_core::protocol::{decode_frame, encode_frame, CommandCode};
///
/// let bytes = encode_frame(7, CommandCode::CURRENT_TEMP, &[42]).unwrap();
/// let frame = decode_frame(&bytes, 7).unwrap();
/// assert_eq!(frame.command, CommandCode::CURRENT_TEMP);
/// assert_eq!(frame.payload, vec![42]);
/// ```
pub fn decode_frame(bytes: &[u8], expected_device_id: u8) -> Result<DecodedFrame, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::FrameTooShort { len: bytes.len() });
    }

    let header = bytes[0];
    if header != FRAME_HEADER {
        return Err(ProtocolError::InvalidHeader(header));
    }

    let command = CommandCode(bytes[1]);
    let device_id = bytes[2];
    if device_id != expected_device_id {
        return Err(ProtocolError::DeviceIdMismatch {
            expected: expected_device_id,
            actual: device_id,
        });
    }

    let declared = bytes[3] as usize;
    let available = bytes.len() - HEADER_SIZE;
    // The checksum byte must follow the payload.
    if available < declared + 1 {
        return Err(ProtocolError::Malformed {
            declared,
            available,
        });
    }

    let payload = &bytes[HEADER_SIZE..HEADER_SIZE + declared];
    let actual = bytes[HEADER_SIZE + declared];
    let expected = checksum(command, device_id, payload);
    if actual != expected {
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }

    Ok(DecodedFrame {
        command,
        payload: payload.to_vec(),
    })
}

/// Returns the total length of a frame, given its first [`HEADER_SIZE`] bytes.
///
/// Used by stream readers to know how many more bytes to wait for.
pub fn frame_len(header: &[u8; HEADER_SIZE]) -> usize {
    HEADER_SIZE + header[3] as usize + 1
}

// ── Tests ─────────────────────────────────────────────────────────────────────
