//! Fixed-width frame codec for the vision protocol.
//!
//! Wire format (14 bytes, ASCII between the sentinels):
//! ```text
//! [STX:1][code:5][target:3][reserved "00":2][state:1][checksum:1][ETX:1]
//! ```
//!
//! Outbound commands always carry the code `AFFFV`.  Inbound frames carry
//! whatever 5-byte code the peer chose; the only code the gateway reacts to is
//! the handshake marker (see [`crate::protocol::handshake`]).

use std::fmt;

use thiserror::Error;

use crate::domain::command::{AgvState, CommandError, CommandKey, TargetId};
use crate::protocol::checksum::{checksum, verify_checksum};

/// Start-of-frame sentinel.
pub const STX: u8 = 0x02;
/// End-of-frame sentinel.
pub const ETX: u8 = 0x03;
/// Total frame length including both sentinels.
pub const FRAME_LEN: usize = 14;
/// Length of the code field at bytes `1..6`.
pub const CODE_LEN: usize = 5;
/// Code carried by every outbound command frame.
pub const COMMAND_CODE: &[u8; CODE_LEN] = b"AFFFV";
/// Literal filler between the target id and the state.
pub const RESERVED_FIELD: &[u8; 2] = b"00";

const CODE_RANGE: std::ops::Range<usize> = 1..6;
const TARGET_RANGE: std::ops::Range<usize> = 6..9;
const STATE_INDEX: usize = 11;
const CHECKSUM_INDEX: usize = 12;

/// Reasons a received byte sequence is not a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The message is not exactly [`FRAME_LEN`] bytes long.
    #[error("malformed frame: expected {FRAME_LEN} bytes, got {0}")]
    WrongLength(usize),

    /// The first byte is not [`STX`].
    #[error("malformed frame: missing STX, first byte is 0x{0:02X}")]
    MissingStx(u8),

    /// The last byte is not [`ETX`].
    #[error("malformed frame: missing ETX, last byte is 0x{0:02X}")]
    MissingEtx(u8),

    /// A command argument could not be encoded.
    #[error(transparent)]
    InvalidArgument(#[from] CommandError),
}

/// One complete 14-byte protocol message.
///
/// A `Frame` always satisfies `len == 14`, `bytes[0] == STX` and
/// `bytes[13] == ETX`.  The bytes in between are not interpreted further:
/// inbound checksums are not enforced.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Returns the raw wire bytes.
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Consumes the frame and returns its bytes.
    pub fn into_bytes(self) -> [u8; FRAME_LEN] {
        self.0
    }

    /// The 5-byte code at bytes `1..6`.
    pub fn code(&self) -> &[u8] {
        &self.0[CODE_RANGE]
    }

    /// Payload plus checksum: everything between the sentinels.
    pub fn interior(&self) -> &[u8] {
        &self.0[1..FRAME_LEN - 1]
    }

    /// The checksum byte at index 12.
    pub fn checksum_byte(&self) -> u8 {
        self.0[CHECKSUM_INDEX]
    }

    /// The state byte at index 11.
    pub fn state(&self) -> AgvState {
        AgvState::from_byte(self.0[STATE_INDEX])
    }

    /// Parses the target field, if the peer filled it with digits.
    pub fn target(&self) -> Option<TargetId> {
        let mut digits = [0u8; 3];
        digits.copy_from_slice(&self.0[TARGET_RANGE]);
        TargetId::from_digits(&digits)
    }

    /// Returns `true` if the checksum byte matches the payload.
    pub fn has_valid_checksum(&self) -> bool {
        verify_checksum(self.interior())
    }

    /// Returns a copy of this frame with the code field replaced.
    ///
    /// Every other byte, including the checksum, is kept as received.
    pub fn with_code(&self, code: &[u8; CODE_LEN]) -> Frame {
        let mut bytes = self.0;
        bytes[CODE_RANGE].copy_from_slice(code);
        Frame(bytes)
    }

    /// Lossy text rendering of the interior, for logs.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(self.interior()).into_owned()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(<STX>{}<ETX>)", self.to_text())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a command for `key` into a frame.
///
/// The payload is `AFFFV` + three-digit target + `00` + state, followed by the
/// checksum of those 11 bytes.
///
/// # Examples
///
/// ```rust
/// use agv_core::{encode_command, CommandKey};
///
/// let frame = encode_command(CommandKey::parse(700, '1').unwrap());
/// assert_eq!(frame.as_bytes(), b"\x02AFFFV7000011\x03");
/// ```
pub fn encode_command(key: CommandKey) -> Frame {
    let mut bytes = [0u8; FRAME_LEN];
    bytes[0] = STX;
    bytes[CODE_RANGE].copy_from_slice(COMMAND_CODE);
    bytes[TARGET_RANGE].copy_from_slice(&key.target.to_digits());
    bytes[9..11].copy_from_slice(RESERVED_FIELD);
    bytes[STATE_INDEX] = key.state.as_byte();
    bytes[CHECKSUM_INDEX] = checksum(&bytes[1..CHECKSUM_INDEX]);
    bytes[FRAME_LEN - 1] = ETX;
    Frame(bytes)
}

/// Encodes a command from raw caller arguments.
///
/// # Errors
///
/// Returns [`FrameError::InvalidArgument`] if `target_id` needs more than three
/// digits or `state` is not ASCII.
pub fn encode_command_raw(target_id: u32, state: char) -> Result<Frame, FrameError> {
    Ok(encode_command(CommandKey::parse(target_id, state)?))
}

/// Classifies a received message as a frame.
///
/// Valid iff it is exactly 14 bytes with STX first and ETX last.  The checksum
/// is not checked.
///
/// # Errors
///
/// Returns the first [`FrameError`] found: length, then STX, then ETX.
pub fn decode_frame(raw: &[u8]) -> Result<Frame, FrameError> {
    let bytes: [u8; FRAME_LEN] = raw
        .try_into()
        .map_err(|_| FrameError::WrongLength(raw.len()))?;
    if bytes[0] != STX {
        return Err(FrameError::MissingStx(bytes[0]));
    }
    if bytes[FRAME_LEN - 1] != ETX {
        return Err(FrameError::MissingEtx(bytes[FRAME_LEN - 1]));
    }
    Ok(Frame(bytes))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn key(target: u32, state: char) -> CommandKey {
        CommandKey::parse(target, state).unwrap()
    }

    #[test]
    fn test_encode_command_layout() {
        // Arrange / Act
        let frame = encode_command(key(700, '1'));

        // Assert
        assert_eq!(frame.as_bytes(), b"\x02AFFFV7000011\x03");
        assert_eq!(frame.code(), COMMAND_CODE);
        assert_eq!(frame.target(), Some(TargetId::new(700).unwrap()));
        assert_eq!(frame.state().as_char(), '1');
        assert_eq!(frame.checksum_byte(), b'1');
    }

    #[test]
    fn test_encode_command_pads_small_ids() {
        let frame = encode_command(key(5, '0'));
        assert_eq!(&frame.as_bytes()[6..9], b"005");
    }

    #[test]
    fn test_encode_command_inserts_state_verbatim() {
        let frame = encode_command(key(1, 'Z'));
        assert_eq!(frame.as_bytes()[11], b'Z');
        assert!(frame.has_valid_checksum());
    }

    #[test]
    fn test_encode_command_raw_rejects_four_digit_id() {
        let result = encode_command_raw(1000, '1');
        assert_eq!(
            result,
            Err(FrameError::InvalidArgument(CommandError::TargetIdOutOfRange(
                1000
            )))
        );
    }

    #[test]
    fn test_decode_frame_accepts_encoded_command() {
        let frame = encode_command(key(123, '4'));
        let decoded = decode_frame(frame.as_bytes()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_frame_rejects_short_input() {
        assert_eq!(decode_frame(b"\x02AFFFV\x03"), Err(FrameError::WrongLength(7)));
    }

    #[test]
    fn test_decode_frame_rejects_long_input() {
        let mut raw = encode_command(key(1, '1')).as_bytes().to_vec();
        raw.extend_from_slice(encode_command(key(2, '1')).as_bytes());
        assert_eq!(decode_frame(&raw), Err(FrameError::WrongLength(28)));
    }

    #[test]
    fn test_decode_frame_rejects_empty_input() {
        assert_eq!(decode_frame(&[]), Err(FrameError::WrongLength(0)));
    }

    #[test]
    fn test_decode_frame_rejects_missing_stx() {
        let raw = b"XAFFFV7000011\x03";
        assert_eq!(decode_frame(raw), Err(FrameError::MissingStx(b'X')));
    }

    #[test]
    fn test_decode_frame_rejects_missing_etx() {
        let raw = b"\x02AFFFV7000011X";
        assert_eq!(decode_frame(raw), Err(FrameError::MissingEtx(b'X')));
    }

    #[test]
    fn test_decode_frame_does_not_enforce_checksum() {
        // Wrong checksum '9', sentinels fine.
        let raw = b"\x02AFFFV7000019\x03";
        let frame = decode_frame(raw).expect("checksum is not checked on decode");
        assert!(!frame.has_valid_checksum());
    }

    #[test]
    fn test_frame_target_is_none_for_non_digit_field() {
        let frame = decode_frame(b"\x02FFFAHAB00011\x03").unwrap();
        assert_eq!(frame.target(), None);
    }

    #[test]
    fn test_with_code_keeps_all_other_bytes() {
        // Arrange
        let frame = decode_frame(b"\x02FFFAH7000011\x03").unwrap();

        // Act
        let replaced = frame.with_code(b"AFFFH");

        // Assert
        assert_eq!(replaced.as_bytes(), b"\x02AFFFH7000011\x03");
    }

    #[test]
    fn test_frame_debug_shows_interior_text() {
        let frame = encode_command(key(700, '1'));
        assert_eq!(format!("{frame:?}"), "Frame(<STX>AFFFV7000011<ETX>)");
        assert_eq!(frame.to_string(), "AFFFV7000011");
    }
}
