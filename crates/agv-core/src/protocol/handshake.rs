//! Handshake recognition and reply construction.
//!
//! The controller periodically sends a frame whose code is `FFFAH`.  The
//! gateway must answer with the same frame, code replaced by `AFFFH`.  The
//! checksum is copied, not recomputed: both codes contain the same letters, so
//! the byte sum (and therefore the checksum) is unchanged.

use crate::protocol::frame::{Frame, CODE_LEN};

/// Code of an inbound handshake request.
pub const HANDSHAKE_REQUEST: &[u8; CODE_LEN] = b"FFFAH";
/// Code written back in the handshake reply.
pub const HANDSHAKE_REPLY: &[u8; CODE_LEN] = b"AFFFH";

/// Returns `true` if `frame` is a handshake request.
pub fn is_handshake_request(frame: &Frame) -> bool {
    frame.code() == HANDSHAKE_REQUEST
}

/// Builds the reply for a handshake request, or `None` for any other frame.
///
/// # Examples
///
/// ```rust
/// use agv_core::protocol::{decode_frame, handshake_reply};
///
/// let inbound = decode_frame(b"\x02FFFAH7000011\x03").unwrap();
/// let reply = handshake_reply(&inbound).unwrap();
/// assert_eq!(reply.as_bytes(), b"\x02AFFFH7000011\x03");
/// ```
pub fn handshake_reply(frame: &Frame) -> Option<Frame> {
    is_handshake_request(frame).then(|| frame.with_code(HANDSHAKE_REPLY))
}
