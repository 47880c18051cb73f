//! Protocol module: checksum, frame codec and handshake handling.

pub mod checksum;
pub mod frame;
pub mod handshake;

pub use checksum::{add_checksum, check_checksum, checksum, verify_checksum};
pub use frame::{
    decode_frame, encode_command, encode_command_raw, Frame, FrameError, COMMAND_CODE, ETX,
    FRAME_LEN, STX,
};
pub use handshake::{handshake_reply, is_handshake_request, HANDSHAKE_REPLY, HANDSHAKE_REQUEST};
