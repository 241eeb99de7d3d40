//! Protocol module containing the MDC frame codec and command tables.

pub mod codec;
pub mod commands;

pub use codec::{
    checksum, decode_frame, encode_frame, frame_len, DecodedFrame, ProtocolError, FRAME_HEADER,
    HEADER_SIZE, MAX_PAYLOAD_LEN,
};
pub use commands::{CommandCode, InputSource, COMMAND_TABLE, INPUT_SOURCE_TABLE};
