//! Protocol module - frame wire format, primitives and the frame codec.
//!
//! - 9-byte frame header encoding/decoding
//! - `[string]`, `[bytes]`, map and list primitives with exact sizing
//! - [`Frame`] and [`FrameCodec`]
//! - [`FrameBuffer`] for cutting raw frames out of partial reads

mod frame;
mod frame_buffer;
mod frame_codec;
mod wire_format;

pub mod primitives;
pub mod sizes;
pub mod version;

pub use frame::{Frame, NO_SIZE};
pub use frame_buffer::{FrameBuffer, DEFAULT_MAX_BODY_LENGTH};
pub use frame_codec::FrameCodec;
pub use wire_format::{
    flags, peek_body_length, FrameHeader, HEADER_SIZE, LENGTH_OFFSET, RESPONSE_BIT, VERSION_MASK,
};
