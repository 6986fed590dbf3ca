//! Segment layer for protocol v5 and later.
//!
//! A segment carries either one or more whole encoded frames
//! (self-contained) or one slice of a frame too large to fit. On the wire:
//!
//! ```text
//! ┌──────────────────────┬────────┬─────────┬────────┐
//! │ bit-packed header    │ CRC-24 │ payload │ CRC-32 │
//! │ 3 or 5 bytes (LE)    │ 3 (LE) │         │ 4 (LE) │
//! └──────────────────────┴────────┴─────────┴────────┘
//! ```
//!
//! - [`SegmentCodec`] turns a [`Segment`] into wire bytes and back.
//! - [`SegmentBuilder`] batches small frames and splits large ones.
//! - [`SegmentBuffer`] and [`FrameAssembler`] run the inbound path.

mod assembler;
mod buffer;
mod builder;
mod codec;
pub mod crc;

use bytes::Bytes;

pub use assembler::FrameAssembler;
pub use buffer::SegmentBuffer;
pub use builder::{NoState, SegmentBuilder, SegmentListener, SegmentStates};
pub use codec::{EncodedSegment, SegmentCodec};

/// Largest payload a segment can carry: 2^17 - 1 bytes.
pub const MAX_PAYLOAD_LENGTH: usize = 131_071;

/// CRC-32 trailer size in bytes.
pub const TRAILER_LENGTH: usize = 4;

/// CRC-24 size in bytes.
pub const CRC24_LENGTH: usize = 3;

/// A segment payload and its framing kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Concatenated whole frames, or one slice of a large frame.
    pub payload: Bytes,
    /// `true` if the payload is made of whole frames.
    pub is_self_contained: bool,
}

impl Segment {
    /// Create a segment.
    pub fn new(payload: Bytes, is_self_contained: bool) -> Self {
        Self {
            payload,
            is_self_contained,
        }
    }
}

/// Decoded segment header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Length of the payload on the wire, trailer excluded.
    pub payload_length: usize,
    /// `None` when compression is not configured; `Some(0)` when compression
    /// was skipped because it did not shrink the payload.
    pub uncompressed_payload_length: Option<usize>,
    /// Whether the payload is made of whole frames.
    pub is_self_contained: bool,
}
