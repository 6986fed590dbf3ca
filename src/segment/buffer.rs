//! Segment buffer for accumulating partial reads.
//!
//! Same state machine as [`FrameBuffer`], driven by the two decode phases
//! of [`SegmentCodec`]:
//! - `WaitingForHeader`: need the header and its CRC-24
//! - `WaitingForPayload`: header checked, need payload plus CRC-32
//!
//! [`FrameBuffer`]: crate::protocol::FrameBuffer

use bytes::BytesMut;

use super::codec::SegmentCodec;
use super::{Segment, SegmentHeader, TRAILER_LENGTH};
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
enum State {
    WaitingForHeader,
    WaitingForPayload { header: SegmentHeader },
}

/// Accumulates incoming bytes and extracts checked segments.
#[derive(Debug)]
pub struct SegmentBuffer {
    codec: SegmentCodec,
    buffer: BytesMut,
    state: State,
}

impl SegmentBuffer {
    /// Create a buffer decoding with `codec`.
    pub fn new(codec: SegmentCodec) -> Self {
        Self {
            codec,
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
        }
    }

    /// Push data and extract every segment it completes.
    ///
    /// # Errors
    ///
    /// Returns the first checksum or decompression failure. The stream
    /// cannot be resynchronized afterwards; drop the buffer.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Segment>> {
        self.buffer.extend_from_slice(data);

        let mut segments = Vec::new();
        while let Some(segment) = self.try_extract_one()? {
            segments.push(segment);
        }
        Ok(segments)
    }

    fn try_extract_one(&mut self) -> Result<Option<Segment>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    let length = self.codec.encoded_header_length();
                    if self.buffer.len() < length {
                        return Ok(None);
                    }
                    let mut header_bytes = self.buffer.split_to(length).freeze();
                    let header = self.codec.decode_header(&mut header_bytes)?;
                    self.state = State::WaitingForPayload { header };
                }
                State::WaitingForPayload { header } => {
                    let length = header.payload_length + TRAILER_LENGTH;
                    if self.buffer.len() < length {
                        return Ok(None);
                    }
                    let src = self.buffer.split_to(length).freeze();
                    self.state = State::WaitingForHeader;
                    return self.codec.decode(&header, src).map(Some);
                }
            }
        }
    }

    /// Number of buffered bytes not yet consumed by a segment.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
