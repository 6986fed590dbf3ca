//! Frame buffer for accumulating partial reads.
//!
//! Cuts a byte stream of pre-segment protocol versions into complete raw
//! frames (header plus body) ready for [`FrameCodec::decode`]:
//! - `WaitingForHeader`: need at least 9 bytes
//! - `WaitingForBody`: body length known, need the rest of the frame
//!
//! # Example
//!
//! ```
//! use native_protocol::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // OPTIONS on stream 2, split across two reads
//! assert!(buffer.push(&[0x04, 0x00, 0x00]).unwrap().is_empty());
//! let frames = buffer.push(&[0x02, 0x05, 0, 0, 0, 0]).unwrap();
//! assert_eq!(frames.len(), 1);
//! ```
//!
//! [`FrameCodec::decode`]: super::FrameCodec::decode

use bytes::{Bytes, BytesMut};

use super::frame_codec::FrameCodec;
use super::wire_format::HEADER_SIZE;
use crate::error::{Result, WireError};

/// Default upper bound on a frame body: 256 MiB.
pub const DEFAULT_MAX_BODY_LENGTH: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
enum State {
    WaitingForHeader,
    WaitingForBody { frame_length: usize },
}

/// Accumulates incoming bytes and extracts complete raw frames.
#[derive(Debug)]
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_body_length: usize,
}

impl FrameBuffer {
    /// Create a buffer with a 64KB initial capacity and the default body limit.
    pub fn new() -> Self {
        Self::with_max_body_length(DEFAULT_MAX_BODY_LENGTH)
    }

    /// Create a buffer rejecting bodies longer than `max_body_length`.
    pub fn with_max_body_length(max_body_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            state: State::WaitingForHeader,
            max_body_length,
        }
    }

    /// Push data and extract every frame it completes.
    ///
    /// Partial data stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if a header declares a negative body length
    /// or one above the configured maximum. The buffer should be dropped
    /// after an error.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.state {
                State::WaitingForHeader => {
                    let Some(body_length) = FrameCodec::decode_body_size(&self.buffer) else {
                        return Ok(None);
                    };
                    let body_length = usize::try_from(body_length).map_err(|_| {
                        WireError::Protocol(format!("negative frame body length {}", body_length))
                    })?;
                    if body_length > self.max_body_length {
                        return Err(WireError::Protocol(format!(
                            "frame body length {} exceeds maximum {}",
                            body_length, self.max_body_length
                        )));
                    }
                    self.state = State::WaitingForBody {
                        frame_length: HEADER_SIZE + body_length,
                    };
                }
                State::WaitingForBody { frame_length } => {
                    if self.buffer.len() < frame_length {
                        return Ok(None);
                    }
                    self.state = State::WaitingForHeader;
                    return Ok(Some(self.buffer.split_to(frame_length).freeze()));
                }
            }
        }
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop buffered bytes and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
