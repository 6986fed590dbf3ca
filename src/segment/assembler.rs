//! Reassembly of raw frames from decoded segments.
//!
//! A self-contained segment is cut into its frames. Slices of a large frame
//! are concatenated until the length declared in the first slice's frame
//! header is reached.

use bytes::{Bytes, BytesMut};

use super::Segment;
use crate::error::{Result, WireError};
use crate::protocol::{FrameCodec, HEADER_SIZE};

/// Turns segments back into raw frames ready for [`FrameCodec::decode`].
#[derive(Debug, Default)]
pub struct FrameAssembler {
    partial: BytesMut,
    expected_length: Option<usize>,
}

impl FrameAssembler {
    /// Create an assembler with no frame in progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether slices of a large frame are pending.
    pub fn is_mid_frame(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Feed one segment, returning the frames it completes.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if a self-contained segment arrives while a
    /// large frame is incomplete, a self-contained payload ends inside a
    /// frame, or a slice runs past the end of its frame.
    pub fn push(&mut self, segment: Segment) -> Result<Vec<Bytes>> {
        if segment.is_self_contained {
            if self.is_mid_frame() {
                return Err(WireError::Protocol(format!(
                    "self-contained segment received with {} bytes of a sliced frame pending",
                    self.partial.len()
                )));
            }
            return Self::split_frames(segment.payload);
        }

        self.partial.extend_from_slice(&segment.payload);
        if self.expected_length.is_none() {
            if let Some(body_length) = FrameCodec::decode_body_size(&self.partial) {
                self.expected_length = Some(HEADER_SIZE + checked_length(body_length)?);
            }
        }

        match self.expected_length {
            Some(expected) if self.partial.len() > expected => Err(WireError::Protocol(format!(
                "frame slices overrun declared frame length {} by {} bytes",
                expected,
                self.partial.len() - expected
            ))),
            Some(expected) if self.partial.len() == expected => {
                self.expected_length = None;
                Ok(vec![self.partial.split().freeze()])
            }
            _ => Ok(Vec::new()),
        }
    }

    fn split_frames(mut payload: Bytes) -> Result<Vec<Bytes>> {
        let mut frames = Vec::new();
        while !payload.is_empty() {
            let body_length = FrameCodec::decode_body_size(&payload).ok_or_else(|| {
                WireError::Protocol(format!(
                    "self-contained segment ends inside a frame header ({} bytes left)",
                    payload.len()
                ))
            })?;
            let frame_length = HEADER_SIZE + checked_length(body_length)?;
            if frame_length > payload.len() {
                return Err(WireError::Protocol(format!(
                    "self-contained segment ends inside a frame: need {} bytes, {} left",
                    frame_length,
                    payload.len()
                )));
            }
            frames.push(payload.split_to(frame_length));
        }
        Ok(frames)
    }
}

fn checked_length(body_length: i32) -> Result<usize> {
    usize::try_from(body_length)
        .map_err(|_| WireError::Protocol(format!("negative frame body length {}", body_length)))
}
