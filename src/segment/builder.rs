//! Batching of outbound frames into segments.
//!
//! Small frames accumulate until the next one would push the pending
//! payload over the limit; the pending frames are then flushed as one
//! self-contained segment. A frame larger than the limit is encoded on its
//! own and cut into non-self-contained slices right away, leaving the
//! pending batch untouched.
//!
//! Each frame travels with a caller state `S` (typically a completion
//! handle). A [`SegmentStates`] policy merges the states of a batch and
//! splits the state of a large frame across its slices.
//!
//! Not thread-safe: one builder per connection write path.

use std::fmt;
use std::mem;
use std::sync::Arc;

use bytes::BytesMut;

use super::{Segment, MAX_PAYLOAD_LENGTH};
use crate::error::{Result, WireError};
use crate::protocol::{version, Frame, FrameCodec};

/// How per-frame states combine when frames share or split segments.
pub trait SegmentStates<S> {
    /// Merge the states of the frames batched into one segment, in order.
    fn merge_states(&self, states: Vec<S>) -> S;

    /// Split the state of a large frame into exactly `count` parts.
    fn split_state(&self, state: S, count: usize) -> Vec<S>;
}

/// Policy for builders that carry no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoState;

impl SegmentStates<()> for NoState {
    fn merge_states(&self, _states: Vec<()>) {}

    fn split_state(&self, _state: (), count: usize) -> Vec<()> {
        vec![(); count]
    }
}

/// Observer hooks called by [`SegmentBuilder`]. All default to no-ops.
#[allow(unused_variables)]
pub trait SegmentListener {
    /// A frame larger than the limit is about to be sliced.
    fn on_large_frame_split(&mut self, frame: &Frame, frame_length: usize, slice_count: usize) {}

    /// `frame` does not fit in the pending batch, which is about to be flushed.
    fn on_segment_full(
        &mut self,
        frame: &Frame,
        frame_length: usize,
        current_payload_length: usize,
        current_frame_count: usize,
    ) {
    }

    /// `frame` joined the pending batch.
    fn on_small_frame_added(
        &mut self,
        frame: &Frame,
        frame_length: usize,
        current_payload_length: usize,
        current_frame_count: usize,
    ) {
    }

    /// The pending batch was emitted as one self-contained segment.
    fn on_self_contained_segment_flushed(&mut self, payload_length: usize, frame_count: usize) {}
}

/// Accumulates frames and emits segments paired with their states.
pub struct SegmentBuilder<S, P> {
    frame_codec: Arc<FrameCodec>,
    states: P,
    max_payload_length: usize,
    listener: Option<Box<dyn SegmentListener + Send>>,
    /// Encoded pending frames, back to back.
    current_payload: BytesMut,
    current_states: Vec<S>,
}

impl<S, P: SegmentStates<S>> SegmentBuilder<S, P> {
    /// Create a builder using the largest allowed segment payload.
    pub fn new(frame_codec: Arc<FrameCodec>, states: P) -> Self {
        Self {
            frame_codec,
            states,
            max_payload_length: MAX_PAYLOAD_LENGTH,
            listener: None,
            current_payload: BytesMut::new(),
            current_states: Vec::new(),
        }
    }

    /// Create a builder with a custom payload limit.
    ///
    /// # Errors
    ///
    /// Returns a protocol error unless `1 <= max_payload_length <= MAX_PAYLOAD_LENGTH`.
    pub fn with_max_payload_length(
        frame_codec: Arc<FrameCodec>,
        states: P,
        max_payload_length: usize,
    ) -> Result<Self> {
        if max_payload_length == 0 || max_payload_length > MAX_PAYLOAD_LENGTH {
            return Err(WireError::Protocol(format!(
                "segment payload limit must be between 1 and {}, got {}",
                MAX_PAYLOAD_LENGTH, max_payload_length
            )));
        }
        let mut builder = Self::new(frame_codec, states);
        builder.max_payload_length = max_payload_length;
        Ok(builder)
    }

    /// Attach an observer.
    pub fn with_listener(mut self, listener: Box<dyn SegmentListener + Send>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Payload limit in bytes.
    pub fn max_payload_length(&self) -> usize {
        self.max_payload_length
    }

    /// Encoded length of the pending batch.
    pub fn current_payload_length(&self) -> usize {
        self.current_payload.len()
    }

    /// Number of pending frames.
    pub fn current_frame_count(&self) -> usize {
        self.current_states.len()
    }

    /// Add a frame and return the segments that became ready.
    ///
    /// A large frame yields all its slices at once. A small frame yields the
    /// previous batch if it no longer fits, otherwise nothing. Landing
    /// exactly on the limit does not flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame's version predates segments, the frame
    /// cannot be encoded, or the state policy splits a state into the wrong
    /// number of parts. On error the pending batch is left as it was.
    pub fn add_frame(&mut self, frame: Frame, state: S) -> Result<Vec<(Segment, S)>> {
        if !version::uses_segments(frame.protocol_version) {
            return Err(WireError::Protocol(format!(
                "protocol v{} does not use segments",
                frame.protocol_version
            )));
        }
        let body_size = self.frame_codec.encoded_body_size(&frame)?;
        let frame_length = self.frame_codec.encoded_header_size(&frame) + body_size;

        if frame_length > self.max_payload_length {
            return self.split_large_frame(&frame, body_size, frame_length, state);
        }

        // Encode before touching the batch so a bad frame fails alone.
        let mut encoded = BytesMut::with_capacity(frame_length);
        self.frame_codec
            .encode_into(&frame, Some(body_size), &mut encoded)?;

        let mut ready = Vec::new();
        if self.current_payload.len() + frame_length > self.max_payload_length {
            if let Some(listener) = self.listener.as_mut() {
                listener.on_segment_full(
                    &frame,
                    frame_length,
                    self.current_payload.len(),
                    self.current_states.len(),
                );
            }
            ready.extend(self.flush());
        }

        self.current_payload.unsplit(encoded);
        self.current_states.push(state);
        if let Some(listener) = self.listener.as_mut() {
            listener.on_small_frame_added(
                &frame,
                frame_length,
                self.current_payload.len(),
                self.current_states.len(),
            );
        }
        Ok(ready)
    }

    fn split_large_frame(
        &mut self,
        frame: &Frame,
        body_size: usize,
        frame_length: usize,
        state: S,
    ) -> Result<Vec<(Segment, S)>> {
        let slice_count = frame_length.div_ceil(self.max_payload_length);
        if let Some(listener) = self.listener.as_mut() {
            listener.on_large_frame_split(frame, frame_length, slice_count);
        }

        let mut encoded = BytesMut::with_capacity(frame_length);
        self.frame_codec
            .encode_into(frame, Some(body_size), &mut encoded)?;
        let mut encoded = encoded.freeze();

        let parts = self.states.split_state(state, slice_count);
        if parts.len() != slice_count {
            return Err(WireError::Protocol(format!(
                "state split into {} parts, expected {}",
                parts.len(),
                slice_count
            )));
        }

        tracing::debug!(
            stream_id = frame.stream_id,
            frame_length,
            slice_count,
            "Splitting large frame across segments"
        );

        let mut slices = Vec::with_capacity(slice_count);
        for part in parts {
            let length = encoded.len().min(self.max_payload_length);
            slices.push((Segment::new(encoded.split_to(length), false), part));
        }
        Ok(slices)
    }

    /// Emit the pending batch as one self-contained segment, if any.
    ///
    /// Call after the last frame of a write burst.
    pub fn flush(&mut self) -> Option<(Segment, S)> {
        if self.current_states.is_empty() {
            return None;
        }

        let payload = self.current_payload.split().freeze();
        let states = mem::take(&mut self.current_states);

        if let Some(listener) = self.listener.as_mut() {
            listener.on_self_contained_segment_flushed(payload.len(), states.len());
        }
        tracing::trace!(
            payload_length = payload.len(),
            frame_count = states.len(),
            "Flushed self-contained segment"
        );

        let state = self.states.merge_states(states);
        Some((Segment::new(payload, true), state))
    }
}

impl<S, P> fmt::Debug for SegmentBuilder<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentBuilder")
            .field("max_payload_length", &self.max_payload_length)
            .field("current_frame_count", &self.current_states.len())
            .field("current_payload_length", &self.current_payload.len())
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}
