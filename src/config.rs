//! Codec configuration.
//!
//! Deserializable from any serde format; missing fields take their defaults.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compression::{self, Compressor, Lz4Compressor};
use crate::error::{Result, WireError};
use crate::protocol::FrameCodec;
use crate::segment::{SegmentBuilder, SegmentCodec, SegmentStates, MAX_PAYLOAD_LENGTH};

/// Default segment payload limit.
pub const DEFAULT_MAX_SEGMENT_PAYLOAD_LENGTH: usize = MAX_PAYLOAD_LENGTH;

/// Negotiated body compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    /// No compression.
    #[default]
    None,
    /// LZ4 block compression.
    Lz4,
}

/// Configuration for building frame and segment codecs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Compression used for frame bodies and segment payloads.
    pub compression: CompressionKind,
    /// Segment payload limit used by [`SegmentBuilder`].
    pub max_segment_payload_length: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression: CompressionKind::None,
            max_segment_payload_length: DEFAULT_MAX_SEGMENT_PAYLOAD_LENGTH,
        }
    }
}

impl CodecConfig {
    /// Check field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_segment_payload_length == 0
            || self.max_segment_payload_length > MAX_PAYLOAD_LENGTH
        {
            return Err(WireError::Protocol(format!(
                "max_segment_payload_length must be between 1 and {}, got {}",
                MAX_PAYLOAD_LENGTH, self.max_segment_payload_length
            )));
        }
        Ok(())
    }

    /// The configured compressor.
    pub fn compressor(&self) -> Arc<dyn Compressor> {
        match self.compression {
            CompressionKind::None => compression::noop(),
            CompressionKind::Lz4 => Arc::new(Lz4Compressor),
        }
    }

    /// Frame codec for the client role, covering every supported version.
    pub fn client_frame_codec(&self) -> FrameCodec {
        FrameCodec::default_client(self.compressor())
    }

    /// Frame codec for the server role, covering every supported version.
    pub fn server_frame_codec(&self) -> FrameCodec {
        FrameCodec::default_server(self.compressor())
    }

    /// Segment codec using the configured compressor.
    pub fn segment_codec(&self) -> SegmentCodec {
        SegmentCodec::new(self.compressor())
    }

    /// Segment builder over `frame_codec` using the configured limit.
    pub fn segment_builder<S, P: SegmentStates<S>>(
        &self,
        frame_codec: Arc<FrameCodec>,
        states: P,
    ) -> Result<SegmentBuilder<S, P>> {
        self.validate()?;
        SegmentBuilder::with_max_payload_length(frame_codec, states, self.max_segment_payload_length)
    }
}
