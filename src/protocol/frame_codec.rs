//! Frame encoding and decoding.
//!
//! Body layout, in order: tracing id (16 bytes, only if present), custom
//! payload (only if non-empty), warnings (only if non-empty), then the
//! message payload.
//!
//! Two encode strategies:
//! - **uncompressed**: the body size is known up front, so header and body
//!   are written into a single exact-size buffer.
//! - **compressed**: the body size is only known after compression, so the
//!   body is encoded on its own, compressed, and the header is written in
//!   front of the compressed bytes.

use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};

use super::frame::{Frame, NO_SIZE};
use super::wire_format::{flags, peek_body_length, FrameHeader, HEADER_SIZE};
use super::{primitives, sizes, version};
use crate::compression::{self, Compressor};
use crate::error::{Result, WireError};
use crate::message::{opcodes, MessageCodec};
use crate::registry::{ClientCodecs, CodecGroup, CodecRegistry, ServerCodecs};

/// Encodes and decodes frames.
///
/// Immutable once built; share it behind an `Arc` across connections.
#[derive(Debug)]
pub struct FrameCodec {
    registry: CodecRegistry,
    compressor: Arc<dyn Compressor>,
}

impl FrameCodec {
    /// Create a codec from a registry and a compressor.
    pub fn new(registry: CodecRegistry, compressor: Arc<dyn Compressor>) -> Self {
        Self {
            registry,
            compressor,
        }
    }

    /// Client-side codec for every supported version.
    pub fn default_client(compressor: Arc<dyn Compressor>) -> Self {
        let groups: Vec<ClientCodecs> = version::SUPPORTED
            .iter()
            .map(|&v| ClientCodecs::new(v))
            .collect();
        let groups: Vec<&dyn CodecGroup> = groups.iter().map(|g| g as &dyn CodecGroup).collect();
        Self::new(CodecRegistry::from_groups(&groups), compressor)
    }

    /// Server-side codec for every supported version.
    pub fn default_server(compressor: Arc<dyn Compressor>) -> Self {
        let groups: Vec<ServerCodecs> = version::SUPPORTED
            .iter()
            .map(|&v| ServerCodecs::new(v))
            .collect();
        let groups: Vec<&dyn CodecGroup> = groups.iter().map(|g| g as &dyn CodecGroup).collect();
        Self::new(CodecRegistry::from_groups(&groups), compressor)
    }

    /// The configured compressor.
    pub fn compressor(&self) -> &Arc<dyn Compressor> {
        &self.compressor
    }

    /// Header size of `frame`. Fixed for every supported version.
    #[inline]
    pub fn encoded_header_size(&self, _frame: &Frame) -> usize {
        HEADER_SIZE
    }

    /// Exact uncompressed body size of `frame`.
    pub fn encoded_body_size(&self, frame: &Frame) -> Result<usize> {
        let encoder = self.registry.encoder(frame.protocol_version, frame.opcode())?;
        Self::body_size(frame, encoder)
    }

    /// Flags the header of `frame` will carry when encoded with [`Self::encode`].
    pub fn compute_flags(&self, frame: &Frame) -> u8 {
        let mut out = 0;
        if !self.compressor.is_noop() && !opcodes::is_bootstrap(frame.opcode()) {
            out |= flags::COMPRESSED;
        }
        if frame.tracing || frame.tracing_id.is_some() {
            out |= flags::TRACING;
        }
        if !frame.custom_payload.is_empty() {
            out |= flags::CUSTOM_PAYLOAD;
        }
        if !frame.warnings.is_empty() {
            out |= flags::WARNING;
        }
        if frame.is_beta() {
            out |= flags::USE_BETA;
        }
        out
    }

    /// Encode `frame` into a new buffer, compressing the body if configured.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnsupportedOpcode`] if no encoder is registered
    /// for the frame's version and opcode, or a protocol error if the frame
    /// breaks a version invariant.
    pub fn encode(&self, frame: &Frame) -> Result<Bytes> {
        frame.validate()?;
        let encoder = self.registry.encoder(frame.protocol_version, frame.opcode())?;
        let frame_flags = self.compute_flags(frame);

        if frame_flags & flags::COMPRESSED == 0 {
            let body_size = Self::body_size(frame, encoder)?;
            let mut dst = BytesMut::with_capacity(HEADER_SIZE + body_size);
            Self::write_header(frame, frame_flags, body_size, &mut dst)?;
            Self::write_body(frame, encoder, &mut dst)?;
            tracing::trace!(
                stream_id = frame.stream_id,
                opcode = frame.opcode(),
                size = dst.len(),
                "Encoded frame"
            );
            return Ok(dst.freeze());
        }

        let mut body = BytesMut::with_capacity(Self::body_size(frame, encoder)?);
        Self::write_body(frame, encoder, &mut body)?;
        let uncompressed_size = body.len();
        let compressed = self.compressor.compress(body.freeze())?;

        let mut dst = BytesMut::with_capacity(HEADER_SIZE + compressed.len());
        Self::write_header(frame, frame_flags, compressed.len(), &mut dst)?;
        dst.extend_from_slice(&compressed);
        tracing::trace!(
            stream_id = frame.stream_id,
            opcode = frame.opcode(),
            uncompressed_size,
            compressed_size = compressed.len(),
            "Encoded compressed frame"
        );
        Ok(dst.freeze())
    }

    /// Append `frame` to `dst` without compression.
    ///
    /// `body_size` may be passed when the caller already computed it with
    /// [`Self::encoded_body_size`]; otherwise it is computed here.
    pub fn encode_into(
        &self,
        frame: &Frame,
        body_size: Option<usize>,
        dst: &mut BytesMut,
    ) -> Result<()> {
        frame.validate()?;
        let encoder = self.registry.encoder(frame.protocol_version, frame.opcode())?;
        let body_size = match body_size {
            Some(size) => size,
            None => Self::body_size(frame, encoder)?,
        };
        let frame_flags = self.compute_flags(frame) & !flags::COMPRESSED;

        dst.reserve(HEADER_SIZE + body_size);
        let start = dst.len();
        Self::write_header(frame, frame_flags, body_size, dst)?;
        Self::write_body(frame, encoder, dst)?;

        let written = dst.len() - start - HEADER_SIZE;
        if written != body_size {
            return Err(WireError::Protocol(format!(
                "encoded body of opcode 0x{:02X} is {} bytes, expected {}",
                frame.opcode(),
                written,
                body_size
            )));
        }
        Ok(())
    }

    /// Decode one complete frame; `src` must hold exactly one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the declared body length does not match the bytes
    /// available, decompression fails, or no decoder is registered.
    pub fn decode(&self, mut src: Bytes) -> Result<Frame> {
        let header = FrameHeader::decode(&src).ok_or(WireError::Truncated {
            needed: HEADER_SIZE,
            available: src.len(),
        })?;
        src.advance(HEADER_SIZE);

        let declared = usize::try_from(header.body_length).map_err(|_| {
            WireError::Protocol(format!("negative body length {}", header.body_length))
        })?;
        if src.len() != declared {
            return Err(WireError::Protocol(format!(
                "declared length in header ({}) does not match actual length ({})",
                declared,
                src.len()
            )));
        }

        let (size, compressed_size) = if header.is_compressed() {
            src = self.compressor.decompress(src)?;
            (
                (HEADER_SIZE + src.len()) as i32,
                (HEADER_SIZE + declared) as i32,
            )
        } else {
            ((HEADER_SIZE + declared) as i32, NO_SIZE)
        };

        let tracing = header.has_flag(flags::TRACING);
        let tracing_id = if header.is_response && tracing {
            Some(primitives::read_uuid(&mut src)?)
        } else {
            None
        };
        let custom_payload = if header.has_flag(flags::CUSTOM_PAYLOAD) {
            primitives::read_bytes_map(&mut src)?
        } else {
            Default::default()
        };
        let warnings = if header.is_response && header.has_flag(flags::WARNING) {
            primitives::read_string_list(&mut src)?
        } else {
            Vec::new()
        };

        let decoder = self.registry.decoder(header.version, header.opcode)?;
        let message = decoder.decode(&mut src)?;
        if !src.is_empty() {
            tracing::trace!(
                opcode = header.opcode,
                trailing = src.len(),
                "Ignoring trailing bytes after message body"
            );
        }

        tracing::trace!(
            stream_id = header.stream_id,
            opcode = header.opcode,
            size,
            "Decoded frame"
        );

        Ok(Frame {
            protocol_version: header.version,
            stream_id: header.stream_id,
            tracing,
            tracing_id,
            size,
            compressed_size,
            custom_payload,
            warnings,
            message,
        })
    }

    /// Peek at the body length of the frame at the start of `src`.
    ///
    /// Consumes nothing. Returns `None` until a full header is available.
    #[inline]
    pub fn decode_body_size(src: &[u8]) -> Option<i32> {
        peek_body_length(src)
    }

    fn body_size(frame: &Frame, encoder: &dyn MessageCodec) -> Result<usize> {
        let mut size = 0;
        if frame.tracing_id.is_some() {
            size += sizes::UUID_SIZE;
        }
        if !frame.custom_payload.is_empty() {
            size += sizes::size_of_bytes_map(&frame.custom_payload);
        }
        if !frame.warnings.is_empty() {
            size += sizes::size_of_string_list(&frame.warnings);
        }
        Ok(size + encoder.encoded_size(&frame.message)?)
    }

    fn write_header(
        frame: &Frame,
        frame_flags: u8,
        body_size: usize,
        dst: &mut BytesMut,
    ) -> Result<()> {
        let body_length = i32::try_from(body_size)
            .map_err(|_| WireError::Protocol(format!("frame body of {} bytes", body_size)))?;
        let header = FrameHeader {
            version: frame.protocol_version,
            is_response: frame.is_response(),
            flags: frame_flags,
            stream_id: frame.stream_id,
            opcode: frame.opcode(),
            body_length,
        };
        dst.extend_from_slice(&header.encode());
        Ok(())
    }

    fn write_body(frame: &Frame, encoder: &dyn MessageCodec, dst: &mut BytesMut) -> Result<()> {
        if let Some(tracing_id) = &frame.tracing_id {
            primitives::write_uuid(dst, tracing_id);
        }
        if !frame.custom_payload.is_empty() {
            primitives::write_bytes_map(dst, &frame.custom_payload)?;
        }
        if !frame.warnings.is_empty() {
            primitives::write_string_list(dst, &frame.warnings)?;
        }
        encoder.encode(&frame.message, dst)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::default_client(compression::noop())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use uuid::Uuid;

    use super::*;
    use crate::compression::Lz4Compressor;
    use crate::message::{Message, Query};

    fn options_frame(v: u8, stream_id: i16) -> Frame {
        Frame::request(v, stream_id, false, HashMap::new(), Message::Options).unwrap()
    }

    #[test]
    fn test_options_v4_exact_bytes() {
        let codec = FrameCodec::default();
        let bytes = codec.encode(&options_frame(version::V4, 2)).unwrap();
        assert_eq!(&bytes[..], &[0x04, 0x00, 0x00, 0x02, 0x05, 0, 0, 0, 0]);
    }

    #[test]
    fn test_bootstrap_never_compressed() {
        let codec = FrameCodec::default_client(Arc::new(Lz4Compressor));
        let options = options_frame(version::V4, 1);
        assert_eq!(codec.compute_flags(&options) & flags::COMPRESSED, 0);

        let startup = Frame::request(
            version::V4,
            1,
            false,
            HashMap::new(),
            Message::startup([("COMPRESSION", "lz4")]),
        )
        .unwrap();
        assert_eq!(codec.compute_flags(&startup) & flags::COMPRESSED, 0);

        let query = Frame::request(
            version::V4,
            1,
            false,
            HashMap::new(),
            Message::Query(Query::new("SELECT 1")),
        )
        .unwrap();
        assert_ne!(codec.compute_flags(&query) & flags::COMPRESSED, 0);
    }

    #[test]
    fn test_noop_compressor_never_sets_flag() {
        let codec = FrameCodec::default();
        let query = Frame::request(
            version::V4,
            1,
            true,
            HashMap::new(),
            Message::Query(Query::new("SELECT 1")),
        )
        .unwrap();
        assert_eq!(codec.compute_flags(&query), flags::TRACING);
    }

    #[test]
    fn test_beta_flag() {
        let codec = FrameCodec::default();
        let frame = options_frame(version::BETA, 1);
        assert_eq!(codec.compute_flags(&frame), flags::USE_BETA);
        let bytes = codec.encode(&frame).unwrap();
        assert!(flags::has_flag(bytes[1], flags::USE_BETA));
        let mut decoded = FrameCodec::default_server(compression::noop())
            .decode(bytes)
            .unwrap();
        assert!(decoded.is_beta());
        assert_eq!(decoded.size, HEADER_SIZE as i32);
        decoded.size = NO_SIZE;
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_encode_into_appends() {
        let codec = FrameCodec::default();
        let mut dst = BytesMut::new();
        codec
            .encode_into(&options_frame(version::V5, 1), None, &mut dst)
            .unwrap();
        codec
            .encode_into(&options_frame(version::V5, 2), Some(0), &mut dst)
            .unwrap();
        assert_eq!(dst.len(), 2 * HEADER_SIZE);
        assert_eq!(dst[3], 1);
        assert_eq!(dst[HEADER_SIZE + 3], 2);
    }

    #[test]
    fn test_encode_into_rejects_wrong_body_size() {
        let codec = FrameCodec::default();
        let mut dst = BytesMut::new();
        let err = codec
            .encode_into(&options_frame(version::V5, 1), Some(3), &mut dst)
            .unwrap_err();
        assert!(err.to_string().contains("expected 3"));
    }

    #[test]
    fn test_encode_into_ignores_compressor() {
        let codec = FrameCodec::default_client(Arc::new(Lz4Compressor));
        let frame = Frame::request(
            version::V5,
            1,
            false,
            HashMap::new(),
            Message::Query(Query::new("SELECT 1")),
        )
        .unwrap();
        let mut dst = BytesMut::new();
        codec.encode_into(&frame, None, &mut dst).unwrap();
        assert_eq!(dst[1] & flags::COMPRESSED, 0);
        assert_eq!(dst.len(), HEADER_SIZE + codec.encoded_body_size(&frame).unwrap());
    }

    #[test]
    fn test_unsupported_opcode_on_encode() {
        let codec = FrameCodec::default_client(compression::noop());
        let frame = Frame::response(
            version::V4,
            1,
            None,
            HashMap::new(),
            vec![],
            Message::Ready,
        )
        .unwrap();
        assert!(matches!(
            codec.encode(&frame),
            Err(WireError::UnsupportedOpcode { .. })
        ));
    }

    #[test]
    fn test_hand_built_frame_validated_on_encode() {
        let mut frame = options_frame(version::V3, 1);
        frame.warnings.push("nope".to_string());
        assert!(FrameCodec::default().encode(&frame).is_err());
    }

    #[test]
    fn test_decode_length_mismatch() {
        let client = FrameCodec::default();
        let server = FrameCodec::default_server(compression::noop());
        let mut bytes = BytesMut::from(&client.encode(&options_frame(version::V4, 1)).unwrap()[..]);
        bytes.extend_from_slice(&[0xAA]);

        let err = server.decode(bytes.freeze()).unwrap_err();
        assert!(err.to_string().contains("does not match actual length"));
    }

    #[test]
    fn test_decode_truncated_header() {
        let server = FrameCodec::default_server(compression::noop());
        assert!(matches!(
            server.decode(Bytes::from_static(&[0x04, 0x00])),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_size_diagnostics() {
        let client = FrameCodec::default_client(Arc::new(Lz4Compressor));
        let server = FrameCodec::default_server(Arc::new(Lz4Compressor));
        let query = Query::new("SELECT * FROM system.peers WHERE ".repeat(20));
        let frame =
            Frame::request(version::V4, 3, false, HashMap::new(), Message::Query(query)).unwrap();

        let uncompressed_size = HEADER_SIZE + client.encoded_body_size(&frame).unwrap();
        let bytes = client.encode(&frame).unwrap();
        let decoded = server.decode(bytes.clone()).unwrap();

        assert_eq!(decoded.size, uncompressed_size as i32);
        assert_eq!(decoded.compressed_size, bytes.len() as i32);
        assert!(decoded.compressed_size < decoded.size);

        let plain = FrameCodec::default_server(compression::noop())
            .decode(FrameCodec::default().encode(&frame).unwrap())
            .unwrap();
        assert_eq!(plain.size, uncompressed_size as i32);
        assert_eq!(plain.compressed_size, NO_SIZE);
    }

    #[test]
    fn test_tracing_id_only_read_on_responses() {
        let server = FrameCodec::default_server(compression::noop());
        let client = FrameCodec::default_client(compression::noop());
        let id = Uuid::from_u128(0xDEADBEEF);

        let response = Frame::response(
            version::V4,
            9,
            Some(id),
            HashMap::new(),
            vec!["w".to_string()],
            Message::Ready,
        )
        .unwrap();
        let decoded = client.decode(server.encode(&response).unwrap()).unwrap();
        assert_eq!(decoded.tracing_id, Some(id));
        assert_eq!(decoded.warnings, vec!["w".to_string()]);

        let request = Frame::request(version::V4, 9, true, HashMap::new(), Message::Options)
            .unwrap();
        let decoded = server.decode(client.encode(&request).unwrap()).unwrap();
        assert!(decoded.tracing);
        assert!(decoded.tracing_id.is_none());
    }

    #[test]
    fn test_decode_body_size_peeks() {
        let codec = FrameCodec::default();
        let frame = Frame::request(
            version::V4,
            1,
            false,
            HashMap::new(),
            Message::Query(Query::new("abc")),
        )
        .unwrap();
        let bytes = codec.encode(&frame).unwrap();
        assert_eq!(
            FrameCodec::decode_body_size(&bytes),
            Some((bytes.len() - HEADER_SIZE) as i32)
        );
        assert_eq!(FrameCodec::decode_body_size(&bytes[..8]), None);
    }
}
