//! Segment encoding and decoding.
//!
//! Header data bits, from the low end:
//! ```text
//! payload length (17) | [uncompressed length (17)] | self-contained (1) | padding
//! ```
//! The uncompressed length field only exists when compression is configured,
//! which makes the header 5 bytes instead of 3. The CRC-24 covers exactly the
//! header bytes.

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::crc::{crc24, crc32};
use super::{Segment, SegmentHeader, CRC24_LENGTH, MAX_PAYLOAD_LENGTH, TRAILER_LENGTH};
use crate::compression::Compressor;
use crate::error::{ChecksumTarget, Result, WireError};

const LENGTH_BITS: u32 = 17;
const LENGTH_MASK: u64 = (1 << LENGTH_BITS) - 1;

const HEADER_LENGTH: usize = 3;
const COMPRESSED_HEADER_LENGTH: usize = 5;

/// The three wire pieces of one segment, in write order.
///
/// Kept apart so a writer can hand them to the transport without
/// concatenating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSegment {
    /// Bit-packed header followed by its CRC-24.
    pub header: Bytes,
    /// Payload as sent, compressed or not.
    pub payload: Bytes,
    /// CRC-32 of the payload.
    pub trailer: Bytes,
}

impl EncodedSegment {
    /// Total length on the wire.
    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len() + self.trailer.len()
    }

    /// Always false: a segment has at least a header and a trailer.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Concatenate the three pieces into one buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.len());
        out.put_slice(&self.header);
        out.put_slice(&self.payload);
        out.put_slice(&self.trailer);
        out.freeze()
    }
}

/// Encodes and decodes segments.
///
/// Whether the header carries the uncompressed length is fixed by the
/// compressor: any compressor other than the no-op one enables it.
#[derive(Debug, Clone)]
pub struct SegmentCodec {
    compressor: Arc<dyn Compressor>,
    compress: bool,
}

impl SegmentCodec {
    /// Create a codec using `compressor` for segment payloads.
    pub fn new(compressor: Arc<dyn Compressor>) -> Self {
        let compress = !compressor.is_noop();
        Self {
            compressor,
            compress,
        }
    }

    /// Header data length in bytes, CRC-24 excluded.
    #[inline]
    pub fn header_length(&self) -> usize {
        if self.compress {
            COMPRESSED_HEADER_LENGTH
        } else {
            HEADER_LENGTH
        }
    }

    /// Header length including the CRC-24.
    #[inline]
    pub fn encoded_header_length(&self) -> usize {
        self.header_length() + CRC24_LENGTH
    }

    /// Whether segment payloads are compressed.
    pub fn compression_enabled(&self) -> bool {
        self.compress
    }

    /// Encode `segment` into its header, payload and trailer.
    ///
    /// With compression configured, a payload that does not shrink is sent
    /// as is, with an uncompressed length of 0.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the payload exceeds [`MAX_PAYLOAD_LENGTH`].
    pub fn encode(&self, segment: Segment) -> Result<EncodedSegment> {
        let Segment {
            payload,
            is_self_contained,
        } = segment;
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(WireError::Protocol(format!(
                "segment payload of {} bytes exceeds maximum {}",
                payload.len(),
                MAX_PAYLOAD_LENGTH
            )));
        }

        let (payload, uncompressed_payload_length) = if self.compress {
            let compressed = self.compressor.compress_without_length(&payload)?;
            if compressed.len() >= payload.len() {
                tracing::trace!(
                    length = payload.len(),
                    compressed_length = compressed.len(),
                    "Segment compression skipped"
                );
                (payload, Some(0))
            } else {
                let uncompressed = payload.len();
                (compressed, Some(uncompressed))
            }
        } else {
            (payload, None)
        };

        let header = SegmentHeader {
            payload_length: payload.len(),
            uncompressed_payload_length,
            is_self_contained,
        };
        let mut header_bytes = BytesMut::with_capacity(self.encoded_header_length());
        self.write_header(&header, &mut header_bytes);

        let mut trailer = BytesMut::with_capacity(TRAILER_LENGTH);
        trailer.put_u32_le(crc32(&payload));

        Ok(EncodedSegment {
            header: header_bytes.freeze(),
            payload,
            trailer: trailer.freeze(),
        })
    }

    fn write_header(&self, header: &SegmentHeader, dst: &mut BytesMut) {
        let mut data = header.payload_length as u64 & LENGTH_MASK;
        let mut flag_shift = LENGTH_BITS;
        if self.compress {
            let uncompressed = header.uncompressed_payload_length.unwrap_or(0) as u64;
            data |= (uncompressed & LENGTH_MASK) << LENGTH_BITS;
            flag_shift += LENGTH_BITS;
        }
        if header.is_self_contained {
            data |= 1 << flag_shift;
        }

        let length = self.header_length();
        dst.put_uint_le(data, length);
        dst.put_uint_le(u64::from(crc24(data, length)), CRC24_LENGTH);
    }

    /// Consume and check the header at the front of `src`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Truncated`] if `src` holds less than a full
    /// header, or [`WireError::Checksum`] if the CRC-24 does not match.
    pub fn decode_header(&self, src: &mut Bytes) -> Result<SegmentHeader> {
        let length = self.header_length();
        if src.len() < length + CRC24_LENGTH {
            return Err(WireError::Truncated {
                needed: length + CRC24_LENGTH,
                available: src.len(),
            });
        }

        let data = src.get_uint_le(length);
        let expected = src.get_uint_le(CRC24_LENGTH) as u32;
        let actual = crc24(data, length);
        if expected != actual {
            tracing::warn!(expected, actual, "Segment header checksum mismatch");
            return Err(WireError::Checksum {
                target: ChecksumTarget::Header,
                expected,
                actual,
            });
        }

        let payload_length = (data & LENGTH_MASK) as usize;
        let mut rest = data >> LENGTH_BITS;
        let uncompressed_payload_length = if self.compress {
            let uncompressed = (rest & LENGTH_MASK) as usize;
            rest >>= LENGTH_BITS;
            Some(uncompressed)
        } else {
            None
        };

        Ok(SegmentHeader {
            payload_length,
            uncompressed_payload_length,
            is_self_contained: rest & 1 == 1,
        })
    }

    /// Decode the payload and trailer following `header`.
    ///
    /// `src` must hold exactly the payload and its CRC-32.
    ///
    /// # Errors
    ///
    /// Returns a protocol error on a length mismatch, [`WireError::Checksum`]
    /// if the CRC-32 does not match, or a compression error if the payload
    /// does not decompress to the declared length.
    pub fn decode(&self, header: &SegmentHeader, mut src: Bytes) -> Result<Segment> {
        let expected_length = header.payload_length + TRAILER_LENGTH;
        if src.len() != expected_length {
            return Err(WireError::Protocol(format!(
                "segment payload and trailer should be {} bytes, got {}",
                expected_length,
                src.len()
            )));
        }

        let payload = src.split_to(header.payload_length);
        let expected = src.get_u32_le();
        let actual = crc32(&payload);
        if expected != actual {
            tracing::warn!(expected, actual, "Segment payload checksum mismatch");
            return Err(WireError::Checksum {
                target: ChecksumTarget::Payload,
                expected,
                actual,
            });
        }

        let payload = match header.uncompressed_payload_length {
            Some(uncompressed) if self.compress && uncompressed > 0 => self
                .compressor
                .decompress_without_length(&payload, uncompressed)?,
            _ => payload,
        };

        Ok(Segment {
            payload,
            is_self_contained: header.is_self_contained,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::compression::{self, Lz4Compressor, NoopCompressor};

    /// LZ4 wrapper counting calls in both directions.
    #[derive(Debug, Default)]
    struct CountingCompressor {
        compressed: AtomicUsize,
        decompressed: AtomicUsize,
    }

    impl Compressor for CountingCompressor {
        fn algorithm(&self) -> &str {
            "lz4"
        }

        fn compress(&self, uncompressed: Bytes) -> Result<Bytes> {
            Lz4Compressor.compress(uncompressed)
        }

        fn decompress(&self, compressed: Bytes) -> Result<Bytes> {
            Lz4Compressor.decompress(compressed)
        }

        fn compress_without_length(&self, uncompressed: &[u8]) -> Result<Bytes> {
            self.compressed.fetch_add(1, Ordering::SeqCst);
            Lz4Compressor.compress_without_length(uncompressed)
        }

        fn decompress_without_length(&self, compressed: &[u8], length: usize) -> Result<Bytes> {
            self.decompressed.fetch_add(1, Ordering::SeqCst);
            Lz4Compressor.decompress_without_length(compressed, length)
        }
    }

    fn decode_all(codec: &SegmentCodec, encoded: &EncodedSegment) -> Result<Segment> {
        let mut header_bytes = encoded.header.clone();
        let header = codec.decode_header(&mut header_bytes)?;
        assert!(header_bytes.is_empty());
        let mut rest = BytesMut::new();
        rest.put_slice(&encoded.payload);
        rest.put_slice(&encoded.trailer);
        codec.decode(&header, rest.freeze())
    }

    #[test]
    fn test_header_lengths() {
        assert_eq!(SegmentCodec::new(compression::noop()).header_length(), 3);
        assert_eq!(SegmentCodec::new(Arc::new(Lz4Compressor)).header_length(), 5);
        assert_eq!(
            SegmentCodec::new(Arc::new(Lz4Compressor)).encoded_header_length(),
            8
        );
    }

    #[test]
    fn test_header_roundtrip_uncompressed() {
        let codec = SegmentCodec::new(Arc::new(NoopCompressor));
        for (length, self_contained) in [(0, true), (1, false), (MAX_PAYLOAD_LENGTH, true)] {
            let payload = Bytes::from(vec![7u8; length]);
            let encoded = codec
                .encode(Segment::new(payload.clone(), self_contained))
                .unwrap();
            assert_eq!(encoded.header.len(), 6);

            let mut header_bytes = encoded.header.clone();
            let header = codec.decode_header(&mut header_bytes).unwrap();
            assert_eq!(
                header,
                SegmentHeader {
                    payload_length: length,
                    uncompressed_payload_length: None,
                    is_self_contained: self_contained,
                }
            );

            let decoded = decode_all(&codec, &encoded).unwrap();
            assert_eq!(decoded.payload, payload);
        }
    }

    #[test]
    fn test_header_bit_layout() {
        let codec = SegmentCodec::new(compression::noop());
        let encoded = codec
            .encode(Segment::new(Bytes::from_static(b"abc"), true))
            .unwrap();
        // 3 | 1 << 17, little endian
        assert_eq!(&encoded.header[..3], &[0x03, 0x00, 0x02]);
    }

    #[test]
    fn test_compressed_payload_roundtrip() {
        let codec = SegmentCodec::new(Arc::new(Lz4Compressor));
        let payload = Bytes::from("frame bytes frame bytes frame bytes ".repeat(100));
        let encoded = codec.encode(Segment::new(payload.clone(), true)).unwrap();
        assert!(encoded.payload.len() < payload.len());

        let mut header_bytes = encoded.header.clone();
        let header = codec.decode_header(&mut header_bytes).unwrap();
        assert_eq!(header.payload_length, encoded.payload.len());
        assert_eq!(header.uncompressed_payload_length, Some(payload.len()));

        let decoded = decode_all(&codec, &encoded).unwrap();
        assert_eq!(decoded.payload, payload);
        assert!(decoded.is_self_contained);
    }

    #[test]
    fn test_incompressible_payload_uses_skip_sentinel() {
        let compressor = Arc::new(CountingCompressor::default());
        let codec = SegmentCodec::new(compressor.clone());
        let payload: Bytes = (0..64u8)
            .map(|i| i.wrapping_mul(97) ^ 0x5A)
            .collect::<Vec<u8>>()
            .into();

        let encoded = codec.encode(Segment::new(payload.clone(), false)).unwrap();
        assert_eq!(encoded.payload, payload);
        assert_eq!(compressor.compressed.load(Ordering::SeqCst), 1);

        let mut header_bytes = encoded.header.clone();
        let header = codec.decode_header(&mut header_bytes).unwrap();
        assert_eq!(header.uncompressed_payload_length, Some(0));

        let decoded = decode_all(&codec, &encoded).unwrap();
        assert_eq!(decoded.payload, payload);
        assert!(!decoded.is_self_contained);
        assert_eq!(compressor.decompressed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_header_bit_flip_detected() {
        for compressor in [compression::noop(), Arc::new(Lz4Compressor) as Arc<dyn Compressor>] {
            let codec = SegmentCodec::new(compressor);
            let encoded = codec
                .encode(Segment::new(Bytes::from_static(b"0123456789"), true))
                .unwrap();

            for bit in 0..encoded.header.len() * 8 {
                let mut corrupted = encoded.header.to_vec();
                corrupted[bit / 8] ^= 1 << (bit % 8);
                let err = codec
                    .decode_header(&mut Bytes::from(corrupted))
                    .unwrap_err();
                assert!(err.is_checksum(), "bit {}: {}", bit, err);
            }
        }
    }

    #[test]
    fn test_payload_bit_flip_detected() {
        let codec = SegmentCodec::new(compression::noop());
        let encoded = codec
            .encode(Segment::new(Bytes::from_static(b"payload bytes"), true))
            .unwrap();
        let mut header_bytes = encoded.header.clone();
        let header = codec.decode_header(&mut header_bytes).unwrap();

        for bit in 0..(encoded.payload.len() + TRAILER_LENGTH) * 8 {
            let mut corrupted = encoded.payload.to_vec();
            corrupted.extend_from_slice(&encoded.trailer);
            corrupted[bit / 8] ^= 1 << (bit % 8);
            let err = codec.decode(&header, Bytes::from(corrupted)).unwrap_err();
            assert!(matches!(
                err,
                WireError::Checksum {
                    target: ChecksumTarget::Payload,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let codec = SegmentCodec::new(compression::noop());
        let payload = Bytes::from(vec![0u8; MAX_PAYLOAD_LENGTH + 1]);
        assert!(codec.encode(Segment::new(payload, true)).is_err());
    }

    #[test]
    fn test_decode_length_mismatch() {
        let codec = SegmentCodec::new(compression::noop());
        let header = SegmentHeader {
            payload_length: 10,
            uncompressed_payload_length: None,
            is_self_contained: true,
        };
        let err = codec.decode(&header, Bytes::from_static(&[0; 8])).unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn test_truncated_header() {
        let codec = SegmentCodec::new(compression::noop());
        assert!(matches!(
            codec.decode_header(&mut Bytes::from_static(&[1, 2, 3])),
            Err(WireError::Truncated { needed: 6, .. })
        ));
    }

    #[test]
    fn test_to_bytes_concatenates() {
        let codec = SegmentCodec::new(compression::noop());
        let encoded = codec
            .encode(Segment::new(Bytes::from_static(b"xyz"), true))
            .unwrap();
        let bytes = encoded.to_bytes();
        assert_eq!(bytes.len(), 6 + 3 + 4);
        assert_eq!(&bytes[6..9], b"xyz");
    }
}
