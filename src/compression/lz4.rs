//! LZ4 block compression.
//!
//! Legacy form: `[int] uncompressed length` (Big Endian) followed by an LZ4
//! block. Modern form: the bare LZ4 block.

use bytes::{BufMut, Bytes, BytesMut};

use super::Compressor;
use crate::error::{Result, WireError};
use crate::protocol::DEFAULT_MAX_BODY_LENGTH;

const LENGTH_PREFIX: usize = 4;

/// Largest uncompressed length accepted from a legacy length prefix.
const MAX_UNCOMPRESSED_LENGTH: usize = DEFAULT_MAX_BODY_LENGTH;

/// LZ4 compressor backed by `lz4_flex`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lz4Compressor;

impl Lz4Compressor {
    fn decompress_block(compressed: &[u8], uncompressed_length: usize) -> Result<Bytes> {
        let out = lz4_flex::block::decompress(compressed, uncompressed_length)
            .map_err(|e| WireError::Compression(format!("LZ4 decompression failed: {}", e)))?;
        if out.len() != uncompressed_length {
            return Err(WireError::Compression(format!(
                "LZ4 produced {} bytes, expected {}",
                out.len(),
                uncompressed_length
            )));
        }
        Ok(Bytes::from(out))
    }
}

impl Compressor for Lz4Compressor {
    fn algorithm(&self) -> &str {
        "lz4"
    }

    fn compress(&self, uncompressed: Bytes) -> Result<Bytes> {
        let length = i32::try_from(uncompressed.len()).map_err(|_| {
            WireError::Compression(format!("{} bytes is too large for LZ4", uncompressed.len()))
        })?;
        let block = lz4_flex::block::compress(&uncompressed);
        let mut out = BytesMut::with_capacity(LENGTH_PREFIX + block.len());
        out.put_i32(length);
        out.put_slice(&block);
        Ok(out.freeze())
    }

    fn decompress(&self, compressed: Bytes) -> Result<Bytes> {
        if compressed.len() < LENGTH_PREFIX {
            return Err(WireError::Truncated {
                needed: LENGTH_PREFIX,
                available: compressed.len(),
            });
        }
        let length = i32::from_be_bytes([compressed[0], compressed[1], compressed[2], compressed[3]]);
        let length = usize::try_from(length).map_err(|_| {
            WireError::Compression(format!("negative uncompressed length {}", length))
        })?;
        if length > MAX_UNCOMPRESSED_LENGTH {
            return Err(WireError::Compression(format!(
                "uncompressed length {} exceeds {}",
                length, MAX_UNCOMPRESSED_LENGTH
            )));
        }
        Self::decompress_block(&compressed[LENGTH_PREFIX..], length)
    }

    fn compress_without_length(&self, uncompressed: &[u8]) -> Result<Bytes> {
        Ok(Bytes::from(lz4_flex::block::compress(uncompressed)))
    }

    fn decompress_without_length(
        &self,
        compressed: &[u8],
        uncompressed_length: usize,
    ) -> Result<Bytes> {
        Self::decompress_block(compressed, uncompressed_length)
    }
}
