//! Body compression.
//!
//! A [`Compressor`] speaks two forms:
//!
//! - **legacy** (`compress`/`decompress`): used for whole frame bodies before
//!   segments exist; the output describes its own uncompressed length.
//! - **modern** (`compress_without_length`/`decompress_without_length`): used
//!   per segment; the uncompressed length travels in the segment header.
//!
//! [`NoopCompressor`] has an empty algorithm name. Its presence means no
//! compression was negotiated, so the COMPRESSED frame flag is never set.

mod lz4;

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

pub use lz4::Lz4Compressor;

/// A compression algorithm usable at the frame and segment layers.
pub trait Compressor: Send + Sync + std::fmt::Debug {
    /// Algorithm name as negotiated in STARTUP; empty for no compression.
    fn algorithm(&self) -> &str;

    /// No compression was negotiated.
    fn is_noop(&self) -> bool {
        self.algorithm().is_empty()
    }

    /// Compress into the self-describing legacy form.
    fn compress(&self, uncompressed: Bytes) -> Result<Bytes>;

    /// Reverse of [`Compressor::compress`].
    fn decompress(&self, compressed: Bytes) -> Result<Bytes>;

    /// Compress without embedding the uncompressed length.
    fn compress_without_length(&self, uncompressed: &[u8]) -> Result<Bytes>;

    /// Reverse of [`Compressor::compress_without_length`].
    fn decompress_without_length(
        &self,
        compressed: &[u8],
        uncompressed_length: usize,
    ) -> Result<Bytes>;
}

/// Identity compressor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn algorithm(&self) -> &str {
        ""
    }

    fn compress(&self, uncompressed: Bytes) -> Result<Bytes> {
        Ok(uncompressed)
    }

    fn decompress(&self, compressed: Bytes) -> Result<Bytes> {
        Ok(compressed)
    }

    fn compress_without_length(&self, uncompressed: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(uncompressed))
    }

    fn decompress_without_length(
        &self,
        compressed: &[u8],
        _uncompressed_length: usize,
    ) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(compressed))
    }
}

/// Shared handle to the no-op compressor.
pub fn noop() -> Arc<dyn Compressor> {
    Arc::new(NoopCompressor)
}
