//! Error types for the native protocol codec.

use thiserror::Error;

/// Which checksum failed during segment decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumTarget {
    /// CRC-24 over the segment header bits.
    Header,
    /// CRC-32 over the segment payload bytes.
    Payload,
}

impl std::fmt::Display for ChecksumTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => f.write_str("header CRC-24"),
            Self::Payload => f.write_str("payload CRC-32"),
        }
    }
}

/// Main error type for all encode/decode operations.
#[derive(Debug, Error)]
pub enum WireError {
    /// Contract violation (bad flags for the version, length mismatch, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No codec registered for this opcode in this protocol version and direction.
    #[error("Unsupported opcode 0x{opcode:02X} for protocol version {version} ({direction})")]
    UnsupportedOpcode {
        /// Protocol version of the frame.
        version: u8,
        /// Wire opcode.
        opcode: u8,
        /// `"encode"` or `"decode"`.
        direction: &'static str,
    },

    /// A primitive read ran past the end of the buffer.
    #[error("Truncated input: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required by the read.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// CRC mismatch while decoding a segment.
    #[error("Checksum mismatch in {target}: expected {expected:#08x}, computed {actual:#08x}")]
    Checksum {
        /// Which checksum failed.
        target: ChecksumTarget,
        /// Value carried on the wire.
        expected: u32,
        /// Value computed over the received bytes.
        actual: u32,
    },

    /// Compression backend rejected its input.
    #[error("Compression error: {0}")]
    Compression(String),
}

impl WireError {
    /// Data corruption detected by a CRC. Callers usually drop the connection.
    pub fn is_checksum(&self) -> bool {
        matches!(self, Self::Checksum { .. })
    }

    /// Any contract violation that is not a checksum failure.
    pub fn is_protocol(&self) -> bool {
        !self.is_checksum()
    }
}

/// Result type alias using WireError.
pub type Result<T> = std::result::Result<T, WireError>;
