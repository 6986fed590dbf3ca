//! Frame header encoding and decoding.
//!
//! Implements the 9-byte header format shared by every protocol version:
//! ```text
//! ┌─────────────┬───────┬───────────┬────────┬─────────────┐
//! │ Dir|Version │ Flags │ Stream ID │ Opcode │ Body length │
//! │ 1 byte      │ 1 byte│ 2 bytes   │ 1 byte │ 4 bytes     │
//! │             │       │ int16 BE  │        │ int32 BE    │
//! └─────────────┴───────┴───────────┴────────┴─────────────┘
//! ```
//!
//! The high bit of the first byte is the direction (1 = response), the low
//! seven bits are the protocol version.

/// Header size in bytes (fixed, exactly 9, for all supported versions).
pub const HEADER_SIZE: usize = 9;

/// Offset of the body length field from the start of a frame.
pub const LENGTH_OFFSET: usize = 5;

/// Direction bit in the first header byte.
pub const RESPONSE_BIT: u8 = 0b1000_0000;

/// Mask for the protocol version in the first header byte.
pub const VERSION_MASK: u8 = 0b0111_1111;

/// Flag constants for the frame header.
pub mod flags {
    /// Body is compressed with the negotiated compressor.
    pub const COMPRESSED: u8 = 0b0000_0001;
    /// Request tracing; on responses the body starts with a tracing id.
    pub const TRACING: u8 = 0b0000_0010;
    /// Body carries a custom payload map (v4+).
    pub const CUSTOM_PAYLOAD: u8 = 0b0000_0100;
    /// Response body carries a warnings list (v4+).
    pub const WARNING: u8 = 0b0000_1000;
    /// Frame uses the beta protocol version.
    pub const USE_BETA: u8 = 0b0001_0000;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u8, flag: u8) -> bool {
        flags & flag != 0
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version (low 7 bits of byte 0).
    pub version: u8,
    /// Direction bit: response (true) or request (false).
    pub is_response: bool,
    /// Flags byte (see `flags` module).
    pub flags: u8,
    /// Stream identifier. Unsigned on the wire, signed in practice.
    pub stream_id: i16,
    /// Message opcode.
    pub opcode: u8,
    /// Declared body length in bytes.
    pub body_length: i32,
}

impl FrameHeader {
    /// Encode header to bytes (Big Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use native_protocol::protocol::{flags, FrameHeader};
    ///
    /// let header = FrameHeader {
    ///     version: 4,
    ///     is_response: false,
    ///     flags: flags::TRACING,
    ///     stream_id: 2,
    ///     opcode: 0x07,
    ///     body_length: 100,
    /// };
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 9);
    /// assert_eq!(bytes[0], 0x04);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (9 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        let direction = if self.is_response { RESPONSE_BIT } else { 0 };
        buf[0] = direction | (self.version & VERSION_MASK);
        buf[1] = self.flags;
        buf[2..4].copy_from_slice(&(self.stream_id as u16).to_be_bytes());
        buf[4] = self.opcode;
        buf[5..9].copy_from_slice(&self.body_length.to_be_bytes());
    }

    /// Decode header from bytes (Big Endian).
    ///
    /// Returns `None` if buffer is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use native_protocol::protocol::FrameHeader;
    ///
    /// let bytes = [0x84, 0x00, 0xFF, 0xFF, 0x02, 0, 0, 0, 0];
    /// let header = FrameHeader::decode(&bytes).unwrap();
    /// assert_eq!(header.version, 4);
    /// assert!(header.is_response);
    /// assert_eq!(header.stream_id, -1);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            version: buf[0] & VERSION_MASK,
            is_response: buf[0] & RESPONSE_BIT != 0,
            flags: buf[1],
            // The field is documented as unsigned but peers treat it as signed.
            stream_id: u16::from_be_bytes([buf[2], buf[3]]) as i16,
            opcode: buf[4],
            body_length: i32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]),
        })
    }

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(&self, flag: u8) -> bool {
        flags::has_flag(self.flags, flag)
    }

    /// Check if the body is compressed.
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.has_flag(flags::COMPRESSED)
    }
}

/// Read the body length field of a frame without consuming anything.
///
/// Returns `None` until the buffer holds a complete header.
#[inline]
pub fn peek_body_length(buf: &[u8]) -> Option<i32> {
    let field = buf.get(LENGTH_OFFSET..HEADER_SIZE)?;
    Some(i32::from_be_bytes([field[0], field[1], field[2], field[3]]))
}
