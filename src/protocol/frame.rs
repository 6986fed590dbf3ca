//! Frame struct: one request or response envelope.
//!
//! # Example
//!
//! ```
//! use native_protocol::message::Message;
//! use native_protocol::protocol::{version, Frame};
//!
//! let frame = Frame::request(version::V4, 2, false, Default::default(), Message::Options).unwrap();
//! assert_eq!(frame.stream_id, 2);
//! assert!(!frame.is_response());
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use uuid::Uuid;

use super::version;
use crate::error::{Result, WireError};
use crate::message::Message;

/// Diagnostic size value for frames that did not come from decoding.
pub const NO_SIZE: i32 = -1;

/// A protocol frame.
///
/// `size` and `compressed_size` are filled in by decoding only; frames built
/// for encoding carry [`NO_SIZE`].
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Protocol version.
    pub protocol_version: u8,
    /// Stream identifier pairing a response with its request.
    pub stream_id: i16,
    /// Tracing requested (requests) or present (responses).
    pub tracing: bool,
    /// Tracing session id, responses only.
    pub tracing_id: Option<Uuid>,
    /// Decoded frame size, uncompressed, header included.
    pub size: i32,
    /// Decoded frame size as received when compressed, else [`NO_SIZE`].
    pub compressed_size: i32,
    /// Custom payload (v4+).
    pub custom_payload: HashMap<String, Bytes>,
    /// Server warnings, responses only (v4+).
    pub warnings: Vec<String>,
    /// Body payload.
    pub message: Message,
}

impl Frame {
    /// Build a request frame.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-empty custom payload is used below v4, or the
    /// message is a response type.
    pub fn request(
        protocol_version: u8,
        stream_id: i16,
        tracing: bool,
        custom_payload: HashMap<String, Bytes>,
        message: Message,
    ) -> Result<Self> {
        if message.is_response() {
            return Err(WireError::Protocol(format!(
                "opcode 0x{:02X} is a response and cannot be sent as a request",
                message.opcode()
            )));
        }
        let frame = Self {
            protocol_version,
            stream_id,
            tracing,
            tracing_id: None,
            size: NO_SIZE,
            compressed_size: NO_SIZE,
            custom_payload,
            warnings: Vec::new(),
            message,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Build a response frame.
    ///
    /// # Errors
    ///
    /// Returns an error if custom payload or warnings are used below v4, or
    /// the message is a request type.
    pub fn response(
        protocol_version: u8,
        stream_id: i16,
        tracing_id: Option<Uuid>,
        custom_payload: HashMap<String, Bytes>,
        warnings: Vec<String>,
        message: Message,
    ) -> Result<Self> {
        if !message.is_response() {
            return Err(WireError::Protocol(format!(
                "opcode 0x{:02X} is a request and cannot be sent as a response",
                message.opcode()
            )));
        }
        let frame = Self {
            protocol_version,
            stream_id,
            tracing: tracing_id.is_some(),
            tracing_id,
            size: NO_SIZE,
            compressed_size: NO_SIZE,
            custom_payload,
            warnings,
            message,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Check the version-dependent invariants.
    pub fn validate(&self) -> Result<()> {
        if !version::supports_custom_payload(self.protocol_version) {
            if !self.custom_payload.is_empty() {
                return Err(WireError::Protocol(format!(
                    "custom payload is not supported in protocol v{}",
                    self.protocol_version
                )));
            }
            if !self.warnings.is_empty() {
                return Err(WireError::Protocol(format!(
                    "warnings are not supported in protocol v{}",
                    self.protocol_version
                )));
            }
        }
        Ok(())
    }

    /// Whether the frame travels with the USE_BETA flag, which follows the
    /// protocol version.
    #[inline]
    pub fn is_beta(&self) -> bool {
        version::is_beta(self.protocol_version)
    }

    /// Direction of the carried message.
    #[inline]
    pub fn is_response(&self) -> bool {
        self.message.is_response()
    }

    /// Opcode of the carried message.
    #[inline]
    pub fn opcode(&self) -> u8 {
        self.message.opcode()
    }
}
