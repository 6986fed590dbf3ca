//! Codec registry for dispatching message codecs by `(version, opcode)`.
//!
//! Encoders and decoders live in separate tables. A client registers
//! encoders for requests and decoders for responses only, so asking it to
//! decode a request (or encode a response) fails immediately with
//! [`WireError::UnsupportedOpcode`] instead of silently mis-encoding.
//!
//! # Example
//!
//! ```
//! use native_protocol::registry::{ClientCodecs, CodecRegistry};
//! use native_protocol::message::opcodes;
//! use native_protocol::protocol::version;
//!
//! let registry = CodecRegistry::from_groups(&[&ClientCodecs::new(version::V4)]);
//! assert!(registry.encoder(version::V4, opcodes::STARTUP).is_ok());
//! assert!(registry.decoder(version::V4, opcodes::STARTUP).is_err());
//! ```

mod groups;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, WireError};
use crate::message::MessageCodec;

pub use groups::{ClientCodecs, CodecGroup, ServerCodecs};

/// Dispatch tables keyed by `(protocol version, opcode)`.
///
/// Built once, then shared read-only by the frame codec.
#[derive(Default)]
pub struct CodecRegistry {
    encoders: HashMap<(u8, u8), Arc<dyn MessageCodec>>,
    decoders: HashMap<(u8, u8), Arc<dyn MessageCodec>>,
}

impl CodecRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of codec groups.
    pub fn from_groups(groups: &[&dyn CodecGroup]) -> Self {
        let mut registry = Self::new();
        for group in groups {
            group.register(&mut registry);
        }
        tracing::trace!(
            encoders = registry.encoders.len(),
            decoders = registry.decoders.len(),
            "Built codec registry"
        );
        registry
    }

    /// Register a codec for encoding in `version`.
    pub fn register_encoder(&mut self, version: u8, codec: Arc<dyn MessageCodec>) {
        self.encoders.insert((version, codec.opcode()), codec);
    }

    /// Register a codec for decoding in `version`.
    pub fn register_decoder(&mut self, version: u8, codec: Arc<dyn MessageCodec>) {
        self.decoders.insert((version, codec.opcode()), codec);
    }

    /// Register a codec for both directions in `version`.
    pub fn register_codec(&mut self, version: u8, codec: Arc<dyn MessageCodec>) {
        self.register_encoder(version, codec.clone());
        self.register_decoder(version, codec);
    }

    /// Get the encoder for `opcode` in `version`.
    pub fn encoder(&self, version: u8, opcode: u8) -> Result<&dyn MessageCodec> {
        Self::lookup(&self.encoders, version, opcode, "encode")
    }

    /// Get the decoder for `opcode` in `version`.
    pub fn decoder(&self, version: u8, opcode: u8) -> Result<&dyn MessageCodec> {
        Self::lookup(&self.decoders, version, opcode, "decode")
    }

    fn lookup<'a>(
        table: &'a HashMap<(u8, u8), Arc<dyn MessageCodec>>,
        version: u8,
        opcode: u8,
        direction: &'static str,
    ) -> Result<&'a dyn MessageCodec> {
        table.get(&(version, opcode)).map(|c| c.as_ref()).ok_or_else(|| {
            tracing::debug!(version, opcode, direction, "No codec registered");
            WireError::UnsupportedOpcode {
                version,
                opcode,
                direction,
            }
        })
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("encoders", &self.encoders.len())
            .field("decoders", &self.decoders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{opcodes, OptionsCodec, QueryCodec, ReadyCodec};
    use crate::protocol::version;

    #[test]
    fn test_register_encoder_only() {
        let mut registry = CodecRegistry::new();
        registry.register_encoder(version::V4, Arc::new(OptionsCodec));

        assert!(registry.encoder(version::V4, opcodes::OPTIONS).is_ok());
        assert!(registry.decoder(version::V4, opcodes::OPTIONS).is_err());
    }

    #[test]
    fn test_register_codec_both_directions() {
        let mut registry = CodecRegistry::new();
        registry.register_codec(version::V5, Arc::new(ReadyCodec));

        assert!(registry.encoder(version::V5, opcodes::READY).is_ok());
        assert!(registry.decoder(version::V5, opcodes::READY).is_ok());
    }

    #[test]
    fn test_lookup_is_per_version() {
        let mut registry = CodecRegistry::new();
        registry.register_encoder(version::V4, Arc::new(QueryCodec::new(version::V4)));

        let err = registry.encoder(version::V3, opcodes::QUERY).unwrap_err();
        assert!(matches!(
            err,
            WireError::UnsupportedOpcode {
                version: 3,
                opcode: 0x07,
                direction: "encode"
            }
        ));
    }

    #[test]
    fn test_later_registration_replaces_slot() {
        let mut registry = CodecRegistry::new();
        registry.register_encoder(version::V4, Arc::new(QueryCodec::new(version::V3)));
        registry.register_encoder(version::V4, Arc::new(QueryCodec::new(version::V5)));

        let message = crate::message::Message::Query(crate::message::Query::new("q"));
        let size = registry
            .encoder(version::V4, opcodes::QUERY)
            .unwrap()
            .encoded_size(&message)
            .unwrap();
        assert_eq!(size, 4 + 1 + 2 + 4);
    }

    #[test]
    fn test_empty_registry() {
        let registry = CodecRegistry::new();
        assert!(registry.encoder(version::V4, opcodes::OPTIONS).is_err());
        assert!(format!("{:?}", registry).contains("encoders: 0"));
    }

    #[test]
    fn test_looked_up_codec_is_debug() {
        let mut registry = CodecRegistry::new();
        registry.register_encoder(version::V4, Arc::new(OptionsCodec));

        let codec = registry.encoder(version::V4, opcodes::OPTIONS).unwrap();
        assert_eq!(format!("{:?}", codec), "OptionsCodec");
    }
}
