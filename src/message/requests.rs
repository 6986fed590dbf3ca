//! Client-to-server bootstrap and authentication messages.

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};

use super::{opcodes, wrong_message, Message, MessageCodec};
use crate::error::Result;
use crate::protocol::{primitives, sizes};

/// STARTUP body: connection options such as `CQL_VERSION` and `COMPRESSION`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Startup {
    /// Option name to value.
    pub options: BTreeMap<String, String>,
}

/// AUTH_RESPONSE body: an opaque SASL token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthResponse {
    /// Token bytes; `None` is written as a null `[bytes]`.
    pub token: Option<Bytes>,
}

/// Codec for STARTUP (`[string map]`).
#[derive(Debug, Default, Clone, Copy)]
pub struct StartupCodec;

impl MessageCodec for StartupCodec {
    fn opcode(&self) -> u8 {
        opcodes::STARTUP
    }

    fn encode(&self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        match message {
            Message::Startup(startup) => primitives::write_string_map(dst, &startup.options),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        match message {
            Message::Startup(startup) => Ok(sizes::size_of_string_map(&startup.options)),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn decode(&self, src: &mut Bytes) -> Result<Message> {
        let options = primitives::read_string_map(src)?;
        Ok(Message::Startup(Startup { options }))
    }
}

/// Codec for OPTIONS (empty body).
#[derive(Debug, Default, Clone, Copy)]
pub struct OptionsCodec;

impl MessageCodec for OptionsCodec {
    fn opcode(&self) -> u8 {
        opcodes::OPTIONS
    }

    fn encode(&self, message: &Message, _dst: &mut BytesMut) -> Result<()> {
        match message {
            Message::Options => Ok(()),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        match message {
            Message::Options => Ok(0),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn decode(&self, _src: &mut Bytes) -> Result<Message> {
        Ok(Message::Options)
    }
}

/// Codec for AUTH_RESPONSE (`[bytes]`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthResponseCodec;

impl MessageCodec for AuthResponseCodec {
    fn opcode(&self) -> u8 {
        opcodes::AUTH_RESPONSE
    }

    fn encode(&self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        match message {
            Message::AuthResponse(auth) => primitives::write_bytes(dst, auth.token.as_deref()),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        match message {
            Message::AuthResponse(auth) => Ok(sizes::size_of_bytes(auth.token.as_deref())),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn decode(&self, src: &mut Bytes) -> Result<Message> {
        let token = primitives::read_bytes(src)?;
        Ok(Message::AuthResponse(AuthResponse { token }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(codec: &dyn MessageCodec, message: &Message) -> Message {
        let mut dst = BytesMut::new();
        codec.encode(message, &mut dst).unwrap();
        assert_eq!(dst.len(), codec.encoded_size(message).unwrap());
        let mut src = dst.freeze();
        let decoded = codec.decode(&mut src).unwrap();
        assert!(src.is_empty());
        decoded
    }

    #[test]
    fn test_startup() {
        let message = Message::startup([("CQL_VERSION", "3.0.0"), ("COMPRESSION", "lz4")]);
        assert_eq!(roundtrip(&StartupCodec, &message), message);
    }

    #[test]
    fn test_options_is_empty() {
        let mut dst = BytesMut::new();
        OptionsCodec.encode(&Message::Options, &mut dst).unwrap();
        assert!(dst.is_empty());
        assert_eq!(OptionsCodec.encoded_size(&Message::Options).unwrap(), 0);
    }

    #[test]
    fn test_auth_response_null_and_value() {
        let null = Message::AuthResponse(AuthResponse { token: None });
        assert_eq!(roundtrip(&AuthResponseCodec, &null), null);

        let token = Message::AuthResponse(AuthResponse {
            token: Some(Bytes::from_static(b"\0user\0secret")),
        });
        assert_eq!(roundtrip(&AuthResponseCodec, &token), token);
    }

    #[test]
    fn test_wrong_variant_rejected() {
        let mut dst = BytesMut::new();
        assert!(StartupCodec.encode(&Message::Options, &mut dst).is_err());
        assert!(OptionsCodec.encoded_size(&Message::Ready).is_err());
    }
}
