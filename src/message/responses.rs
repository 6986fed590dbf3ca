//! Server-to-client bootstrap and authentication messages.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};

use super::{opcodes, wrong_message, Message, MessageCodec};
use crate::error::Result;
use crate::protocol::{primitives, sizes};

/// ERROR body. Code-specific trailing fields are not modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

/// AUTHENTICATE body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticate {
    /// Fully qualified authenticator class name.
    pub authenticator: String,
}

/// SUPPORTED body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Supported {
    /// Option name to the values the server accepts.
    pub options: BTreeMap<String, Vec<String>>,
}

/// AUTH_SUCCESS body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSuccess {
    /// Final SASL token, possibly null.
    pub token: Option<Bytes>,
}

/// Codec for ERROR (`[int] code` + `[string] message`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorCodec;

impl MessageCodec for ErrorCodec {
    fn opcode(&self) -> u8 {
        opcodes::ERROR
    }

    fn encode(&self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        match message {
            Message::Error(error) => {
                dst.put_i32(error.code);
                primitives::write_string(dst, &error.message)
            }
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        match message {
            Message::Error(error) => Ok(sizes::INT_SIZE + sizes::size_of_string(&error.message)),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn decode(&self, src: &mut Bytes) -> Result<Message> {
        let code = primitives::read_i32(src)?;
        let message = primitives::read_string(src)?;
        Ok(Message::Error(ErrorMessage { code, message }))
    }
}

/// Codec for READY (empty body).
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadyCodec;

impl MessageCodec for ReadyCodec {
    fn opcode(&self) -> u8 {
        opcodes::READY
    }

    fn encode(&self, message: &Message, _dst: &mut BytesMut) -> Result<()> {
        match message {
            Message::Ready => Ok(()),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        match message {
            Message::Ready => Ok(0),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn decode(&self, _src: &mut Bytes) -> Result<Message> {
        Ok(Message::Ready)
    }
}

/// Codec for AUTHENTICATE (`[string]`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthenticateCodec;

impl MessageCodec for AuthenticateCodec {
    fn opcode(&self) -> u8 {
        opcodes::AUTHENTICATE
    }

    fn encode(&self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        match message {
            Message::Authenticate(auth) => primitives::write_string(dst, &auth.authenticator),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        match message {
            Message::Authenticate(auth) => Ok(sizes::size_of_string(&auth.authenticator)),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn decode(&self, src: &mut Bytes) -> Result<Message> {
        let authenticator = primitives::read_string(src)?;
        Ok(Message::Authenticate(Authenticate { authenticator }))
    }
}

/// Codec for SUPPORTED (`[string multimap]`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SupportedCodec;

impl MessageCodec for SupportedCodec {
    fn opcode(&self) -> u8 {
        opcodes::SUPPORTED
    }

    fn encode(&self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        match message {
            Message::Supported(supported) => {
                primitives::write_string_multimap(dst, &supported.options)
            }
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        match message {
            Message::Supported(supported) => {
                Ok(sizes::size_of_string_multimap(&supported.options))
            }
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn decode(&self, src: &mut Bytes) -> Result<Message> {
        let options = primitives::read_string_multimap(src)?;
        Ok(Message::Supported(Supported { options }))
    }
}

/// Codec for AUTH_SUCCESS (`[bytes]`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AuthSuccessCodec;

impl MessageCodec for AuthSuccessCodec {
    fn opcode(&self) -> u8 {
        opcodes::AUTH_SUCCESS
    }

    fn encode(&self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        match message {
            Message::AuthSuccess(auth) => primitives::write_bytes(dst, auth.token.as_deref()),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        match message {
            Message::AuthSuccess(auth) => Ok(sizes::size_of_bytes(auth.token.as_deref())),
            other => Err(wrong_message(self.opcode(), other)),
        }
    }

    fn decode(&self, src: &mut Bytes) -> Result<Message> {
        let token = primitives::read_bytes(src)?;
        Ok(Message::AuthSuccess(AuthSuccess { token }))
    }
}
