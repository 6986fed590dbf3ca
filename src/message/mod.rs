//! Message payloads and their per-version codecs.
//!
//! A [`Message`] is the body payload of a frame. Each message type has an
//! opcode and a [`MessageCodec`] that knows its wire layout for one protocol
//! version. Codecs are looked up through the
//! [`CodecRegistry`](crate::registry::CodecRegistry) by `(version, opcode)`.
//!
//! The crate ships the messages needed to bootstrap a connection,
//! authenticate and run a simple query; richer message types plug in by
//! implementing [`MessageCodec`].

mod query;
mod requests;
mod responses;

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};

use crate::error::{Result, WireError};

pub use query::{Query, QueryCodec};
pub use requests::{AuthResponse, AuthResponseCodec, OptionsCodec, Startup, StartupCodec};
pub use responses::{
    AuthSuccess, AuthSuccessCodec, Authenticate, AuthenticateCodec, ErrorCodec, ErrorMessage,
    ReadyCodec, Supported, SupportedCodec,
};

/// Wire opcodes.
pub mod opcodes {
    /// Error response.
    pub const ERROR: u8 = 0x00;
    /// Connection initialization request.
    pub const STARTUP: u8 = 0x01;
    /// Server is ready for requests.
    pub const READY: u8 = 0x02;
    /// Server requires authentication.
    pub const AUTHENTICATE: u8 = 0x03;
    /// Ask the server which options it supports.
    pub const OPTIONS: u8 = 0x05;
    /// Answer to OPTIONS.
    pub const SUPPORTED: u8 = 0x06;
    /// Simple query.
    pub const QUERY: u8 = 0x07;
    /// Client authentication token.
    pub const AUTH_RESPONSE: u8 = 0x0F;
    /// Authentication finished.
    pub const AUTH_SUCCESS: u8 = 0x10;

    /// Opcodes sent before compression is negotiated; never compressed.
    #[inline]
    pub fn is_bootstrap(opcode: u8) -> bool {
        opcode == STARTUP || opcode == OPTIONS
    }
}

/// A frame body payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// ERROR response.
    Error(ErrorMessage),
    /// STARTUP request.
    Startup(Startup),
    /// READY response (empty body).
    Ready,
    /// AUTHENTICATE response.
    Authenticate(Authenticate),
    /// OPTIONS request (empty body).
    Options,
    /// SUPPORTED response.
    Supported(Supported),
    /// QUERY request.
    Query(Query),
    /// AUTH_RESPONSE request.
    AuthResponse(AuthResponse),
    /// AUTH_SUCCESS response.
    AuthSuccess(AuthSuccess),
}

impl Message {
    /// Wire opcode of this message.
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Error(_) => opcodes::ERROR,
            Self::Startup(_) => opcodes::STARTUP,
            Self::Ready => opcodes::READY,
            Self::Authenticate(_) => opcodes::AUTHENTICATE,
            Self::Options => opcodes::OPTIONS,
            Self::Supported(_) => opcodes::SUPPORTED,
            Self::Query(_) => opcodes::QUERY,
            Self::AuthResponse(_) => opcodes::AUTH_RESPONSE,
            Self::AuthSuccess(_) => opcodes::AUTH_SUCCESS,
        }
    }

    /// Direction of this message: server to client (true) or client to server.
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            Self::Error(_)
                | Self::Ready
                | Self::Authenticate(_)
                | Self::Supported(_)
                | Self::AuthSuccess(_)
        )
    }

    /// Convenience constructor for a STARTUP with the given options.
    pub fn startup<I, K, V>(options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Startup(Startup {
            options: options
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<BTreeMap<_, _>>(),
        })
    }
}

/// Encoder/decoder for one message type in one protocol version.
///
/// `encoded_size` must return exactly the number of bytes `encode` writes:
/// frame encoding allocates from it before writing.
pub trait MessageCodec: Send + Sync + std::fmt::Debug + 'static {
    /// Opcode handled by this codec.
    fn opcode(&self) -> u8;

    /// Append the message body to `dst`.
    fn encode(&self, message: &Message, dst: &mut BytesMut) -> Result<()>;

    /// Exact number of bytes `encode` will write.
    fn encoded_size(&self, message: &Message) -> Result<usize>;

    /// Decode a message body from the front of `src`.
    fn decode(&self, src: &mut Bytes) -> Result<Message>;
}

/// Error for a codec handed a message of another type.
pub(crate) fn wrong_message(expected: u8, message: &Message) -> WireError {
    WireError::Protocol(format!(
        "codec for opcode 0x{:02X} cannot handle message with opcode 0x{:02X}",
        expected,
        message.opcode()
    ))
}
