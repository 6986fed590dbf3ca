//! Codec groups: fixed sets of codecs contributed for one version and role.

use std::sync::Arc;

use super::CodecRegistry;
use crate::message::{
    AuthResponseCodec, AuthSuccessCodec, AuthenticateCodec, ErrorCodec, OptionsCodec, QueryCodec,
    ReadyCodec, StartupCodec, SupportedCodec,
};

/// A contributor of codecs to a [`CodecRegistry`].
pub trait CodecGroup {
    /// Register this group's codecs.
    fn register(&self, registry: &mut CodecRegistry);
}

/// Client role: encodes requests, decodes responses.
#[derive(Debug, Clone, Copy)]
pub struct ClientCodecs {
    version: u8,
}

impl ClientCodecs {
    /// Client codecs for `version`.
    pub fn new(version: u8) -> Self {
        Self { version }
    }
}

impl CodecGroup for ClientCodecs {
    fn register(&self, registry: &mut CodecRegistry) {
        let v = self.version;
        registry.register_encoder(v, Arc::new(StartupCodec));
        registry.register_encoder(v, Arc::new(OptionsCodec));
        registry.register_encoder(v, Arc::new(QueryCodec::new(v)));
        registry.register_encoder(v, Arc::new(AuthResponseCodec));

        registry.register_decoder(v, Arc::new(ErrorCodec));
        registry.register_decoder(v, Arc::new(ReadyCodec));
        registry.register_decoder(v, Arc::new(AuthenticateCodec));
        registry.register_decoder(v, Arc::new(SupportedCodec));
        registry.register_decoder(v, Arc::new(AuthSuccessCodec));
    }
}

/// Server role: decodes requests, encodes responses.
#[derive(Debug, Clone, Copy)]
pub struct ServerCodecs {
    version: u8,
}

impl ServerCodecs {
    /// Server codecs for `version`.
    pub fn new(version: u8) -> Self {
        Self { version }
    }
}

impl CodecGroup for ServerCodecs {
    fn register(&self, registry: &mut CodecRegistry) {
        let v = self.version;
        registry.register_decoder(v, Arc::new(StartupCodec));
        registry.register_decoder(v, Arc::new(OptionsCodec));
        registry.register_decoder(v, Arc::new(QueryCodec::new(v)));
        registry.register_decoder(v, Arc::new(AuthResponseCodec));

        registry.register_encoder(v, Arc::new(ErrorCodec));
        registry.register_encoder(v, Arc::new(ReadyCodec));
        registry.register_encoder(v, Arc::new(AuthenticateCodec));
        registry.register_encoder(v, Arc::new(SupportedCodec));
        registry.register_encoder(v, Arc::new(AuthSuccessCodec));
    }
}
