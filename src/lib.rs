//! # native-protocol
//!
//! Frame, segment and checksum codec for the native database wire protocol.
//!
//! ## Architecture
//!
//! - **Frames** (all versions): a 9-byte header plus a body holding optional
//!   tracing id, custom payload and warnings, then the message. Up to v4 the
//!   whole body may be compressed.
//! - **Segments** (v5+): frames are batched into, or sliced across,
//!   containers of at most 131071 bytes protected by CRC-24 (header) and
//!   CRC-32 (payload), with optional per-segment compression.
//!
//! Everything here is synchronous, in-memory buffer transformation; the
//! transport belongs to the caller.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use native_protocol::message::{Message, Query};
//! use native_protocol::protocol::{version, Frame};
//! use native_protocol::segment::{FrameAssembler, NoState, SegmentBuffer, SegmentBuilder};
//! use native_protocol::CodecConfig;
//!
//! let config = CodecConfig::default();
//! let client = Arc::new(config.client_frame_codec());
//! let server = config.server_frame_codec();
//!
//! // Client: frames -> segments -> bytes
//! let mut builder = SegmentBuilder::new(client.clone(), NoState);
//! let frame = Frame::request(version::V5, 1, false, Default::default(),
//!     Message::Query(Query::new("SELECT * FROM system.local"))).unwrap();
//! assert!(builder.add_frame(frame, ()).unwrap().is_empty());
//! let (segment, ()) = builder.flush().unwrap();
//! let wire = config.segment_codec().encode(segment).unwrap().to_bytes();
//!
//! // Server: bytes -> segments -> frames
//! let mut segments = SegmentBuffer::new(config.segment_codec());
//! let mut assembler = FrameAssembler::new();
//! for segment in segments.push(&wire).unwrap() {
//!     for raw in assembler.push(segment).unwrap() {
//!         let frame = server.decode(raw).unwrap();
//!         assert_eq!(frame.stream_id, 1);
//!     }
//! }
//! ```

pub mod compression;
pub mod config;
pub mod error;
pub mod message;
pub mod protocol;
pub mod registry;
pub mod segment;

pub use config::CodecConfig;
pub use error::{Result, WireError};
pub use message::{Message, MessageCodec};
pub use protocol::{Frame, FrameCodec};
pub use segment::{Segment, SegmentBuilder, SegmentCodec};
