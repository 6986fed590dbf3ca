//! QUERY request.
//!
//! Layout: `[long string] query`, `[short] consistency`, flags, then an
//! `[int]` page size when the page-size flag is set. Flags are one byte
//! before v5 and a four-byte int from v5 on, which is why the codec is
//! bound to a protocol version.

use bytes::{BufMut, Bytes, BytesMut};

use super::{opcodes, wrong_message, Message, MessageCodec};
use crate::error::Result;
use crate::protocol::{primitives, sizes, version};

/// Query flag: an `[int]` page size follows the flags.
pub const PAGE_SIZE_FLAG: u32 = 0x04;

/// QUERY body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Query string.
    pub query: String,
    /// Consistency level code.
    pub consistency: u16,
    /// Requested page size.
    pub page_size: Option<i32>,
}

impl Query {
    /// Query with the given text at consistency ONE and no paging.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            consistency: 0x0001,
            page_size: None,
        }
    }
}

/// Codec for QUERY in one protocol version.
#[derive(Debug, Clone, Copy)]
pub struct QueryCodec {
    int_flags: bool,
}

impl QueryCodec {
    /// Create the codec for `protocol_version`.
    pub fn new(protocol_version: u8) -> Self {
        Self {
            int_flags: version::uses_int_query_flags(protocol_version),
        }
    }

    fn flags_size(&self) -> usize {
        if self.int_flags {
            4
        } else {
            1
        }
    }
}

impl MessageCodec for QueryCodec {
    fn opcode(&self) -> u8 {
        opcodes::QUERY
    }

    fn encode(&self, message: &Message, dst: &mut BytesMut) -> Result<()> {
        let Message::Query(query) = message else {
            return Err(wrong_message(self.opcode(), message));
        };
        primitives::write_long_string(dst, &query.query)?;
        dst.put_u16(query.consistency);

        let flags = if query.page_size.is_some() {
            PAGE_SIZE_FLAG
        } else {
            0
        };
        if self.int_flags {
            dst.put_u32(flags);
        } else {
            dst.put_u8(flags as u8);
        }
        if let Some(page_size) = query.page_size {
            dst.put_i32(page_size);
        }
        Ok(())
    }

    fn encoded_size(&self, message: &Message) -> Result<usize> {
        let Message::Query(query) = message else {
            return Err(wrong_message(self.opcode(), message));
        };
        let page_size = if query.page_size.is_some() {
            sizes::INT_SIZE
        } else {
            0
        };
        Ok(sizes::size_of_long_string(&query.query)
            + sizes::SHORT_SIZE
            + self.flags_size()
            + page_size)
    }

    fn decode(&self, src: &mut Bytes) -> Result<Message> {
        let query = primitives::read_long_string(src)?;
        let consistency = primitives::read_u16(src)?;
        let flags = if self.int_flags {
            primitives::read_i32(src)? as u32
        } else {
            u32::from(primitives::read_u8(src)?)
        };
        let page_size = if flags & PAGE_SIZE_FLAG != 0 {
            Some(primitives::read_i32(src)?)
        } else {
            None
        };
        Ok(Message::Query(Query {
            query,
            consistency,
            page_size,
        }))
    }
}
