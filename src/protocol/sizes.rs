//! Exact encoded sizes of the primitive wire types.
//!
//! Frame and segment encoding pre-compute sizes before allocating, so these
//! must agree byte for byte with what [`super::primitives`] writes.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

/// Size of an encoded UUID.
pub const UUID_SIZE: usize = 16;
/// Size of a `[short]` length prefix.
pub const SHORT_SIZE: usize = 2;
/// Size of an `[int]` length prefix.
pub const INT_SIZE: usize = 4;

/// Number of UTF-8 bytes needed to encode a sequence of UTF-16 code units.
///
/// A valid surrogate pair encodes to 4 bytes; an unpaired surrogate counts as
/// a single byte.
pub fn utf8_length_of_utf16(units: &[u16]) -> usize {
    let mut size = 0;
    let mut i = 0;
    while i < units.len() {
        let unit = units[i];
        size += match unit {
            0x0000..=0x007F => 1,
            0x0080..=0x07FF => 2,
            0xD800..=0xDBFF => {
                if matches!(units.get(i + 1).copied(), Some(0xDC00..=0xDFFF)) {
                    i += 1;
                    4
                } else {
                    1
                }
            }
            0xDC00..=0xDFFF => 1,
            _ => 3,
        };
        i += 1;
    }
    size
}

/// Size of a `[string]`.
#[inline]
pub fn size_of_string(value: &str) -> usize {
    SHORT_SIZE + value.len()
}

/// Size of a `[string]` written from UTF-16 code units.
#[inline]
pub fn size_of_utf16_string(units: &[u16]) -> usize {
    SHORT_SIZE + utf8_length_of_utf16(units)
}

/// Size of a `[long string]`.
#[inline]
pub fn size_of_long_string(value: &str) -> usize {
    INT_SIZE + value.len()
}

/// Size of `[bytes]`, null included.
#[inline]
pub fn size_of_bytes(value: Option<&[u8]>) -> usize {
    INT_SIZE + value.map_or(0, <[u8]>::len)
}

/// Size of a `[string list]`.
pub fn size_of_string_list(values: &[String]) -> usize {
    SHORT_SIZE + values.iter().map(|v| size_of_string(v)).sum::<usize>()
}

/// Size of a `[string map]`.
pub fn size_of_string_map(map: &BTreeMap<String, String>) -> usize {
    SHORT_SIZE
        + map
            .iter()
            .map(|(k, v)| size_of_string(k) + size_of_string(v))
            .sum::<usize>()
}

/// Size of a `[string multimap]`.
pub fn size_of_string_multimap(map: &BTreeMap<String, Vec<String>>) -> usize {
    SHORT_SIZE
        + map
            .iter()
            .map(|(k, v)| size_of_string(k) + size_of_string_list(v))
            .sum::<usize>()
}

/// Size of a `[bytes map]`.
pub fn size_of_bytes_map(map: &HashMap<String, Bytes>) -> usize {
    SHORT_SIZE
        + map
            .iter()
            .map(|(k, v)| size_of_string(k) + size_of_bytes(Some(&v[..])))
            .sum::<usize>()
}
