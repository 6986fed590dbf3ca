//! Primitive wire encodings shared by frames and message bodies.
//!
//! All multi-byte integers are Big Endian. Strings are UTF-8 with a
//! `u16` (`[string]`) or `i32` (`[long string]`) length prefix. `[bytes]`
//! uses an `i32` prefix where a negative length means null.
//!
//! Reads take `&mut Bytes` and consume from the front; a read that would
//! run past the end fails with [`WireError::Truncated`] instead of panicking.
//! Byte-valued reads are zero-copy slices of the source buffer.

use std::collections::{BTreeMap, HashMap};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{Result, WireError};

#[inline]
fn ensure(src: &Bytes, needed: usize) -> Result<()> {
    if src.remaining() < needed {
        return Err(WireError::Truncated {
            needed,
            available: src.remaining(),
        });
    }
    Ok(())
}

fn short_length(len: usize, what: &str) -> Result<u16> {
    u16::try_from(len)
        .map_err(|_| WireError::Protocol(format!("{} length {} exceeds 65535", what, len)))
}

fn int_length(len: usize, what: &str) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| WireError::Protocol(format!("{} length {} exceeds i32::MAX", what, len)))
}

fn non_negative(len: i32, what: &str) -> Result<usize> {
    usize::try_from(len)
        .map_err(|_| WireError::Protocol(format!("negative {} length {}", what, len)))
}

fn utf8(raw: Bytes) -> Result<String> {
    String::from_utf8(raw.to_vec())
        .map_err(|e| WireError::Protocol(format!("invalid UTF-8 in string: {}", e)))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Read one byte.
pub fn read_u8(src: &mut Bytes) -> Result<u8> {
    ensure(src, 1)?;
    Ok(src.get_u8())
}

/// Read an unsigned 16-bit integer.
pub fn read_u16(src: &mut Bytes) -> Result<u16> {
    ensure(src, 2)?;
    Ok(src.get_u16())
}

/// Read a signed 32-bit integer.
pub fn read_i32(src: &mut Bytes) -> Result<i32> {
    ensure(src, 4)?;
    Ok(src.get_i32())
}

/// Read a signed 64-bit integer.
pub fn read_i64(src: &mut Bytes) -> Result<i64> {
    ensure(src, 8)?;
    Ok(src.get_i64())
}

/// Read a UUID as two Big Endian 64-bit halves.
pub fn read_uuid(src: &mut Bytes) -> Result<Uuid> {
    ensure(src, 16)?;
    let high = src.get_u64();
    let low = src.get_u64();
    Ok(Uuid::from_u64_pair(high, low))
}

/// Read `len` bytes as an independent slice of the source.
pub fn read_slice(src: &mut Bytes, len: usize) -> Result<Bytes> {
    ensure(src, len)?;
    Ok(src.split_to(len))
}

/// Read a `[string]` (u16 length prefix).
pub fn read_string(src: &mut Bytes) -> Result<String> {
    let len = read_u16(src)? as usize;
    utf8(read_slice(src, len)?)
}

/// Read a `[long string]` (i32 length prefix).
pub fn read_long_string(src: &mut Bytes) -> Result<String> {
    let len = non_negative(read_i32(src)?, "long string")?;
    utf8(read_slice(src, len)?)
}

/// Read `[bytes]`; a negative length decodes as `None`.
pub fn read_bytes(src: &mut Bytes) -> Result<Option<Bytes>> {
    let len = read_i32(src)?;
    if len < 0 {
        return Ok(None);
    }
    read_slice(src, len as usize).map(Some)
}

/// Read a `[string list]`.
pub fn read_string_list(src: &mut Bytes) -> Result<Vec<String>> {
    let count = read_u16(src)? as usize;
    let mut list = Vec::with_capacity(count);
    for _ in 0..count {
        list.push(read_string(src)?);
    }
    Ok(list)
}

/// Read a `[string map]`.
pub fn read_string_map(src: &mut Bytes) -> Result<BTreeMap<String, String>> {
    let count = read_u16(src)? as usize;
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let key = read_string(src)?;
        let value = read_string(src)?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Read a `[string multimap]`.
pub fn read_string_multimap(src: &mut Bytes) -> Result<BTreeMap<String, Vec<String>>> {
    let count = read_u16(src)? as usize;
    let mut map = BTreeMap::new();
    for _ in 0..count {
        let key = read_string(src)?;
        let values = read_string_list(src)?;
        map.insert(key, values);
    }
    Ok(map)
}

/// Read a `[bytes map]`. Null values decode as empty byte strings.
pub fn read_bytes_map(src: &mut Bytes) -> Result<HashMap<String, Bytes>> {
    let count = read_u16(src)? as usize;
    let mut map = HashMap::with_capacity(count);
    for _ in 0..count {
        let key = read_string(src)?;
        let value = read_bytes(src)?.unwrap_or_default();
        map.insert(key, value);
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Write a UUID as two Big Endian 64-bit halves.
pub fn write_uuid(dst: &mut BytesMut, value: &Uuid) {
    let (high, low) = value.as_u64_pair();
    dst.put_u64(high);
    dst.put_u64(low);
}

/// Write a `[string]`.
pub fn write_string(dst: &mut BytesMut, value: &str) -> Result<()> {
    dst.put_u16(short_length(value.len(), "string")?);
    dst.put_slice(value.as_bytes());
    Ok(())
}

/// Write a `[string]` from UTF-16 code units.
///
/// Each unpaired surrogate is written as a single `?`, matching
/// [`sizes::utf8_length_of_utf16`](super::sizes::utf8_length_of_utf16).
pub fn write_utf16_string(dst: &mut BytesMut, units: &[u16]) -> Result<()> {
    let len = super::sizes::utf8_length_of_utf16(units);
    dst.put_u16(short_length(len, "string")?);
    let start = dst.len();
    let mut buf = [0u8; 4];
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(c) => dst.put_slice(c.encode_utf8(&mut buf).as_bytes()),
            Err(_) => dst.put_u8(b'?'),
        }
    }
    debug_assert_eq!(dst.len() - start, len);
    Ok(())
}

/// Write a `[long string]`.
pub fn write_long_string(dst: &mut BytesMut, value: &str) -> Result<()> {
    dst.put_i32(int_length(value.len(), "long string")?);
    dst.put_slice(value.as_bytes());
    Ok(())
}

/// Write `[bytes]`; `None` is written as length -1.
pub fn write_bytes(dst: &mut BytesMut, value: Option<&[u8]>) -> Result<()> {
    match value {
        None => dst.put_i32(-1),
        Some(raw) => {
            dst.put_i32(int_length(raw.len(), "bytes")?);
            dst.put_slice(raw);
        }
    }
    Ok(())
}

/// Write a `[string list]`.
pub fn write_string_list(dst: &mut BytesMut, values: &[String]) -> Result<()> {
    dst.put_u16(short_length(values.len(), "string list")?);
    for value in values {
        write_string(dst, value)?;
    }
    Ok(())
}

/// Write a `[string map]`.
pub fn write_string_map(dst: &mut BytesMut, map: &BTreeMap<String, String>) -> Result<()> {
    dst.put_u16(short_length(map.len(), "string map")?);
    for (key, value) in map {
        write_string(dst, key)?;
        write_string(dst, value)?;
    }
    Ok(())
}

/// Write a `[string multimap]`.
pub fn write_string_multimap(
    dst: &mut BytesMut,
    map: &BTreeMap<String, Vec<String>>,
) -> Result<()> {
    dst.put_u16(short_length(map.len(), "string multimap")?);
    for (key, values) in map {
        write_string(dst, key)?;
        write_string_list(dst, values)?;
    }
    Ok(())
}

/// Write a `[bytes map]`.
pub fn write_bytes_map(dst: &mut BytesMut, map: &HashMap<String, Bytes>) -> Result<()> {
    dst.put_u16(short_length(map.len(), "bytes map")?);
    for (key, value) in map {
        write_string(dst, key)?;
        write_bytes(dst, Some(&value[..]))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::sizes;

    #[test]
    fn test_integers_big_endian() {
        let mut src = Bytes::from_static(&[0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFE, 0x7F]);
        assert_eq!(read_u16(&mut src).unwrap(), 0x0102);
        assert_eq!(read_i32(&mut src).unwrap(), -2);
        assert_eq!(read_u8(&mut src).unwrap(), 0x7F);
        assert!(src.is_empty());

        let mut src = Bytes::from_static(&[0x80, 0, 0, 0, 0, 0, 0, 0x01]);
        assert_eq!(read_i64(&mut src).unwrap(), i64::MIN + 1);
    }

    #[test]
    fn test_truncated_read_reports_sizes() {
        let mut src = Bytes::from_static(&[0x00, 0x00, 0x01]);
        let err = read_i32(&mut src).unwrap_err();
        assert!(matches!(
            err,
            WireError::Truncated {
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn test_string_prefix_and_size_agree() {
        let mut dst = BytesMut::new();
        write_string(&mut dst, "héllo 🎉").unwrap();
        assert_eq!(dst.len(), sizes::size_of_string("héllo 🎉"));

        let mut src = dst.freeze();
        assert_eq!(read_string(&mut src).unwrap(), "héllo 🎉");
    }

    #[test]
    fn test_utf16_string_matches_computed_size() {
        let cases: Vec<Vec<u16>> = vec![
            "héllo 🎉".encode_utf16().collect(),
            vec![0x0041, 0xD83C, 0x0042],
            vec![0xDF89, 0xD83C],
            vec![0xD83C, 0xDF89],
        ];
        for units in cases {
            let mut dst = BytesMut::new();
            write_utf16_string(&mut dst, &units).unwrap();
            assert_eq!(dst.len(), sizes::size_of_utf16_string(&units), "{:?}", units);
        }

        let mut dst = BytesMut::new();
        write_utf16_string(&mut dst, &[0x0041, 0xD83C, 0x0042]).unwrap();
        assert_eq!(&dst[..], &[0x00, 0x03, b'A', b'?', b'B']);

        let mut dst = BytesMut::new();
        write_utf16_string(&mut dst, &"héllo 🎉".encode_utf16().collect::<Vec<_>>()).unwrap();
        let mut src = dst.freeze();
        assert_eq!(read_string(&mut src).unwrap(), "héllo 🎉");
    }

    #[test]
    fn test_null_bytes() {
        let mut dst = BytesMut::new();
        write_bytes(&mut dst, None).unwrap();
        assert_eq!(&dst[..], &[0xFF, 0xFF, 0xFF, 0xFF]);

        let mut src = dst.freeze();
        assert_eq!(read_bytes(&mut src).unwrap(), None);
    }

    #[test]
    fn test_uuid_layout() {
        let id = Uuid::from_u64_pair(0x0102030405060708, 0x090A0B0C0D0E0F10);
        let mut dst = BytesMut::new();
        write_uuid(&mut dst, &id);
        assert_eq!(dst[0], 0x01);
        assert_eq!(dst[15], 0x10);

        let mut src = dst.freeze();
        assert_eq!(read_uuid(&mut src).unwrap(), id);
    }

    #[test]
    fn test_bytes_map() {
        let mut map = HashMap::new();
        map.insert("k1".to_string(), Bytes::from_static(b"v1"));
        map.insert("key2".to_string(), Bytes::new());

        let mut dst = BytesMut::new();
        write_bytes_map(&mut dst, &map).unwrap();
        assert_eq!(dst.len(), sizes::size_of_bytes_map(&map));

        let mut src = dst.freeze();
        assert_eq!(read_bytes_map(&mut src).unwrap(), map);
    }

    #[test]
    fn test_string_multimap() {
        let mut map = BTreeMap::new();
        map.insert(
            "COMPRESSION".to_string(),
            vec!["lz4".to_string(), "snappy".to_string()],
        );
        map.insert("CQL_VERSION".to_string(), vec!["3.4.5".to_string()]);

        let mut dst = BytesMut::new();
        write_string_multimap(&mut dst, &map).unwrap();
        assert_eq!(dst.len(), sizes::size_of_string_multimap(&map));

        let mut src = dst.freeze();
        assert_eq!(read_string_multimap(&mut src).unwrap(), map);
    }

    #[test]
    fn test_oversized_string_rejected() {
        let long = "x".repeat(70_000);
        let mut dst = BytesMut::new();
        assert!(write_string(&mut dst, &long).is_err());
        assert!(write_long_string(&mut dst, &long).is_ok());
    }

    #[test]
    fn test_negative_long_string_length() {
        let mut src = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xF0]);
        assert!(read_long_string(&mut src).is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut src = Bytes::from_static(&[0x00, 0x02, 0xC3, 0x28]);
        let err = read_string(&mut src).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_read_slice_is_independent() {
        let mut src = Bytes::from_static(b"abcdef");
        let head = read_slice(&mut src, 2).unwrap();
        drop(src);
        assert_eq!(&head[..], b"ab");
    }
}
