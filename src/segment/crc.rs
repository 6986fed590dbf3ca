//! Segment checksums.
//!
//! CRC-24 protects the bit-packed header, CRC-32 protects the payload. Both
//! are seeded so that an all-zero input does not produce a zero checksum.

const CRC24_INIT: u32 = 0x0087_5060;
const CRC24_POLY: u32 = 0x0197_4F0B;
const CRC24_MASK: u32 = 0x00FF_FFFF;

const CRC32_INITIAL_BYTES: [u8; 4] = [0xFA, 0x2D, 0x55, 0xCA];

/// CRC-24 over the low `length` bytes of `value`, least significant first.
pub fn crc24(mut value: u64, length: usize) -> u32 {
    let mut crc = CRC24_INIT;
    for _ in 0..length {
        crc ^= ((value & 0xFF) as u32) << 16;
        value >>= 8;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & CRC24_MASK
}

/// CRC-32 over `payload`, seeded with four fixed bytes.
pub fn crc32(payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&CRC32_INITIAL_BYTES);
    hasher.update(payload);
    hasher.finalize()
}
