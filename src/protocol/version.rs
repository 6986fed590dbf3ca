//! Protocol version numbers and the features each one enables.

/// Protocol v3.
pub const V3: u8 = 3;
/// Protocol v4: adds custom payloads and warnings.
pub const V4: u8 = 4;
/// Protocol v5: adds segments with checksums.
pub const V5: u8 = 5;
/// Protocol v6.
pub const V6: u8 = 6;
/// Version currently flagged as beta on the wire.
pub const BETA: u8 = V6;
/// Vendor extension layered on v4.
pub const DSE_V1: u8 = 0x41;
/// Vendor extension layered on v4, second revision.
pub const DSE_V2: u8 = 0x42;

/// Every version the default codec groups register.
pub const SUPPORTED: [u8; 6] = [V3, V4, V5, V6, DSE_V1, DSE_V2];

/// Custom payload and warnings are only legal from v4 on.
#[inline]
pub fn supports_custom_payload(version: u8) -> bool {
    version >= V4
}

/// Frames travel inside checksummed segments for these versions.
#[inline]
pub fn uses_segments(version: u8) -> bool {
    matches!(version, V5 | V6)
}

/// The USE_BETA flag is set for this version.
#[inline]
pub fn is_beta(version: u8) -> bool {
    version == BETA
}

/// QUERY-style flags are an `[int]` rather than a `[byte]`.
#[inline]
pub fn uses_int_query_flags(version: u8) -> bool {
    matches!(version, V5 | V6 | DSE_V2)
}
