//! Chunk integrity checking.
//!
//! Every chunk on the link carries a trailing CRC-32 (IEEE 802.3 polynomial,
//! the variant used by zlib) computed over the chunk payload only. Both peers
//! must agree on the exact algorithm, so this module is the single place the
//! checksum is defined.

/// Size in bytes of the checksum trailer on a chunk frame.
pub const CHECKSUM_LEN: usize = 4;

/// Compute the CRC-32 of a byte span.
///
/// Pure and deterministic; the empty span is valid input and yields `0`.
#[must_use]
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Returns `true` if `expected` is the checksum of `data`.
#[must_use]
pub fn verify(data: &[u8], expected: u32) -> bool {
    checksum(data) == expected
}
