//! Conversion helpers between Rust types and SQL column values.
//!
//! Fixed-size cryptographic values (hashes, addresses, U256 scalars) are
//! stored as big-endian byte slices in BYTEA columns; u64 scalars are
//! stored as BIGINT via i64.

use alloy::primitives::{B256, U256};

/// Convert u64 to i64 for SQL storage.
pub(crate) const fn to_i64(v: u64) -> i64 {
    v as i64
}

/// Convert i64 from SQL back to u64.
pub(crate) const fn from_i64(v: i64) -> u64 {
    v as u64
}

/// Encode a U256 as 32 big-endian bytes.
pub(crate) fn encode_u256(v: &U256) -> Vec<u8> {
    v.to_be_bytes::<32>().to_vec()
}

/// Encode a list of 32-byte values for a BYTEA[] column.
pub(crate) fn encode_hash_array(values: &[B256]) -> Vec<Vec<u8>> {
    values.iter().map(|v| v.as_slice().to_vec()).collect()
}
