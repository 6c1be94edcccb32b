//! Ordering for the data column family.
//!
//! Data keys carry a variable-length user key followed by a fixed 12-byte
//! `(version, index)` suffix. Plain bytewise comparison would interleave
//! different user keys whose lengths differ, so the comparator splits at the
//! suffix boundary: user-key prefixes compare bytewise, then the suffix
//! compares bytewise, which equals numeric `(version, index)` order because
//! both fields are big-endian.
//!
//! Required property: for a fixed user key and version, forward iteration
//! yields ascending logical indices and reverse iteration descending ones.

use std::cmp::Ordering;

use crate::codec::DATA_KEY_SUFFIX_LEN;

/// Registered name of the comparator. RocksDB persists the name per column
/// family and refuses to open under a different one, so this must not change.
pub const DATA_KEY_COMPARATOR_NAME: &str = "listdb.data-key";

pub fn data_key_ordering(a: &[u8], b: &[u8]) -> Ordering {
    if a.len() < DATA_KEY_SUFFIX_LEN || b.len() < DATA_KEY_SUFFIX_LEN {
        // Malformed keys cannot occur through the engine; fall back to a
        // total order so the backend invariants still hold.
        return a.cmp(b);
    }
    let (a_user, a_suffix) = a.split_at(a.len() - DATA_KEY_SUFFIX_LEN);
    let (b_user, b_suffix) = b.split_at(b.len() - DATA_KEY_SUFFIX_LEN);
    a_user.cmp(b_user).then_with(|| a_suffix.cmp(b_suffix))
}
