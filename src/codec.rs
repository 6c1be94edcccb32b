//! On-disk record formats.
//!
//! Two record shapes share one database:
//! - Meta value (default column family): one 32-byte header per list holding
//!   the live element count, the generation counter, the expiry and the two
//!   logical cursors. Integers are little-endian; the layout is stable across
//!   processes.
//! - Data key (`data_cf`): `user_key || version (u32 BE) || index (u64 BE)`.
//!   The suffix is big-endian so bytewise order equals numeric order on
//!   `(version, index)` within a user key. Data values are the raw payloads.

use bytes::Bytes;

/// Fixed width of the encoded meta value.
pub const META_ENCODED_LEN: usize = 8 + 4 + 4 + 8 + 8;

/// Fixed width of the `(version, index)` suffix of a data key.
pub const DATA_KEY_SUFFIX_LEN: usize = 4 + 8;

/// Left cursor of a fresh list: one position before the first element.
pub const INITIAL_LEFT_INDEX: u64 = (1 << 63) - 1;

/// Right cursor of a fresh list: one position after the last element.
pub const INITIAL_RIGHT_INDEX: u64 = 1 << 63;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated input")]
    Truncated,

    #[error("meta value has unexpected length {0}")]
    MetaLength(usize),
}

/// Per-list header record.
///
/// Invariant: `right_index - left_index - 1 == count`. The cursors start at
/// the midpoint of the u64 space so the first push on either side lands on
/// adjacent indices. Indices never wrap; a list performing more than `2^63`
/// pushes is outside the supported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaValue {
    pub count: u64,
    pub version: u32,
    /// Absolute expiry in unix seconds, `0` for none.
    pub expires_at: u32,
    pub left_index: u64,
    pub right_index: u64,
}

impl Default for MetaValue {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaValue {
    pub fn new() -> Self {
        Self {
            count: 0,
            version: 0,
            expires_at: 0,
            left_index: INITIAL_LEFT_INDEX,
            right_index: INITIAL_RIGHT_INDEX,
        }
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.reserve(META_ENCODED_LEN);
        buf.extend_from_slice(&self.count.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.expires_at.to_le_bytes());
        buf.extend_from_slice(&self.left_index.to_le_bytes());
        buf.extend_from_slice(&self.right_index.to_le_bytes());
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(META_ENCODED_LEN);
        self.encode_into(&mut buf);
        buf
    }

    pub fn decode(input: &[u8]) -> Result<Self, DecodeError> {
        if input.len() != META_ENCODED_LEN {
            return Err(DecodeError::MetaLength(input.len()));
        }
        Ok(Self {
            count: u64::from_le_bytes(input[0..8].try_into().unwrap()),
            version: u32::from_le_bytes(input[8..12].try_into().unwrap()),
            expires_at: u32::from_le_bytes(input[12..16].try_into().unwrap()),
            left_index: u64::from_le_bytes(input[16..24].try_into().unwrap()),
            right_index: u64::from_le_bytes(input[24..32].try_into().unwrap()),
        })
    }

    pub fn is_expired(&self, now_secs: u32) -> bool {
        self.expires_at != 0 && self.expires_at <= now_secs
    }

    /// Expired or empty. Readers treat a stale list as absent; creators treat
    /// it as a fresh slate.
    pub fn is_stale(&self, now_secs: u32) -> bool {
        self.is_expired(now_secs) || self.count == 0
    }

    /// Advance the generation counter. Seeding from the wall clock keeps the
    /// counter strictly increasing even across process restarts; the `+ 1`
    /// branch covers repeated bumps within one second.
    pub fn bump_version(&mut self, now_secs: u32) -> u32 {
        self.version = if now_secs > self.version {
            now_secs
        } else {
            self.version + 1
        };
        self.version
    }

    /// Re-initialize in place: zero the count and expiry, recenter the
    /// cursors, and bump the version so every prior data record becomes an
    /// orphan for the compaction filter.
    pub fn reset(&mut self, now_secs: u32) -> u32 {
        self.count = 0;
        self.expires_at = 0;
        self.left_index = INITIAL_LEFT_INDEX;
        self.right_index = INITIAL_RIGHT_INDEX;
        self.bump_version(now_secs)
    }

    /// Claim the next slot to the left of the head. Returns the logical index
    /// the new element must be written at.
    pub fn claim_left(&mut self) -> u64 {
        let slot = self.left_index;
        self.left_index -= 1;
        self.count += 1;
        slot
    }

    /// Claim the next slot to the right of the tail.
    pub fn claim_right(&mut self) -> u64 {
        let slot = self.right_index;
        self.right_index += 1;
        self.count += 1;
        slot
    }

    /// Give up the head element (pop from the left).
    pub fn release_left(&mut self) {
        self.left_index += 1;
        self.count -= 1;
    }

    /// Give up the tail element (pop from the right).
    pub fn release_right(&mut self) {
        self.right_index -= 1;
        self.count -= 1;
    }
}

/// Encode a data key straight from its parts, without building a [`DataKey`].
/// Hot paths in the engine construct keys per element; this skips the
/// intermediate ownership.
pub fn encode_data_key(user_key: &[u8], version: u32, index: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(user_key.len() + DATA_KEY_SUFFIX_LEN);
    buf.extend_from_slice(user_key);
    buf.extend_from_slice(&version.to_be_bytes());
    buf.extend_from_slice(&index.to_be_bytes());
    buf
}

/// Data record key `(user_key, version, index)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataKey {
    pub user_key: Bytes,
    pub version: u32,
    pub index: u64,
}

impl DataKey {
    pub fn new(user_key: impl Into<Bytes>, version: u32, index: u64) -> Self {
        Self {
            user_key: user_key.into(),
            version,
            index,
        }
    }

    pub fn encoded_len(&self) -> usize {
        self.user_key.len() + DATA_KEY_SUFFIX_LEN
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len());
        buf.extend_from_slice(self.user_key.as_ref());
        buf.extend_from_slice(&self.version.to_be_bytes());
        buf.extend_from_slice(&self.index.to_be_bytes());
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    pub fn decode(input: &[u8]) -> Result<Self, DecodeError> {
        if input.len() < DATA_KEY_SUFFIX_LEN {
            return Err(DecodeError::Truncated);
        }
        let split = input.len() - DATA_KEY_SUFFIX_LEN;
        let (prefix, suffix) = input.split_at(split);
        Ok(Self {
            user_key: Bytes::copy_from_slice(prefix),
            version: u32::from_be_bytes(suffix[0..4].try_into().unwrap()),
            index: u64::from_be_bytes(suffix[4..12].try_into().unwrap()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_round_trip() {
        let mut meta = MetaValue::new();
        meta.count = 7;
        meta.version = 42;
        meta.expires_at = 1_700_000_000;
        meta.left_index = INITIAL_LEFT_INDEX - 3;
        meta.right_index = INITIAL_RIGHT_INDEX + 4;

        let encoded = meta.encode_to_vec();
        assert_eq!(encoded.len(), META_ENCODED_LEN);
        assert_eq!(MetaValue::decode(&encoded).unwrap(), meta);
    }

    #[test]
    fn meta_rejects_bad_length() {
        assert!(matches!(
            MetaValue::decode(&[0u8; 31]),
            Err(DecodeError::MetaLength(31))
        ));
    }

    #[test]
    fn fresh_cursors_straddle_midpoint() {
        let mut left = MetaValue::new();
        let mut right = MetaValue::new();
        let first_left = left.claim_left();
        let first_right = right.claim_right();
        assert_eq!(first_right, first_left + 1);
    }

    #[test]
    fn claims_and_releases_keep_the_count_invariant() {
        let mut meta = MetaValue::new();
        meta.claim_left();
        meta.claim_right();
        meta.claim_right();
        assert_eq!(meta.right_index - meta.left_index - 1, meta.count);
        meta.release_left();
        meta.release_right();
        assert_eq!(meta.right_index - meta.left_index - 1, meta.count);
        assert_eq!(meta.count, 1);
    }

    #[test]
    fn version_bump_is_strictly_increasing() {
        let mut meta = MetaValue::new();
        let v1 = meta.bump_version(1000);
        let v2 = meta.bump_version(1000);
        let v3 = meta.bump_version(999);
        assert!(v1 < v2 && v2 < v3);
    }

    #[test]
    fn staleness() {
        let mut meta = MetaValue::new();
        assert!(meta.is_stale(0), "empty list is stale");
        meta.claim_right();
        assert!(!meta.is_stale(100));
        meta.expires_at = 50;
        assert!(meta.is_expired(50));
        assert!(meta.is_stale(51));
        assert!(!meta.is_expired(49));
    }

    #[test]
    fn data_key_round_trip() {
        let key = DataKey::new(Bytes::from_static(b"mylist"), 9, 1 << 63);
        let encoded = key.encode_to_vec();
        assert_eq!(encoded.len(), 6 + DATA_KEY_SUFFIX_LEN);
        assert_eq!(DataKey::decode(&encoded).unwrap(), key);
    }

    #[test]
    fn free_encoder_matches_struct_encoder() {
        let key = DataKey::new(Bytes::from_static(b"mylist"), 9, 77);
        assert_eq!(encode_data_key(b"mylist", 9, 77), key.encode_to_vec());
    }

    #[test]
    fn data_key_decode_rejects_short_input() {
        assert!(matches!(
            DataKey::decode(&[0u8; 11]),
            Err(DecodeError::Truncated)
        ));
    }

    #[test]
    fn suffix_orders_bytewise_like_numbers() {
        let a = DataKey::new(Bytes::from_static(b"k"), 1, 5).encode_to_vec();
        let b = DataKey::new(Bytes::from_static(b"k"), 1, 6).encode_to_vec();
        let c = DataKey::new(Bytes::from_static(b"k"), 2, 0).encode_to_vec();
        assert!(a < b && b < c);
    }
}
