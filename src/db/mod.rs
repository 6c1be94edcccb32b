//! The list engine.
//!
//! Every mutating operation follows the same outline: take the per-key
//! lock(s), read the meta record, apply the per-operation missing/stale
//! policy, then build one `WriteBatch` across both column families and commit
//! it. A failed commit discards the batch, so there is no partial state.
//! `llen`, `lindex` and `lrange` skip the lock and read under a backend
//! snapshot instead.

mod options;

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, WriteOptions, DB};
use tracing::{debug, info};

use crate::clock::unix_seconds;
use crate::codec::{encode_data_key, MetaValue};
use crate::comparator::{data_key_ordering, DATA_KEY_COMPARATOR_NAME};
use crate::error::{Error, Result};
use crate::filter::{DataFilterFactory, FilterHandle, MetaFilterFactory};
use crate::lock::LockManager;

pub use options::DbOptions;

pub(crate) const CF_META: &str = "default";
pub(crate) const CF_DATA: &str = "data_cf";

/// Insertion side for [`Db::linsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Engine handle. Cheap to clone; all clones share one backend, lock table
/// and filter binding.
#[derive(Clone)]
pub struct Db {
    inner: Arc<DbInner>,
}

struct DbInner {
    db: Arc<DB>,
    locks: LockManager,
    filter_handle: FilterHandle,
    sync_writes: bool,
}

impl Drop for DbInner {
    fn drop(&mut self) {
        // Detach the compaction filters before the backend shuts down.
        self.filter_handle.clear();
    }
}

fn data_cf_options() -> Options {
    let mut opts = Options::default();
    opts.set_comparator(DATA_KEY_COMPARATOR_NAME, Box::new(data_key_ordering));
    opts
}

/// Translate a user-visible offset into the logical index space.
/// Nonnegative offsets count from the head, negative from the tail.
fn locate(meta: &MetaValue, offset: i64) -> u64 {
    if offset >= 0 {
        meta.left_index
            .wrapping_add(offset as u64)
            .wrapping_add(1)
    } else {
        meta.right_index.wrapping_add_signed(offset)
    }
}

impl Db {
    /// Open (or create) a list store at `path`.
    ///
    /// Opening happens in two passes: the first ensures the data column
    /// family exists, the second mounts both families with the data-key
    /// comparator and the compaction filter factories bound. The data filter
    /// reads meta records through a [`FilterHandle`] that is pointed at the
    /// database only once it is fully open.
    pub fn open(path: impl AsRef<Path>, options: DbOptions) -> Result<Self> {
        let path = path.as_ref();

        let mut base = Options::default();
        base.create_if_missing(options.create_if_missing);
        base.create_missing_column_families(false);
        base.set_max_background_jobs(options.max_background_jobs);

        let existing = DB::list_cf(&base, path).unwrap_or_default();
        if !existing.iter().any(|name| name == CF_DATA) {
            let mut db = DB::open(&base, path)?;
            db.create_cf(CF_DATA, &data_cf_options())?;
        }

        let filter_handle = FilterHandle::unbound();

        let mut meta_cf_opts = Options::default();
        meta_cf_opts.set_compaction_filter_factory(MetaFilterFactory);

        let mut data_cf_opts = data_cf_options();
        data_cf_opts.set_compaction_filter_factory(DataFilterFactory::new(filter_handle.clone()));

        let descriptors = vec![
            ColumnFamilyDescriptor::new(CF_META, meta_cf_opts),
            ColumnFamilyDescriptor::new(CF_DATA, data_cf_opts),
        ];
        let db = Arc::new(DB::open_cf_descriptors(&base, path, descriptors)?);
        filter_handle.bind(&db);
        info!(path = %path.display(), "opened list store");

        Ok(Self {
            inner: Arc::new(DbInner {
                db,
                locks: LockManager::new(),
                filter_handle,
                sync_writes: options.sync_writes,
            }),
        })
    }

    fn backend(&self) -> &DB {
        &self.inner.db
    }

    fn meta_cf(&self) -> &ColumnFamily {
        self.backend()
            .cf_handle(CF_META)
            .expect("meta column family is mounted for the lifetime of the handle")
    }

    fn data_cf(&self) -> &ColumnFamily {
        self.backend()
            .cf_handle(CF_DATA)
            .expect("data column family is mounted for the lifetime of the handle")
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.inner.sync_writes);
        opts
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.backend().write_opt(batch, &self.write_options())?;
        Ok(())
    }

    fn put_meta(&self, key: &[u8], meta: &MetaValue) -> Result<()> {
        self.backend()
            .put_cf_opt(self.meta_cf(), key, meta.encode_to_vec(), &self.write_options())?;
        Ok(())
    }

    fn read_meta(&self, key: &[u8]) -> Result<Option<MetaValue>> {
        match self.backend().get_cf(self.meta_cf(), key)? {
            Some(raw) => Ok(Some(MetaValue::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Standard preamble for operations that require an existing live list.
    fn live_meta(&self, key: &[u8], now: u32) -> Result<MetaValue> {
        let Some(meta) = self.read_meta(key)? else {
            return Err(Error::NotFound("missing"));
        };
        if meta.is_expired(now) {
            return Err(Error::NotFound("stale"));
        }
        if meta.count == 0 {
            return Err(Error::NotFound("empty"));
        }
        Ok(meta)
    }

    /// Prepend `values`, leftmost input ending up outermost. Creates the list
    /// (with a bumped version) when it is missing or stale. Returns the new
    /// length.
    pub fn lpush(&self, key: impl AsRef<[u8]>, values: &[Bytes]) -> Result<u64> {
        self.push(key.as_ref(), values, Side::Left, true)
    }

    /// Append `values`. Creates the list when missing or stale. Returns the
    /// new length.
    pub fn rpush(&self, key: impl AsRef<[u8]>, values: &[Bytes]) -> Result<u64> {
        self.push(key.as_ref(), values, Side::Right, true)
    }

    /// Prepend a single value, but only to an existing live list.
    pub fn lpushx(&self, key: impl AsRef<[u8]>, value: impl Into<Bytes>) -> Result<u64> {
        self.push(key.as_ref(), &[value.into()], Side::Left, false)
    }

    /// Append a single value, but only to an existing live list.
    pub fn rpushx(&self, key: impl AsRef<[u8]>, value: impl Into<Bytes>) -> Result<u64> {
        self.push(key.as_ref(), &[value.into()], Side::Right, false)
    }

    fn push(&self, key: &[u8], values: &[Bytes], side: Side, create_missing: bool) -> Result<u64> {
        let now = unix_seconds();
        let _lock = self.inner.locks.scoped(key);

        let existing = self.read_meta(key)?;
        if values.is_empty() {
            // Nothing to write; report the current live length.
            return Ok(match existing {
                Some(meta) if !meta.is_stale(now) => meta.count,
                _ => 0,
            });
        }

        let mut meta = match existing {
            Some(meta) => meta,
            None if create_missing => MetaValue::new(),
            None => return Err(Error::NotFound("missing")),
        };
        if meta.is_stale(now) {
            if !create_missing {
                return Err(Error::NotFound(if meta.is_expired(now) {
                    "stale"
                } else {
                    "empty"
                }));
            }
            // Fresh slate: the version bump orphans whatever the previous
            // incarnation left behind.
            meta.reset(now);
        }

        let mut batch = WriteBatch::default();
        for value in values {
            let index = match side {
                Side::Left => meta.claim_left(),
                Side::Right => meta.claim_right(),
            };
            batch.put_cf(self.data_cf(), encode_data_key(key, meta.version, index), value);
        }
        batch.put_cf(self.meta_cf(), key, meta.encode_to_vec());
        self.commit(batch)?;
        Ok(meta.count)
    }

    /// Pop the head element.
    pub fn lpop(&self, key: impl AsRef<[u8]>) -> Result<Bytes> {
        self.pop(key.as_ref(), Side::Left)
    }

    /// Pop the tail element.
    pub fn rpop(&self, key: impl AsRef<[u8]>) -> Result<Bytes> {
        self.pop(key.as_ref(), Side::Right)
    }

    fn pop(&self, key: &[u8], side: Side) -> Result<Bytes> {
        let now = unix_seconds();
        let _lock = self.inner.locks.scoped(key);
        let mut meta = self.live_meta(key, now)?;

        let index = match side {
            Side::Left => meta.left_index + 1,
            Side::Right => meta.right_index - 1,
        };
        let data_key = encode_data_key(key, meta.version, index);
        let payload = self
            .backend()
            .get_cf(self.data_cf(), &data_key)?
            .ok_or(Error::NotFound("element"))?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.data_cf(), &data_key);
        match side {
            Side::Left => meta.release_left(),
            Side::Right => meta.release_right(),
        }
        batch.put_cf(self.meta_cf(), key, meta.encode_to_vec());
        self.commit(batch)?;
        Ok(Bytes::from(payload))
    }

    /// Element at `offset` (`0` is the head, `-1` the tail). Reads under a
    /// snapshot without taking the key lock.
    pub fn lindex(&self, key: impl AsRef<[u8]>, offset: i64) -> Result<Bytes> {
        let key = key.as_ref();
        let now = unix_seconds();
        let snapshot = self.backend().snapshot();

        let Some(raw) = snapshot.get_cf(self.meta_cf(), key)? else {
            return Err(Error::NotFound("missing"));
        };
        let meta = MetaValue::decode(&raw)?;
        if meta.is_expired(now) {
            return Err(Error::NotFound("stale"));
        }
        if meta.count == 0 {
            return Err(Error::NotFound("empty"));
        }

        let target = locate(&meta, offset);
        if target <= meta.left_index || target >= meta.right_index {
            return Err(Error::NotFound("offset out of range"));
        }
        match snapshot.get_cf(self.data_cf(), encode_data_key(key, meta.version, target))? {
            Some(payload) => Ok(Bytes::from(payload)),
            None => Err(Error::NotFound("offset out of range")),
        }
    }

    /// Overwrite the element at `offset` in place.
    pub fn lset(&self, key: impl AsRef<[u8]>, offset: i64, value: impl Into<Bytes>) -> Result<()> {
        let key = key.as_ref();
        let now = unix_seconds();
        let _lock = self.inner.locks.scoped(key);
        let meta = self.live_meta(key, now)?;

        let target = locate(&meta, offset);
        if target <= meta.left_index || target >= meta.right_index {
            return Err(Error::NotFound("offset out of range"));
        }
        self.backend().put_cf_opt(
            self.data_cf(),
            encode_data_key(key, meta.version, target),
            value.into(),
            &self.write_options(),
        )?;
        Ok(())
    }

    /// Elements in the inclusive window `[start, stop]` after offset
    /// translation. Out-of-range ends clamp to the list; an inverted window
    /// is empty. Reads under a snapshot without taking the key lock.
    pub fn lrange(&self, key: impl AsRef<[u8]>, start: i64, stop: i64) -> Result<Vec<Bytes>> {
        let key = key.as_ref();
        let now = unix_seconds();
        let snapshot = self.backend().snapshot();

        let Some(raw) = snapshot.get_cf(self.meta_cf(), key)? else {
            return Err(Error::NotFound("missing"));
        };
        let meta = MetaValue::decode(&raw)?;
        if meta.is_expired(now) {
            return Err(Error::NotFound("stale"));
        }
        if meta.count == 0 {
            return Err(Error::NotFound("empty"));
        }

        let mut start_index = locate(&meta, start);
        let mut stop_index = locate(&meta, stop);
        if start_index > stop_index {
            return Ok(Vec::new());
        }
        start_index = start_index.max(meta.left_index + 1);
        stop_index = stop_index.min(meta.right_index - 1);

        let mut out = Vec::new();
        let mut iter = snapshot.raw_iterator_cf(self.data_cf());
        iter.seek(encode_data_key(key, meta.version, start_index));
        let mut cursor = start_index;
        while cursor <= stop_index && iter.valid() {
            if let Some(value) = iter.value() {
                out.push(Bytes::copy_from_slice(value));
            }
            iter.next();
            cursor += 1;
        }
        iter.status()?;
        Ok(out)
    }

    /// Keep only the inclusive window `[start, stop]`; everything else is
    /// discarded. Missing and stale lists are left untouched.
    ///
    /// Two phases: the critical section collects the survivors and resets the
    /// meta in place (the version bump orphans every old record), then the
    /// survivors are re-pushed through [`Db::rpush`]. Compaction reaps the
    /// orphans later.
    pub fn ltrim(&self, key: impl AsRef<[u8]>, start: i64, stop: i64) -> Result<()> {
        let key = key.as_ref();
        let survivors = {
            let now = unix_seconds();
            let _lock = self.inner.locks.scoped(key);
            let Some(mut meta) = self.read_meta(key)? else {
                return Ok(());
            };
            if meta.is_stale(now) {
                return Ok(());
            }

            let mut start_index = locate(&meta, start);
            let mut stop_index = locate(&meta, stop);
            if start_index > stop_index {
                return Ok(());
            }
            start_index = start_index.max(meta.left_index + 1);
            stop_index = stop_index.min(meta.right_index - 1);

            let mut survivors = Vec::new();
            let mut iter = self.backend().raw_iterator_cf(self.data_cf());
            iter.seek(encode_data_key(key, meta.version, start_index));
            let mut cursor = start_index;
            while cursor <= stop_index && iter.valid() {
                if let Some(value) = iter.value() {
                    survivors.push(Bytes::copy_from_slice(value));
                }
                iter.next();
                cursor += 1;
            }
            iter.status()?;

            meta.reset(now);
            self.put_meta(key, &meta)?;
            survivors
        };

        if survivors.is_empty() {
            return Ok(());
        }
        self.rpush(key, &survivors)?;
        Ok(())
    }

    /// Insert `value` next to the first element equal to `pivot`, scanning
    /// from the head. Returns the new length, or `-1` when no pivot matches.
    ///
    /// The shorter flank of the pivot is rewritten one slot outward to free
    /// the insertion slot; the relative order of everything else is
    /// preserved. Equality is on the full payload bytes.
    pub fn linsert(
        &self,
        key: impl AsRef<[u8]>,
        position: InsertPosition,
        pivot: impl AsRef<[u8]>,
        value: impl Into<Bytes>,
    ) -> Result<i64> {
        let key = key.as_ref();
        let pivot = pivot.as_ref();
        let now = unix_seconds();
        let _lock = self.inner.locks.scoped(key);
        let mut meta = self.live_meta(key, now)?;
        let version = meta.version;

        let mut iter = self.backend().raw_iterator_cf(self.data_cf());
        let mut pivot_index = None;
        let mut cursor = meta.left_index + 1;
        iter.seek(encode_data_key(key, version, cursor));
        while cursor < meta.right_index && iter.valid() {
            if iter.value() == Some(pivot) {
                pivot_index = Some(cursor);
                break;
            }
            iter.next();
            cursor += 1;
        }
        iter.status()?;
        let Some(pivot_index) = pivot_index else {
            return Ok(-1);
        };

        let mut batch = WriteBatch::default();
        // Unsigned-safe midpoint: the cursors sit near 2^63, so adding them
        // before halving would overflow.
        let midpoint = meta.left_index + (meta.right_index - meta.left_index) / 2;
        let target_index;
        if pivot_index <= midpoint {
            // Shift the head-side run one slot left.
            target_index = match position {
                InsertPosition::Before => pivot_index - 1,
                InsertPosition::After => pivot_index,
            };
            let mut moved = Vec::new();
            let mut cursor = meta.left_index + 1;
            iter.seek(encode_data_key(key, version, cursor));
            while cursor <= pivot_index && iter.valid() {
                if cursor == pivot_index {
                    if position == InsertPosition::After {
                        if let Some(value) = iter.value() {
                            moved.push(Bytes::copy_from_slice(value));
                        }
                    }
                    break;
                }
                if let Some(value) = iter.value() {
                    moved.push(Bytes::copy_from_slice(value));
                }
                iter.next();
                cursor += 1;
            }
            iter.status()?;

            let mut slot = meta.left_index;
            for payload in &moved {
                batch.put_cf(self.data_cf(), encode_data_key(key, version, slot), payload);
                slot += 1;
            }
            meta.left_index -= 1;
        } else {
            // Shift the tail-side run one slot right.
            target_index = match position {
                InsertPosition::Before => pivot_index,
                InsertPosition::After => pivot_index + 1,
            };
            let mut moved = Vec::new();
            let mut cursor = pivot_index;
            iter.seek(encode_data_key(key, version, cursor));
            while cursor < meta.right_index && iter.valid() {
                if !(cursor == pivot_index && position == InsertPosition::After) {
                    if let Some(value) = iter.value() {
                        moved.push(Bytes::copy_from_slice(value));
                    }
                }
                iter.next();
                cursor += 1;
            }
            iter.status()?;

            let mut slot = target_index + 1;
            for payload in &moved {
                batch.put_cf(self.data_cf(), encode_data_key(key, version, slot), payload);
                slot += 1;
            }
            meta.right_index += 1;
        }

        meta.count += 1;
        batch.put_cf(self.data_cf(), encode_data_key(key, version, target_index), value.into());
        batch.put_cf(self.meta_cf(), key, meta.encode_to_vec());
        self.commit(batch)?;
        Ok(meta.count as i64)
    }

    /// Remove elements equal to `value`. `count > 0` removes the first
    /// `count` matches from the head, `count < 0` the first `|count|` from
    /// the tail, `count == 0` every match. Returns how many were removed;
    /// zero removals surface as `NotFound`.
    ///
    /// The shorter of the two runs flanking the victims is rewritten into
    /// contiguous slots, and that side's cursor is pulled inward so the
    /// rewritten run abuts the untouched far end. Survivor order is
    /// preserved. Equality is on the full payload bytes.
    pub fn lrem(&self, key: impl AsRef<[u8]>, count: i64, value: impl AsRef<[u8]>) -> Result<u64> {
        let key = key.as_ref();
        let target = value.as_ref();
        let now = unix_seconds();
        let _lock = self.inner.locks.scoped(key);
        let mut meta = self.live_meta(key, now)?;
        let version = meta.version;

        let start_index = meta.left_index + 1;
        let stop_index = meta.right_index - 1;
        let limit = count.unsigned_abs();

        let mut victims: Vec<u64> = Vec::new();
        let mut iter = self.backend().raw_iterator_cf(self.data_cf());
        if count >= 0 {
            let mut cursor = start_index;
            iter.seek(encode_data_key(key, version, start_index));
            while cursor <= stop_index
                && iter.valid()
                && (count == 0 || (victims.len() as u64) < limit)
            {
                if iter.value() == Some(target) {
                    victims.push(cursor);
                }
                iter.next();
                cursor += 1;
            }
        } else {
            let mut cursor = stop_index;
            iter.seek(encode_data_key(key, version, stop_index));
            while cursor >= start_index && iter.valid() && (victims.len() as u64) < limit {
                if iter.value() == Some(target) {
                    victims.push(cursor);
                }
                iter.prev();
                cursor -= 1;
            }
        }
        iter.status()?;

        if victims.is_empty() {
            return Err(Error::NotFound("no matching element"));
        }
        let removed = victims.len() as u64;

        // Outermost victim toward the head resp. tail; the scan direction
        // decides which end of `victims` holds which.
        let lowest_victim = if count >= 0 {
            victims[0]
        } else {
            *victims.last().expect("victims is non-empty")
        };
        let highest_victim = if count >= 0 {
            *victims.last().expect("victims is non-empty")
        } else {
            victims[0]
        };

        let head_run = highest_victim - start_index;
        let tail_run = stop_index - lowest_victim;

        let mut batch = WriteBatch::default();
        let mut skip_budget = removed;
        if head_run <= tail_run {
            // Rewrite [start_index, highest_victim] inward from the victim,
            // dropping matches until the budget is spent.
            let mut write_slot = highest_victim;
            let mut cursor = highest_victim;
            iter.seek(encode_data_key(key, version, highest_victim));
            while cursor >= start_index && iter.valid() {
                if iter.value() == Some(target) && skip_budget > 0 {
                    skip_budget -= 1;
                } else if let Some(payload) = iter.value() {
                    batch.put_cf(self.data_cf(), encode_data_key(key, version, write_slot), payload);
                    write_slot -= 1;
                }
                iter.prev();
                if cursor == start_index {
                    break;
                }
                cursor -= 1;
            }
            iter.status()?;
            meta.left_index += removed;
        } else {
            let mut write_slot = lowest_victim;
            let mut cursor = lowest_victim;
            iter.seek(encode_data_key(key, version, lowest_victim));
            while cursor <= stop_index && iter.valid() {
                if iter.value() == Some(target) && skip_budget > 0 {
                    skip_budget -= 1;
                } else if let Some(payload) = iter.value() {
                    batch.put_cf(self.data_cf(), encode_data_key(key, version, write_slot), payload);
                    write_slot += 1;
                }
                iter.next();
                cursor += 1;
            }
            iter.status()?;
            meta.right_index -= removed;
        }

        meta.count -= removed;
        batch.put_cf(self.meta_cf(), key, meta.encode_to_vec());
        self.commit(batch)?;
        Ok(removed)
    }

    /// Atomically pop the tail of `source` and push it onto the head of
    /// `destination`. With `source == destination` this rotates the list.
    /// The element is returned only after the batch commits.
    pub fn rpoplpush(
        &self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
    ) -> Result<Bytes> {
        let source = source.as_ref();
        let destination = destination.as_ref();
        let now = unix_seconds();
        let _locks = self.inner.locks.scoped_multi(&[source, destination]);

        if source == destination {
            let mut meta = self.live_meta(source, now)?;
            let tail_index = meta.right_index - 1;
            let tail_key = encode_data_key(source, meta.version, tail_index);
            let payload = self
                .backend()
                .get_cf(self.data_cf(), &tail_key)?
                .ok_or(Error::NotFound("element"))?;
            if meta.count == 1 {
                // Rotating a singleton changes nothing.
                return Ok(Bytes::from(payload));
            }

            let mut batch = WriteBatch::default();
            batch.delete_cf(self.data_cf(), &tail_key);
            batch.put_cf(
                self.data_cf(),
                encode_data_key(source, meta.version, meta.left_index),
                &payload,
            );
            meta.right_index -= 1;
            meta.left_index -= 1;
            batch.put_cf(self.meta_cf(), source, meta.encode_to_vec());
            self.commit(batch)?;
            return Ok(Bytes::from(payload));
        }

        let mut batch = WriteBatch::default();

        let mut src_meta = self.live_meta(source, now)?;
        let tail_index = src_meta.right_index - 1;
        let tail_key = encode_data_key(source, src_meta.version, tail_index);
        let payload = self
            .backend()
            .get_cf(self.data_cf(), &tail_key)?
            .ok_or(Error::NotFound("element"))?;
        batch.delete_cf(self.data_cf(), &tail_key);
        src_meta.release_right();
        batch.put_cf(self.meta_cf(), source, src_meta.encode_to_vec());

        let mut dst_meta = self.read_meta(destination)?.unwrap_or_default();
        if dst_meta.is_stale(now) {
            dst_meta.reset(now);
        }
        let slot = dst_meta.claim_left();
        batch.put_cf(
            self.data_cf(),
            encode_data_key(destination, dst_meta.version, slot),
            &payload,
        );
        batch.put_cf(self.meta_cf(), destination, dst_meta.encode_to_vec());

        self.commit(batch)?;
        Ok(Bytes::from(payload))
    }

    /// Current length. Lock-free meta read; missing, stale and empty lists
    /// all report `NotFound`.
    pub fn llen(&self, key: impl AsRef<[u8]>) -> Result<u64> {
        let meta = self.live_meta(key.as_ref(), unix_seconds())?;
        Ok(meta.count)
    }

    /// Expire the list `ttl` seconds from now. A non-positive `ttl`
    /// invalidates immediately (version bump; compaction reaps the records).
    pub fn expire(&self, key: impl AsRef<[u8]>, ttl: i64) -> Result<()> {
        let key = key.as_ref();
        let now = unix_seconds();
        let _lock = self.inner.locks.scoped(key);
        let mut meta = self.live_meta(key, now)?;
        if ttl > 0 {
            let ttl = u32::try_from(ttl).unwrap_or(u32::MAX);
            meta.expires_at = now.saturating_add(ttl);
        } else {
            meta.reset(now);
        }
        self.put_meta(key, &meta)
    }

    /// Drop the list. The meta is reset in place; the version bump orphans
    /// every data record for the compaction filter.
    pub fn del(&self, key: impl AsRef<[u8]>) -> Result<()> {
        let key = key.as_ref();
        let now = unix_seconds();
        let _lock = self.inner.locks.scoped(key);
        let mut meta = self.live_meta(key, now)?;
        meta.reset(now);
        self.put_meta(key, &meta)
    }

    /// Manually compact both column families over `[from, to]`, meta first so
    /// the data filter already sees the reaped headers.
    pub fn compact_range(&self, from: Option<&[u8]>, to: Option<&[u8]>) -> Result<()> {
        debug!(from = ?from, to = ?to, "manual compaction");
        self.backend().compact_range_cf(self.meta_cf(), from, to);
        self.backend().compact_range_cf(self.data_cf(), from, to);
        Ok(())
    }

    /// Part of the wider data-type interface; not implemented by this engine.
    pub fn scan(&self, _start_key: &[u8], _pattern: &[u8]) -> Result<Vec<Bytes>> {
        Err(Error::Unsupported("scan"))
    }

    /// Part of the wider data-type interface; not implemented by this engine.
    pub fn expireat(&self, _key: &[u8], _timestamp: u32) -> Result<()> {
        Err(Error::Unsupported("expireat"))
    }

    /// Part of the wider data-type interface; not implemented by this engine.
    pub fn persist(&self, _key: &[u8]) -> Result<()> {
        Err(Error::Unsupported("persist"))
    }

    /// Part of the wider data-type interface; not implemented by this engine.
    pub fn ttl(&self, _key: &[u8]) -> Result<i64> {
        Err(Error::Unsupported("ttl"))
    }
}

#[cfg(test)]
impl Db {
    pub(crate) fn current_meta(&self, key: &[u8]) -> Result<Option<MetaValue>> {
        self.read_meta(key)
    }

    pub(crate) fn filter_handle(&self) -> &FilterHandle {
        &self.inner.filter_handle
    }

    pub(crate) fn flush_for_test(&self) -> Result<()> {
        self.backend().flush_cf(self.meta_cf())?;
        self.backend().flush_cf(self.data_cf())?;
        Ok(())
    }

    pub(crate) fn physical_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.backend().get_cf(self.meta_cf(), key)?)
    }

    pub(crate) fn physical_data_records(&self, key: &[u8]) -> Result<usize> {
        use crate::codec::DataKey;

        let mut found = 0;
        let mut iter = self.backend().raw_iterator_cf(self.data_cf());
        iter.seek_to_first();
        while iter.valid() {
            if let Some(raw) = iter.key() {
                if DataKey::decode(raw).map_or(false, |dk| dk.user_key.as_ref() == key) {
                    found += 1;
                }
            }
            iter.next();
        }
        iter.status()?;
        Ok(found)
    }
}
