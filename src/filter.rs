//! Background reclamation.
//!
//! Nothing in the write path erases a whole list: `del`, `expire` and the
//! trim rewrite only bump the meta version, leaving the old data records
//! behind as orphans. Two compaction filters collect the garbage:
//!
//! - The meta filter drops stale headers (expired or empty).
//! - The data filter drops records whose owning meta is gone, carries a
//!   different version, is stale, or no longer spans the record's index.
//!
//! The data filter must read meta records from the database that is running
//! the compaction. [`FilterHandle`] breaks that ownership cycle: it holds a
//! weak reference bound after the database opens and cleared before it
//! closes. Whenever the handle cannot resolve, filters keep the record; a
//! later compaction will retry.

use std::ffi::CStr;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use parking_lot::RwLock;
use rocksdb::compaction_filter::{CompactionFilter, Decision};
use rocksdb::compaction_filter_factory::{CompactionFilterContext, CompactionFilterFactory};
use rocksdb::DB;
use tracing::{trace, warn};

use crate::clock::unix_seconds;
use crate::codec::{DataKey, MetaValue};
use crate::db::CF_META;

/// Read-only access to current meta records for compaction-time decisions.
#[derive(Clone, Default)]
pub struct FilterHandle {
    db: Arc<RwLock<Weak<DB>>>,
}

enum MetaLookup {
    Found(MetaValue),
    Missing,
    Unavailable,
}

impl FilterHandle {
    pub(crate) fn unbound() -> Self {
        Self::default()
    }

    pub(crate) fn bind(&self, db: &Arc<DB>) {
        *self.db.write() = Arc::downgrade(db);
    }

    pub(crate) fn clear(&self) {
        *self.db.write() = Weak::new();
    }

    fn read_meta(&self, user_key: &[u8]) -> MetaLookup {
        let db = match self.db.read().upgrade() {
            Some(db) => db,
            None => return MetaLookup::Unavailable,
        };
        let cf = match db.cf_handle(CF_META) {
            Some(cf) => cf,
            None => return MetaLookup::Unavailable,
        };
        match db.get_cf(cf, user_key) {
            Ok(Some(raw)) => match MetaValue::decode(&raw) {
                Ok(meta) => MetaLookup::Found(meta),
                Err(err) => {
                    warn!(error = %err, "undecodable meta value during compaction lookup");
                    MetaLookup::Unavailable
                }
            },
            Ok(None) => MetaLookup::Missing,
            Err(err) => {
                warn!(error = %err, "meta lookup failed during compaction");
                MetaLookup::Unavailable
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MetaFilterFactory;

pub struct MetaFilter;

impl CompactionFilterFactory for MetaFilterFactory {
    type Filter = MetaFilter;

    fn create(&mut self, _context: CompactionFilterContext) -> Self::Filter {
        MetaFilter
    }

    fn name(&self) -> &CStr {
        c"listdb.meta-filter-factory"
    }
}

impl CompactionFilter for MetaFilter {
    fn filter(&mut self, _level: u32, key: &[u8], value: &[u8]) -> Decision {
        match MetaValue::decode(value) {
            Ok(meta) if meta.is_stale(unix_seconds()) => {
                trace!(key = ?key, "dropping stale meta record");
                Decision::Remove
            }
            Ok(_) => Decision::Keep,
            Err(err) => {
                warn!(key = ?key, error = %err, "keeping undecodable meta record");
                Decision::Keep
            }
        }
    }

    fn name(&self) -> &CStr {
        c"listdb.meta-filter"
    }
}

pub struct DataFilterFactory {
    handle: FilterHandle,
}

impl DataFilterFactory {
    pub(crate) fn new(handle: FilterHandle) -> Self {
        Self { handle }
    }
}

impl CompactionFilterFactory for DataFilterFactory {
    type Filter = DataFilter;

    fn create(&mut self, _context: CompactionFilterContext) -> Self::Filter {
        DataFilter::new(self.handle.clone())
    }

    fn name(&self) -> &CStr {
        c"listdb.data-filter-factory"
    }
}

pub struct DataFilter {
    handle: FilterHandle,
    /// Last meta lookup, keyed by user key. Compaction feeds keys in sorted
    /// order, so one lookup covers a whole run of records of the same list.
    /// `None` in the entry means the meta record is absent.
    cache: Option<(Bytes, Option<MetaValue>)>,
}

impl DataFilter {
    fn new(handle: FilterHandle) -> Self {
        Self {
            handle,
            cache: None,
        }
    }

    /// `None` when the backend is unavailable; otherwise the (possibly
    /// absent) current meta for the key. The record being filtered may turn
    /// into an orphan right after a `Keep`; that is fine, the next compaction
    /// sees the newer meta.
    fn cached_meta(&mut self, user_key: &Bytes) -> Option<Option<MetaValue>> {
        if let Some((cached_key, entry)) = &self.cache {
            if cached_key == user_key {
                return Some(*entry);
            }
        }
        match self.handle.read_meta(user_key) {
            MetaLookup::Found(meta) => {
                self.cache = Some((user_key.clone(), Some(meta)));
                Some(Some(meta))
            }
            MetaLookup::Missing => {
                self.cache = Some((user_key.clone(), None));
                Some(None)
            }
            MetaLookup::Unavailable => {
                self.cache = None;
                None
            }
        }
    }
}

impl CompactionFilter for DataFilter {
    fn filter(&mut self, _level: u32, key: &[u8], _value: &[u8]) -> Decision {
        let parsed = match DataKey::decode(key) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(key = ?key, error = %err, "keeping undecodable data key");
                return Decision::Keep;
            }
        };
        let meta = match self.cached_meta(&parsed.user_key) {
            Some(meta) => meta,
            None => return Decision::Keep,
        };
        match meta {
            None => {
                trace!(key = ?parsed.user_key, index = parsed.index, "dropping record without meta");
                Decision::Remove
            }
            Some(meta) => {
                let orphaned = meta.is_stale(unix_seconds())
                    || meta.version != parsed.version
                    || parsed.index <= meta.left_index
                    || parsed.index >= meta.right_index;
                if orphaned {
                    trace!(
                        key = ?parsed.user_key,
                        record_version = parsed.version,
                        live_version = meta.version,
                        index = parsed.index,
                        "dropping orphaned data record"
                    );
                    Decision::Remove
                } else {
                    Decision::Keep
                }
            }
        }
    }

    fn name(&self) -> &CStr {
        c"listdb.data-filter"
    }
}
