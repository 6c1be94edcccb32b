//! `listdb` is a Redis-style list data type engine persisted on RocksDB.
//!
//! Lists live in two column families of one database:
//! - The default family holds one versioned meta record per list (count,
//!   generation counter, expiry, and two logical cursors).
//! - `data_cf` holds one record per element, keyed by
//!   `(user_key, version, logical index)` under a custom comparator so scans
//!   walk a list in index order.
//!
//! Pushes and pops move the cursors through a monotonic 64-bit index space,
//! giving O(1) amortized work at both ends and O(1) offset lookups. Deleting
//! or expiring a list bumps its version instead of erasing elements; the
//! orphaned records are reclaimed by compaction filters in the background.
//!
//! The engine is synchronous and thread-safe: mutators serialize per user key
//! through [`lock::LockManager`], readers use backend snapshots, and every
//! mutation commits as a single atomic write batch.

mod clock;
pub mod codec;
pub mod comparator;
pub mod db;
pub mod error;
pub mod filter;
pub mod lock;

pub use db::{Db, DbOptions, InsertPosition};
pub use error::{Error, Result};
