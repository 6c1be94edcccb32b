//! Engine error type.

use crate::codec::DecodeError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Key absent, stale, empty, or no matching element. The static string
    /// is an advisory discriminator ("missing", "stale", "empty", ...) kept
    /// for diagnostics; callers should branch on [`Error::is_not_found`].
    #[error("not found ({0})")]
    NotFound(&'static str),

    /// Any failure surfaced by the backend, propagated verbatim.
    #[error("backend error: {0}")]
    Backend(#[from] rocksdb::Error),

    /// An on-disk record failed to decode on the read path.
    #[error("corrupt record: {0}")]
    Corrupt(#[from] DecodeError),

    /// Entry points present for the wider data-type interface but not
    /// implemented by this engine.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
