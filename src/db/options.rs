#[derive(Debug, Clone)]
pub struct DbOptions {
    pub create_if_missing: bool,
    /// Fsync every committed batch. Leave off for throughput; the backend's
    /// WAL still orders writes either way.
    pub sync_writes: bool,
    pub max_background_jobs: i32,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_writes: false,
            max_background_jobs: 2,
        }
    }
}
