use tempfile::TempDir;
use usher_engine::{AttachmentEngine, InMemorySource};
use usher_storage::{SqliteStorage, StorageConfig, StorageError};

/// A database file that several engines open independently, as separate
/// request handlers would.
pub struct SharedDatabase {
    dir: TempDir,
    pub source: InMemorySource,
}

impl SharedDatabase {
    pub fn new() -> Result<Self, StorageError> {
        crate::init_tracing();
        let dir = tempfile::tempdir()
            .map_err(|e| StorageError::Config(format!("temp dir: {e}")))?;
        Ok(Self {
            dir,
            source: InMemorySource::new(),
        })
    }

    pub fn config(&self) -> StorageConfig {
        let path = self.dir.path().join("attachments.db");
        StorageConfig {
            busy_timeout_ms: 10_000,
            ..StorageConfig::with_path(path.to_string_lossy().into_owned())
        }
    }

    /// A new engine with its own connection to the shared file.
    pub fn engine(&self) -> Result<AttachmentEngine, StorageError> {
        let storage = SqliteStorage::open_with(&self.config())?;
        Ok(AttachmentEngine::new(storage, self.source.clone()))
    }
}
