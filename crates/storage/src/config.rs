use std::time::Duration;

use serde::Deserialize;

use crate::error::StorageError;

/// SQLite journal modes we allow a deployment to pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Wal,
    Delete,
    Truncate,
    Memory,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Memory => "MEMORY",
        }
    }
}

/// Storage settings, usually read from the `[storage]` table of a TOML file.
///
/// ```toml
/// path = "/var/lib/usher/attachments.db"
/// busy_timeout_ms = 5000
/// journal_mode = "wal"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. `None` keeps everything in memory.
    pub path: Option<String>,
    /// How long a writer waits for another writer's lock before failing.
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
            journal_mode: JournalMode::Wal,
        }
    }
}

impl StorageConfig {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self, StorageError> {
        toml::from_str(input).map_err(|e| StorageError::Config(e.to_string()))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() -> Result<(), StorageError> {
        let config = StorageConfig::from_toml_str("")?;
        assert!(config.path.is_none());
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.journal_mode, JournalMode::Wal);
        Ok(())
    }

    #[test]
    fn toml_overrides_fields() -> Result<(), StorageError> {
        let config = StorageConfig::from_toml_str(
            "path = \"/tmp/a.db\"\nbusy_timeout_ms = 250\njournal_mode = \"delete\"\n",
        )?;
        assert_eq!(config.path.as_deref(), Some("/tmp/a.db"));
        assert_eq!(config.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.journal_mode.as_str(), "DELETE");
        Ok(())
    }

    #[test]
    fn unknown_journal_mode_rejected() {
        let err = StorageConfig::from_toml_str("journal_mode = \"off\"").unwrap_err();
        assert!(matches!(err, StorageError::Config(_)));
    }
}
