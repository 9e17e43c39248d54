use rusqlite::Connection;

use crate::config::StorageConfig;
use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection, config: &StorageConfig) -> Result<(), StorageError> {
    conn.busy_timeout(config.busy_timeout())?;
    conn.execute_batch(&format!(
        "
        PRAGMA journal_mode = {};
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
        config.journal_mode.as_str()
    ))?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

// No foreign key from attachment_overrides to opportunities: overrides
// outlive a deleted opportunity until maintenance removes them.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS opportunities (
    opportunity_id TEXT PRIMARY KEY,
    solicitation_number TEXT NOT NULL,
    title TEXT,
    description TEXT,
    source_url TEXT,
    raw_data TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    name TEXT,
    email TEXT
);

CREATE TABLE IF NOT EXISTS attachment_overrides (
    override_id BLOB PRIMARY KEY CHECK (length(override_id) = 16),
    opportunity_id TEXT NOT NULL,
    attachment_id TEXT NOT NULL,
    original_name TEXT NOT NULL,
    current_name TEXT NOT NULL,
    edited_by TEXT,
    edited_at INTEGER NOT NULL,
    UNIQUE (opportunity_id, attachment_id)
);

CREATE TABLE IF NOT EXISTS attachment_edit_history (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    history_id BLOB NOT NULL UNIQUE CHECK (length(history_id) = 16),
    override_id BLOB NOT NULL REFERENCES attachment_overrides (override_id),
    previous_name TEXT NOT NULL,
    new_name TEXT NOT NULL,
    edited_by TEXT,
    edited_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_override ON attachment_edit_history (override_id, seq);

CREATE TRIGGER IF NOT EXISTS attachment_edit_history_append_only
BEFORE UPDATE ON attachment_edit_history
BEGIN
    SELECT RAISE(ABORT, 'attachment_edit_history is append-only');
END;
";
