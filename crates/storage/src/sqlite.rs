use rusqlite::{Connection, Row, TransactionBehavior};
use tracing::debug;

use usher_core::{ActorProfile, ids::*, time};

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::traits::{
    CommittedRename, HistoryRecord, OpportunityRecord, OverrideRecord, RenameCommit, Storage,
};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        Self::open_with(&StorageConfig::with_path(path))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open_with(&StorageConfig::default())
    }

    pub fn open_with(config: &StorageConfig) -> Result<Self, StorageError> {
        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        crate::schema::init_schema(&conn, config)?;
        Ok(Self { conn })
    }
}

const OVERRIDE_COLUMNS: &str = "override_id, opportunity_id, attachment_id, original_name, current_name, edited_by, edited_at";

const OPPORTUNITY_COLUMNS: &str =
    "opportunity_id, solicitation_number, title, description, source_url, raw_data, created_at";

const HISTORY_COLUMNS: &str =
    "history_id, seq, override_id, previous_name, new_name, edited_by, edited_at";

fn read_override(row: &Row) -> Result<OverrideRecord, StorageError> {
    let override_id_bytes: Vec<u8> = row.get(0)?;
    let opportunity_id: String = row.get(1)?;
    let attachment_id: String = row.get(2)?;
    let original_name: String = row.get(3)?;
    let current_name: String = row.get(4)?;
    let edited_by: Option<String> = row.get(5)?;
    let edited_at: i64 = row.get(6)?;

    Ok(OverrideRecord {
        override_id: OverrideId::from_bytes(to_array::<16>(override_id_bytes, "override_id")?),
        opportunity_id: OpportunityId::new(opportunity_id),
        attachment_id: AttachmentId::new(attachment_id),
        original_name,
        current_name,
        edited_by: edited_by.map(UserId::new),
        edited_at: time::from_millis(edited_at)?,
    })
}

fn read_history(row: &Row) -> Result<HistoryRecord, StorageError> {
    let history_id_bytes: Vec<u8> = row.get(0)?;
    let seq: i64 = row.get(1)?;
    let override_id_bytes: Vec<u8> = row.get(2)?;
    let previous_name: String = row.get(3)?;
    let new_name: String = row.get(4)?;
    let edited_by: Option<String> = row.get(5)?;
    let edited_at: i64 = row.get(6)?;

    Ok(HistoryRecord {
        history_id: HistoryId::from_bytes(to_array::<16>(history_id_bytes, "history_id")?),
        seq,
        override_id: OverrideId::from_bytes(to_array::<16>(override_id_bytes, "override_id")?),
        previous_name,
        new_name,
        edited_by: edited_by.map(UserId::new),
        edited_at: time::from_millis(edited_at)?,
    })
}

fn read_opportunity(row: &Row) -> Result<OpportunityRecord, StorageError> {
    let opportunity_id: String = row.get(0)?;
    let created_at: i64 = row.get(6)?;
    Ok(OpportunityRecord {
        opportunity_id: OpportunityId::new(opportunity_id),
        solicitation_number: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        source_url: row.get(4)?,
        raw_data: row.get(5)?,
        created_at: time::from_millis(created_at)?,
    })
}

/// Point lookup shared by plain reads and the rename transaction.
fn find_override(
    conn: &Connection,
    opportunity_id: &OpportunityId,
    attachment_id: &AttachmentId,
) -> Result<Option<OverrideRecord>, StorageError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OVERRIDE_COLUMNS} FROM attachment_overrides WHERE opportunity_id = ?1 AND attachment_id = ?2"
    ))?;
    let mut rows = stmt.query(rusqlite::params![
        opportunity_id.as_str(),
        attachment_id.as_str()
    ])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_override(row)?)),
        None => Ok(None),
    }
}

fn insert_override(conn: &Connection, record: &OverrideRecord) -> Result<(), StorageError> {
    let result = conn.execute(
        &format!("INSERT INTO attachment_overrides ({OVERRIDE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        rusqlite::params![
            record.override_id.as_bytes().as_slice(),
            record.opportunity_id.as_str(),
            record.attachment_id.as_str(),
            record.original_name,
            record.current_name,
            record.edited_by.as_ref().map(UserId::as_str),
            time::to_millis(record.edited_at),
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(StorageError::ConstraintViolation(format!(
                "override already exists for {}/{}",
                record.opportunity_id, record.attachment_id
            )))
        }
        Err(e) => Err(StorageError::Sqlite(e)),
    }
}

fn update_override(conn: &Connection, record: &OverrideRecord) -> Result<(), StorageError> {
    let changed = conn.execute(
        "UPDATE attachment_overrides SET current_name = ?1, edited_by = ?2, edited_at = ?3 WHERE override_id = ?4",
        rusqlite::params![
            record.current_name,
            record.edited_by.as_ref().map(UserId::as_str),
            time::to_millis(record.edited_at),
            record.override_id.as_bytes().as_slice(),
        ],
    )?;
    if changed == 0 {
        return Err(StorageError::NotFound(format!("override {}", record.override_id)));
    }
    Ok(())
}

fn append_history(
    conn: &Connection,
    override_id: OverrideId,
    previous_name: &str,
    rename: &RenameCommit,
) -> Result<HistoryRecord, StorageError> {
    let history_id = HistoryId::new();
    conn.execute(
        "INSERT INTO attachment_edit_history (history_id, override_id, previous_name, new_name, edited_by, edited_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            history_id.as_bytes().as_slice(),
            override_id.as_bytes().as_slice(),
            previous_name,
            rename.new_name,
            rename.edited_by.as_ref().map(UserId::as_str),
            time::to_millis(rename.edited_at),
        ],
    )?;
    Ok(HistoryRecord {
        history_id,
        seq: conn.last_insert_rowid(),
        override_id,
        previous_name: previous_name.to_string(),
        new_name: rename.new_name.clone(),
        edited_by: rename.edited_by.clone(),
        edited_at: rename.edited_at,
    })
}

fn count(conn: &Connection, sql: &str) -> Result<u64, StorageError> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n as u64)
}

impl Storage for SqliteStorage {
    fn put_opportunity(&mut self, record: &OpportunityRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO opportunities (opportunity_id, solicitation_number, title, description, source_url, raw_data, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(opportunity_id) DO UPDATE SET solicitation_number = excluded.solicitation_number, title = excluded.title, description = excluded.description, source_url = excluded.source_url, raw_data = excluded.raw_data",
            rusqlite::params![
                record.opportunity_id.as_str(),
                record.solicitation_number,
                record.title,
                record.description,
                record.source_url,
                record.raw_data,
                time::to_millis(record.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<OpportunityRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE opportunity_id = ?1"
        ))?;
        let mut rows = stmt.query(rusqlite::params![opportunity_id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(read_opportunity(row)?)),
            None => Ok(None),
        }
    }

    fn delete_opportunity(&mut self, opportunity_id: &OpportunityId) -> Result<bool, StorageError> {
        let changed = self.conn.execute(
            "DELETE FROM opportunities WHERE opportunity_id = ?1",
            rusqlite::params![opportunity_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn opportunity_count(&self) -> Result<u64, StorageError> {
        count(&self.conn, "SELECT COUNT(*) FROM opportunities")
    }

    fn list_opportunities(&self) -> Result<Vec<OpportunityRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities ORDER BY opportunity_id"
        ))?;
        let records = stmt
            .query_map([], |row| read_opportunity(row).map_err(tunnel))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn put_user(&mut self, profile: &ActorProfile) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO users (user_id, name, email) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET name = excluded.name, email = excluded.email",
            rusqlite::params![profile.user_id.as_str(), profile.name, profile.email],
        )?;
        Ok(())
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<ActorProfile>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, email FROM users WHERE user_id = ?1")?;
        let mut rows = stmt.query(rusqlite::params![user_id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(ActorProfile {
                user_id: user_id.clone(),
                name: row.get(0)?,
                email: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    fn get_override(
        &self,
        opportunity_id: &OpportunityId,
        attachment_id: &AttachmentId,
    ) -> Result<Option<OverrideRecord>, StorageError> {
        find_override(&self.conn, opportunity_id, attachment_id)
    }

    fn get_overrides_for_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<OverrideRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OVERRIDE_COLUMNS} FROM attachment_overrides WHERE opportunity_id = ?1 ORDER BY attachment_id"
        ))?;
        let records = stmt
            .query_map(rusqlite::params![opportunity_id.as_str()], |row| {
                read_override(row).map_err(tunnel)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn commit_rename(&mut self, rename: &RenameCommit) -> Result<CommittedRename, StorageError> {
        // IMMEDIATE takes the write lock up front, so two renames of the same
        // attachment cannot both read the same previous name.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = find_override(&tx, &rename.opportunity_id, &rename.attachment_id)?;
        let first_edit = existing.is_none();

        let (record, history) = match existing {
            None => {
                let record = OverrideRecord {
                    override_id: OverrideId::new(),
                    opportunity_id: rename.opportunity_id.clone(),
                    attachment_id: rename.attachment_id.clone(),
                    original_name: rename.original_name.clone(),
                    current_name: rename.new_name.clone(),
                    edited_by: rename.edited_by.clone(),
                    edited_at: rename.edited_at,
                };
                insert_override(&tx, &record)?;
                let history =
                    append_history(&tx, record.override_id, &rename.original_name, rename)?;
                (record, history)
            }
            Some(mut record) => {
                let history =
                    append_history(&tx, record.override_id, &record.current_name, rename)?;
                record.current_name = rename.new_name.clone();
                record.edited_by = rename.edited_by.clone();
                record.edited_at = rename.edited_at;
                update_override(&tx, &record)?;
                (record, history)
            }
        };

        tx.commit()?;
        debug!(
            opportunity = %record.opportunity_id,
            attachment = %record.attachment_id,
            seq = history.seq,
            first_edit,
            "rename committed"
        );
        Ok(CommittedRename {
            record,
            history,
            first_edit,
        })
    }

    fn get_history(&self, override_id: OverrideId) -> Result<Vec<HistoryRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS} FROM attachment_edit_history WHERE override_id = ?1 ORDER BY seq"
        ))?;
        let records = stmt
            .query_map(rusqlite::params![override_id.as_bytes().as_slice()], |row| {
                read_history(row).map_err(tunnel)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn override_count(&self) -> Result<u64, StorageError> {
        count(&self.conn, "SELECT COUNT(*) FROM attachment_overrides")
    }

    fn history_count(&self) -> Result<u64, StorageError> {
        count(&self.conn, "SELECT COUNT(*) FROM attachment_edit_history")
    }

    fn no_op_override_count(&self) -> Result<u64, StorageError> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM attachment_overrides WHERE current_name = original_name",
        )
    }

    fn get_orphaned_overrides(&self) -> Result<Vec<OverrideRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OVERRIDE_COLUMNS} FROM attachment_overrides o
             WHERE NOT EXISTS (SELECT 1 FROM opportunities p WHERE p.opportunity_id = o.opportunity_id)
             ORDER BY opportunity_id, attachment_id"
        ))?;
        let records = stmt
            .query_map([], |row| read_override(row).map_err(tunnel))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn delete_overrides(&mut self, override_ids: &[OverrideId]) -> Result<u64, StorageError> {
        let tx = self.conn.transaction()?;
        let mut deleted = 0u64;
        for override_id in override_ids {
            tx.execute(
                "DELETE FROM attachment_edit_history WHERE override_id = ?1",
                rusqlite::params![override_id.as_bytes().as_slice()],
            )?;
            deleted += tx.execute(
                "DELETE FROM attachment_overrides WHERE override_id = ?1",
                rusqlite::params![override_id.as_bytes().as_slice()],
            )? as u64;
        }
        tx.commit()?;
        Ok(deleted)
    }
}

/// Tunnel a StorageError through rusqlite's error type inside query_map closures.
fn tunnel(e: StorageError) -> rusqlite::Error {
    match e {
        StorageError::Sqlite(sq) => sq,
        other => rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Blob,
            Box::new(OpaqueStorageError(other.to_string())),
        ),
    }
}

#[derive(Debug)]
struct OpaqueStorageError(String);

impl std::fmt::Display for OpaqueStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for OpaqueStorageError {}
