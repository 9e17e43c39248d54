use chrono::{DateTime, Utc};
use usher_core::{ActorProfile, ids::*};

use crate::error::StorageError;

/// The parent record an attachment list hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityRecord {
    pub opportunity_id: OpportunityId,
    pub solicitation_number: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Deep link into the source system.
    pub source_url: Option<String>,
    /// Cached provider payload, JSON text.
    pub raw_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OpportunityRecord {
    pub fn new(
        opportunity_id: impl Into<OpportunityId>,
        solicitation_number: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            opportunity_id: opportunity_id.into(),
            solicitation_number: solicitation_number.into(),
            title: None,
            description: None,
            source_url: None,
            raw_data: None,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRecord {
    pub override_id: OverrideId,
    pub opportunity_id: OpportunityId,
    pub attachment_id: AttachmentId,
    /// Provider name captured on the first rename. Never rewritten.
    pub original_name: String,
    pub current_name: String,
    pub edited_by: Option<UserId>,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub history_id: HistoryId,
    /// Commit order across the whole table.
    pub seq: i64,
    pub override_id: OverrideId,
    pub previous_name: String,
    pub new_name: String,
    pub edited_by: Option<UserId>,
    pub edited_at: DateTime<Utc>,
}

/// A validated rename, ready to be written.
#[derive(Debug, Clone)]
pub struct RenameCommit {
    pub opportunity_id: OpportunityId,
    pub attachment_id: AttachmentId,
    /// Provider name. Only used when no override exists yet.
    pub original_name: String,
    pub new_name: String,
    pub edited_by: Option<UserId>,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CommittedRename {
    pub record: OverrideRecord,
    pub history: HistoryRecord,
    pub first_edit: bool,
}

pub trait Storage {
    fn put_opportunity(&mut self, record: &OpportunityRecord) -> Result<(), StorageError>;

    fn get_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Option<OpportunityRecord>, StorageError>;

    /// Removes the opportunity row only. Its overrides become orphans.
    fn delete_opportunity(&mut self, opportunity_id: &OpportunityId) -> Result<bool, StorageError>;

    fn opportunity_count(&self) -> Result<u64, StorageError>;

    /// Every opportunity, ordered by id.
    fn list_opportunities(&self) -> Result<Vec<OpportunityRecord>, StorageError>;

    fn put_user(&mut self, profile: &ActorProfile) -> Result<(), StorageError>;

    fn get_user(&self, user_id: &UserId) -> Result<Option<ActorProfile>, StorageError>;

    fn get_override(
        &self,
        opportunity_id: &OpportunityId,
        attachment_id: &AttachmentId,
    ) -> Result<Option<OverrideRecord>, StorageError>;

    fn get_overrides_for_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<OverrideRecord>, StorageError>;

    /// Upsert the override and append exactly one history row, atomically.
    ///
    /// The existing override is read under the write lock, so the history
    /// row's `previous_name` is the committed name at that instant.
    fn commit_rename(&mut self, rename: &RenameCommit) -> Result<CommittedRename, StorageError>;

    /// History rows for one override, oldest first.
    fn get_history(&self, override_id: OverrideId) -> Result<Vec<HistoryRecord>, StorageError>;

    fn override_count(&self) -> Result<u64, StorageError>;

    fn history_count(&self) -> Result<u64, StorageError>;

    /// Overrides with `current_name == original_name`.
    fn no_op_override_count(&self) -> Result<u64, StorageError>;

    /// Overrides whose opportunity no longer exists.
    fn get_orphaned_overrides(&self) -> Result<Vec<OverrideRecord>, StorageError>;

    /// Delete overrides together with their history in one transaction.
    fn delete_overrides(&mut self, override_ids: &[OverrideId]) -> Result<u64, StorageError>;
}
