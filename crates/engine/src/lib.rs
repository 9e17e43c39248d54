pub mod error;
pub mod maintenance;
pub mod reconcile;
pub mod rename;
pub mod source;

pub use error::EngineError;
pub use maintenance::{MaintenanceMode, MaintenanceReport};
pub use source::{AttachmentSource, CachedPayloadSource, InMemorySource, SourceError};

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;
use usher_core::{
    ActorProfile, AttachmentId, OpportunityId, RawAttachment, RichAttachment, UserId,
};
use usher_storage::{HistoryRecord, OpportunityRecord, OverrideRecord, SqliteStorage, Storage};

/// Response of the attachment list read: the reconciled attachments plus
/// pass-through metadata from the opportunity record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentListing {
    pub attachments: Vec<RichAttachment>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub description: String,
}

/// Both inputs of a reconciliation, read at one point in time.
pub(crate) struct Snapshot {
    pub opportunity: OpportunityRecord,
    pub raw: Vec<RawAttachment>,
    pub overrides: Vec<OverrideRecord>,
}

pub struct AttachmentEngine {
    storage: SqliteStorage,
    source: Box<dyn AttachmentSource>,
}

impl AttachmentEngine {
    pub fn new(storage: SqliteStorage, source: impl AttachmentSource + 'static) -> Self {
        Self {
            storage,
            source: Box::new(source),
        }
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut SqliteStorage {
        &mut self.storage
    }

    pub fn register_opportunity(&mut self, record: &OpportunityRecord) -> Result<(), EngineError> {
        Ok(self.storage.put_opportunity(record)?)
    }

    pub fn register_user(&mut self, profile: &ActorProfile) -> Result<(), EngineError> {
        Ok(self.storage.put_user(profile)?)
    }

    fn require_opportunity(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<OpportunityRecord, EngineError> {
        self.storage
            .get_opportunity(opportunity_id)?
            .ok_or_else(|| EngineError::OpportunityNotFound(opportunity_id.to_string()))
    }

    pub(crate) fn snapshot(&self, opportunity_id: &OpportunityId) -> Result<Snapshot, EngineError> {
        let opportunity = self.require_opportunity(opportunity_id)?;
        let raw = self.source.attachments(&opportunity)?;
        let overrides = self.storage.get_overrides_for_opportunity(opportunity_id)?;
        Ok(Snapshot {
            opportunity,
            raw,
            overrides,
        })
    }

    /// Display labels for every actor referenced by `overrides`.
    /// Unknown users and users without a name or email get no label.
    pub(crate) fn resolve_labels(
        &self,
        overrides: &[OverrideRecord],
    ) -> Result<HashMap<UserId, String>, EngineError> {
        let mut labels = HashMap::new();
        for user_id in overrides.iter().filter_map(|o| o.edited_by.as_ref()) {
            if labels.contains_key(user_id) {
                continue;
            }
            if let Some(label) = self
                .storage
                .get_user(user_id)?
                .and_then(|profile| profile.display_label())
            {
                labels.insert(user_id.clone(), label);
            }
        }
        Ok(labels)
    }

    /// Reconciled attachments of one opportunity, in provider order.
    pub fn reconcile(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<Vec<RichAttachment>, EngineError> {
        let snapshot = self.snapshot(opportunity_id)?;
        let labels = self.resolve_labels(&snapshot.overrides)?;
        let rich = reconcile::reconcile(&snapshot.raw, &snapshot.overrides, &labels);
        debug!(
            opportunity = %opportunity_id,
            attachments = rich.len(),
            overrides = snapshot.overrides.len(),
            "reconciled attachments"
        );
        Ok(rich)
    }

    pub fn list_attachments(
        &self,
        opportunity_id: &OpportunityId,
    ) -> Result<AttachmentListing, EngineError> {
        let snapshot = self.snapshot(opportunity_id)?;
        let labels = self.resolve_labels(&snapshot.overrides)?;
        let attachments = reconcile::reconcile(&snapshot.raw, &snapshot.overrides, &labels);
        Ok(AttachmentListing {
            total: attachments.len(),
            attachments,
            source_url: snapshot.opportunity.source_url,
            description: snapshot.opportunity.description.unwrap_or_default(),
        })
    }

    /// Rename history of one attachment, oldest first. Empty if never renamed.
    pub fn history(
        &self,
        opportunity_id: &OpportunityId,
        attachment_id: &AttachmentId,
    ) -> Result<Vec<HistoryRecord>, EngineError> {
        match self.storage.get_override(opportunity_id, attachment_id)? {
            Some(record) => Ok(self.storage.get_history(record.override_id)?),
            None => Ok(Vec::new()),
        }
    }
}
