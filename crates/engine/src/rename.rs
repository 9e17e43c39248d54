//! Rename validation and the atomic apply step.

use tracing::{debug, info, instrument};
use usher_core::{
    AttachmentId, OpportunityId, RawAttachment, RichAttachment, UserId, naming, time,
};
use usher_storage::{OverrideRecord, RenameCommit, Storage};

use crate::reconcile::{OverrideIndex, enrich};
use crate::{AttachmentEngine, EngineError};

/// A rename that passed every check and may be written.
#[derive(Debug)]
pub struct ValidatedRename<'r> {
    pub raw: &'r RawAttachment,
    /// Trimmed proposed name.
    pub new_name: String,
}

/// Checks that need nothing but the proposed name.
pub fn check_name_shape(proposed: &str) -> Result<&str, EngineError> {
    let trimmed = proposed.trim();
    if trimmed.is_empty() {
        return Err(EngineError::EmptyName);
    }
    if naming::contains_invalid_chars(trimmed) {
        return Err(EngineError::InvalidCharacters);
    }
    Ok(trimmed)
}

/// Full validation against a point-in-time snapshot of the opportunity.
///
/// Fails fast in this order: empty name, invalid characters, unknown
/// attachment, extension change, duplicate name.
pub fn validate_rename<'r>(
    raw: &'r [RawAttachment],
    overrides: &[OverrideRecord],
    attachment_id: &AttachmentId,
    proposed: &str,
) -> Result<ValidatedRename<'r>, EngineError> {
    let name = check_name_shape(proposed)?;

    let target = raw
        .iter()
        .find(|a| &a.id == attachment_id)
        .ok_or_else(|| EngineError::AttachmentNotFound(attachment_id.to_string()))?;

    // Always against the provider name, never the current working name.
    if !naming::same_extension(&target.name, name) {
        return Err(EngineError::ExtensionChanged {
            expected: naming::extension(&target.name).map(str::to_string),
        });
    }

    let index = OverrideIndex::new(overrides);
    let key = naming::collision_key(name);
    let collides = raw
        .iter()
        .filter(|a| &a.id != attachment_id)
        .any(|a| naming::collision_key(index.effective_name(a)) == key);
    if collides {
        return Err(EngineError::DuplicateName);
    }

    Ok(ValidatedRename {
        raw: target,
        new_name: name.to_string(),
    })
}

impl AttachmentEngine {
    /// Rename an attachment's working name.
    ///
    /// Nothing is written unless every check passes. On success exactly one
    /// override write and one history append land in a single transaction.
    #[instrument(skip_all, fields(opportunity = %opportunity_id, attachment = %attachment_id))]
    pub fn rename(
        &mut self,
        opportunity_id: &OpportunityId,
        attachment_id: &AttachmentId,
        proposed_name: &str,
        acting_user: Option<&UserId>,
    ) -> Result<RichAttachment, EngineError> {
        // Shape checks first so a bad name never costs a provider fetch.
        let result = check_name_shape(proposed_name).and_then(|_| {
            let snapshot = self.snapshot(opportunity_id)?;
            let validated = validate_rename(
                &snapshot.raw,
                &snapshot.overrides,
                attachment_id,
                proposed_name,
            )?;
            let raw = validated.raw.clone();
            let commit = RenameCommit {
                opportunity_id: opportunity_id.clone(),
                attachment_id: attachment_id.clone(),
                original_name: raw.name.clone(),
                new_name: validated.new_name,
                edited_by: acting_user.cloned(),
                edited_at: time::now_millis().map_err(usher_storage::StorageError::from)?,
            };
            Ok((raw, commit))
        });

        let (raw, commit) = match result {
            Ok(ok) => ok,
            Err(e) => {
                debug!(kind = e.kind(), "rename rejected");
                return Err(e);
            }
        };

        let committed = self.storage.commit_rename(&commit)?;
        info!(
            history_seq = committed.history.seq,
            first_edit = committed.first_edit,
            "attachment renamed"
        );

        let labels = self.resolve_labels(std::slice::from_ref(&committed.record))?;
        Ok(enrich(&raw, Some(&committed.record), &labels))
    }
}
