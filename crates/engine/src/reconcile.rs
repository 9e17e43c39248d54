//! Merge of provider attachments with local overrides into the rich view.
//!
//! Everything here is a pure function over two snapshots: the raw list from
//! the source and the override rows for the same opportunity. Neither input
//! is modified. Overrides whose attachment is missing from the raw list are
//! ignored; maintenance tooling deals with them.

use std::collections::HashMap;

use usher_core::{AttachmentId, RawAttachment, RichAttachment, UserId};
use usher_storage::OverrideRecord;

/// Override rows of one opportunity, indexed by attachment id.
pub struct OverrideIndex<'a> {
    by_attachment: HashMap<&'a AttachmentId, &'a OverrideRecord>,
}

impl<'a> OverrideIndex<'a> {
    pub fn new(overrides: &'a [OverrideRecord]) -> Self {
        Self {
            by_attachment: overrides.iter().map(|o| (&o.attachment_id, o)).collect(),
        }
    }

    pub fn get(&self, attachment_id: &AttachmentId) -> Option<&'a OverrideRecord> {
        self.by_attachment.get(attachment_id).copied()
    }

    /// The name users currently see for `raw`.
    pub fn effective_name<'r>(&self, raw: &'r RawAttachment) -> &'r str
    where
        'a: 'r,
    {
        match self.get(&raw.id) {
            Some(o) => o.current_name.as_str(),
            None => raw.name.as_str(),
        }
    }
}

/// Build the rich view of a single attachment.
pub fn enrich(
    raw: &RawAttachment,
    record: Option<&OverrideRecord>,
    labels: &HashMap<UserId, String>,
) -> RichAttachment {
    match record {
        Some(o) => RichAttachment::edited(
            raw,
            &o.original_name,
            &o.current_name,
            o.edited_at,
            o.edited_by.as_ref().and_then(|u| labels.get(u).cloned()),
        ),
        None => RichAttachment::unedited(raw),
    }
}

/// One rich attachment per raw attachment, in source order.
pub fn reconcile(
    raw: &[RawAttachment],
    overrides: &[OverrideRecord],
    labels: &HashMap<UserId, String>,
) -> Vec<RichAttachment> {
    let index = OverrideIndex::new(overrides);
    raw.iter()
        .map(|att| enrich(att, index.get(&att.id), labels))
        .collect()
}
