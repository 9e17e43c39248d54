//! Where raw attachments come from. The provider owns this data; we only read it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use thiserror::Error;
use usher_core::{OpportunityId, RawAttachment};
use usher_storage::OpportunityRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("malformed provider payload for {opportunity}: {reason}")]
    MalformedPayload { opportunity: String, reason: String },

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Produces the ordered raw attachment list for one opportunity.
pub trait AttachmentSource: Send + Sync {
    fn attachments(
        &self,
        opportunity: &OpportunityRecord,
    ) -> Result<Vec<RawAttachment>, SourceError>;
}

/// Fixture-backed source. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    inner: Arc<RwLock<HashMap<OpportunityId, Vec<RawAttachment>>>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the attachment list reported for `opportunity_id`.
    pub fn set(&self, opportunity_id: impl Into<OpportunityId>, attachments: Vec<RawAttachment>) {
        let mut map = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.insert(opportunity_id.into(), attachments);
    }
}

impl AttachmentSource for InMemorySource {
    fn attachments(
        &self,
        opportunity: &OpportunityRecord,
    ) -> Result<Vec<RawAttachment>, SourceError> {
        let map = self
            .inner
            .read()
            .map_err(|_| SourceError::Unavailable("fixture lock poisoned".into()))?;
        Ok(map
            .get(&opportunity.opportunity_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct CachedPayload {
    #[serde(default)]
    attachments: Vec<RawAttachment>,
}

/// Reads the provider payload cached on the opportunity row
/// (`{"attachments": [...]}`). A missing payload means no attachments.
#[derive(Debug, Clone, Copy, Default)]
pub struct CachedPayloadSource;

impl AttachmentSource for CachedPayloadSource {
    fn attachments(
        &self,
        opportunity: &OpportunityRecord,
    ) -> Result<Vec<RawAttachment>, SourceError> {
        let Some(raw) = opportunity.raw_data.as_deref() else {
            return Ok(Vec::new());
        };
        let payload: CachedPayload =
            serde_json::from_str(raw).map_err(|e| SourceError::MalformedPayload {
                opportunity: opportunity.opportunity_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(payload.attachments)
    }
}
