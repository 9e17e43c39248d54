use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AttachmentId;

/// An attachment as the external provider reports it. Never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttachment {
    pub id: AttachmentId,
    pub name: String,
    pub url: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
}

impl RawAttachment {
    pub fn new(
        id: impl Into<AttachmentId>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            content_type: None,
            size: None,
            posted_date: None,
        }
    }
}

/// Reconciled view of one attachment: provider data plus the local working name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichAttachment {
    pub id: AttachmentId,
    pub original_name: String,
    pub current_name: String,
    pub is_edited: bool,
    pub url: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_by: Option<String>,
}

impl RichAttachment {
    /// View of an attachment nobody has renamed.
    pub fn unedited(raw: &RawAttachment) -> Self {
        Self {
            id: raw.id.clone(),
            original_name: raw.name.clone(),
            current_name: raw.name.clone(),
            is_edited: false,
            url: raw.url.clone(),
            content_type: raw.content_type.clone(),
            size: raw.size,
            posted_date: raw.posted_date.clone(),
            edited_at: None,
            edited_by: None,
        }
    }

    /// View of a renamed attachment. `is_edited` is derived, never stored.
    pub fn edited(
        raw: &RawAttachment,
        original_name: &str,
        current_name: &str,
        edited_at: DateTime<Utc>,
        edited_by: Option<String>,
    ) -> Self {
        Self {
            original_name: original_name.to_string(),
            current_name: current_name.to_string(),
            is_edited: current_name != original_name,
            edited_at: Some(edited_at),
            edited_by,
            ..Self::unedited(raw)
        }
    }
}
