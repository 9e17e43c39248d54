use thiserror::Error;
use usher_storage::StorageError;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name contains invalid characters (/ \\ : * ? \" < > |)")]
    InvalidCharacters,

    #[error("Opportunity not found")]
    OpportunityNotFound(String),

    #[error("Attachment not found")]
    AttachmentNotFound(String),

    /// `expected` is the original extension, or `None` when the original had none.
    #[error("{}", extension_message(.expected))]
    ExtensionChanged { expected: Option<String> },

    #[error("Name already in use by another attachment")]
    DuplicateName,

    #[error("attachment source error: {0}")]
    Source(#[from] SourceError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

fn extension_message(expected: &Option<String>) -> String {
    match expected {
        Some(ext) => format!("Extension must remain \"{ext}\""),
        None => "Cannot add an extension to a file that has none".to_string(),
    }
}

impl EngineError {
    /// HTTP-equivalent status for API layers.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyName
            | Self::InvalidCharacters
            | Self::ExtensionChanged { .. }
            | Self::DuplicateName => 400,
            Self::OpportunityNotFound(_) | Self::AttachmentNotFound(_) => 404,
            Self::Source(_) => 502,
            Self::Storage(_) => 500,
        }
    }

    pub fn is_caller_correctable(&self) -> bool {
        self.status_code() < 500
    }

    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::InvalidCharacters => "invalid_characters",
            Self::OpportunityNotFound(_) => "opportunity_not_found",
            Self::AttachmentNotFound(_) => "attachment_not_found",
            Self::ExtensionChanged { .. } => "extension_changed",
            Self::DuplicateName => "duplicate_name",
            Self::Source(_) => "source_failure",
            Self::Storage(_) => "persistence_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_messages_distinguish_cause() {
        let keep = EngineError::ExtensionChanged {
            expected: Some(".docx".into()),
        };
        assert_eq!(keep.to_string(), "Extension must remain \".docx\"");
        let none = EngineError::ExtensionChanged { expected: None };
        assert_eq!(
            none.to_string(),
            "Cannot add an extension to a file that has none"
        );
    }

    #[test]
    fn status_classes() {
        assert_eq!(EngineError::DuplicateName.status_code(), 400);
        assert_eq!(EngineError::AttachmentNotFound("a9".into()).status_code(), 404);
        let storage = EngineError::Storage(StorageError::NotFound("x".into()));
        assert_eq!(storage.status_code(), 500);
        assert!(!storage.is_caller_correctable());
        assert!(EngineError::EmptyName.is_caller_correctable());
    }
}
