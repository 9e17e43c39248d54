use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// A user who can be recorded as the actor of a rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub user_id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl ActorProfile {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            name: None,
            email: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Human-readable label: display name, then contact address, then nothing.
    /// Blank values count as absent.
    pub fn display_label(&self) -> Option<String> {
        [self.name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_name() {
        let actor = ActorProfile::new("u1").with_name("Dana").with_email("dana@example.gov");
        assert_eq!(actor.display_label().as_deref(), Some("Dana"));
    }

    #[test]
    fn label_falls_back_to_email() {
        let actor = ActorProfile::new("u1").with_name("  ").with_email("dana@example.gov");
        assert_eq!(actor.display_label().as_deref(), Some("dana@example.gov"));
    }

    #[test]
    fn label_absent_without_contact_details() {
        assert_eq!(ActorProfile::new("u1").display_label(), None);
    }
}
