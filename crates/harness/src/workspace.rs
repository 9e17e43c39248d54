use usher_core::{
    ActorProfile, AttachmentId, OpportunityId, RawAttachment, RichAttachment, UserId, time,
};
use usher_engine::{AttachmentEngine, EngineError, InMemorySource};
use usher_storage::{OpportunityRecord, SqliteStorage, StorageError};

/// An engine over in-memory storage with a fixture attachment source.
pub struct TestWorkspace {
    pub engine: AttachmentEngine,
    pub source: InMemorySource,
}

impl TestWorkspace {
    pub fn new() -> Result<Self, StorageError> {
        crate::init_tracing();
        let source = InMemorySource::new();
        Ok(Self {
            engine: AttachmentEngine::new(SqliteStorage::open_in_memory()?, source.clone()),
            source,
        })
    }

    /// Register an opportunity whose provider reports `attachments` as `(id, name)` pairs.
    pub fn add_opportunity(
        &mut self,
        opportunity_id: &str,
        attachments: &[(&str, &str)],
    ) -> Result<OpportunityId, Box<dyn std::error::Error>> {
        let mut record = OpportunityRecord::new(
            opportunity_id,
            format!("SOL-{opportunity_id}"),
            time::now_millis()?,
        );
        record.source_url = Some(format!("https://sam.gov/opp/{opportunity_id}/view"));
        record.description = Some(format!("Notice {opportunity_id}"));
        self.engine.register_opportunity(&record)?;
        self.set_attachments(opportunity_id, attachments);
        Ok(record.opportunity_id)
    }

    /// Replace what the provider reports for an opportunity.
    pub fn set_attachments(&self, opportunity_id: &str, attachments: &[(&str, &str)]) {
        let raw = attachments
            .iter()
            .map(|(id, name)| {
                RawAttachment::new(
                    *id,
                    *name,
                    format!("https://files.example/{opportunity_id}/{id}"),
                )
            })
            .collect();
        self.source.set(opportunity_id, raw);
    }

    pub fn add_user(
        &mut self,
        user_id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<UserId, EngineError> {
        let profile = ActorProfile {
            user_id: UserId::new(user_id),
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        };
        self.engine.register_user(&profile)?;
        Ok(profile.user_id)
    }

    pub fn rename(
        &mut self,
        opportunity_id: &OpportunityId,
        attachment_id: &str,
        proposed_name: &str,
    ) -> Result<RichAttachment, EngineError> {
        self.engine
            .rename(opportunity_id, &AttachmentId::new(attachment_id), proposed_name, None)
    }

    pub fn rename_as(
        &mut self,
        opportunity_id: &OpportunityId,
        attachment_id: &str,
        proposed_name: &str,
        user: &UserId,
    ) -> Result<RichAttachment, EngineError> {
        self.engine.rename(
            opportunity_id,
            &AttachmentId::new(attachment_id),
            proposed_name,
            Some(user),
        )
    }

    /// Current reconciled view of one attachment.
    pub fn attachment(
        &self,
        opportunity_id: &OpportunityId,
        attachment_id: &str,
    ) -> Result<Option<RichAttachment>, EngineError> {
        Ok(self
            .engine
            .reconcile(opportunity_id)?
            .into_iter()
            .find(|a| a.id.as_str() == attachment_id))
    }
}
