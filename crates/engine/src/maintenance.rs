//! Out-of-band cleanup of overrides whose opportunity is gone.
//!
//! Never called from the request path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use usher_core::{OverrideId, time};
use usher_storage::{Storage, StorageError};

use crate::{AttachmentEngine, EngineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceMode {
    /// Count and report only.
    DryRun,
    /// Delete orphaned overrides and their history.
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub mode: MaintenanceMode,
    pub ran_at: DateTime<Utc>,
    pub opportunities_total: u64,
    /// Opportunities whose source reports at least one attachment.
    pub opportunities_with_attachments: u64,
    pub attachments_total: u64,
    pub overrides_total: u64,
    pub history_total: u64,
    pub orphaned_overrides: Vec<OverrideId>,
    /// Overrides whose working name equals the original name.
    pub no_op_overrides: u64,
    pub deleted_overrides: u64,
}

impl AttachmentEngine {
    pub fn run_maintenance(
        &mut self,
        mode: MaintenanceMode,
    ) -> Result<MaintenanceReport, EngineError> {
        let ran_at = time::now_millis().map_err(StorageError::from)?;

        let opportunities = self.storage.list_opportunities()?;
        let mut opportunities_with_attachments = 0u64;
        let mut attachments_total = 0u64;
        for opportunity in &opportunities {
            // An unreadable payload counts as no attachments; the audit carries on.
            let count = match self.source.attachments(opportunity) {
                Ok(raw) => raw.len() as u64,
                Err(e) => {
                    warn!(
                        opportunity = %opportunity.opportunity_id,
                        error = %e,
                        "attachments unreadable"
                    );
                    0
                }
            };
            if count > 0 {
                opportunities_with_attachments += 1;
                attachments_total += count;
            }
        }

        let orphans = self.storage.get_orphaned_overrides()?;
        for orphan in &orphans {
            warn!(
                override_id = %orphan.override_id,
                opportunity = %orphan.opportunity_id,
                "override references a missing opportunity"
            );
        }
        let orphaned_overrides: Vec<OverrideId> = orphans.iter().map(|o| o.override_id).collect();

        let mut report = MaintenanceReport {
            mode,
            ran_at,
            opportunities_total: opportunities.len() as u64,
            opportunities_with_attachments,
            attachments_total,
            overrides_total: self.storage.override_count()?,
            history_total: self.storage.history_count()?,
            no_op_overrides: self.storage.no_op_override_count()?,
            deleted_overrides: 0,
            orphaned_overrides,
        };

        if mode == MaintenanceMode::Apply && !report.orphaned_overrides.is_empty() {
            report.deleted_overrides = self.storage.delete_overrides(&report.orphaned_overrides)?;
        }

        info!(
            ?mode,
            ran_at = %report.ran_at,
            opportunities = report.opportunities_total,
            with_attachments = report.opportunities_with_attachments,
            attachments = report.attachments_total,
            overrides = report.overrides_total,
            history = report.history_total,
            orphaned = report.orphaned_overrides.len(),
            deleted = report.deleted_overrides,
            no_op = report.no_op_overrides,
            "attachment maintenance finished"
        );
        Ok(report)
    }
}
