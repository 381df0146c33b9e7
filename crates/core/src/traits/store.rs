//! Storage seams consumed by the handover engine
//!
//! The CRM owns leads and campaigns; these traits are the narrow slice the
//! handover subsystem reads and writes.

use async_trait::async_trait;

use crate::criteria::HandoverCriteria;
use crate::error::Result;
use crate::lead::{HandoverUpdate, Lead};

/// Lead lookup and versioned handover write
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Load a lead by id, `Ok(None)` when it does not exist
    async fn get_lead(&self, lead_id: &str) -> Result<Option<Lead>>;

    /// Apply `update` only if the stored version still equals `expected_version`.
    ///
    /// Returns the new version on success and [`crate::Error::VersionConflict`]
    /// when another writer got there first.
    async fn apply_handover(
        &self,
        lead_id: &str,
        expected_version: u64,
        update: &HandoverUpdate,
    ) -> Result<u64>;
}

/// Campaign criteria lookup
#[async_trait]
pub trait CriteriaSource: Send + Sync {
    /// Criteria configured for a campaign, `Ok(None)` when none are set.
    ///
    /// Storage failures propagate; they are never replaced by defaults.
    async fn campaign_criteria(&self, campaign_id: &str) -> Result<Option<HandoverCriteria>>;
}
