//! In-memory stores for development and tests

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use handover_core::{
    CriteriaSource, DeliveryChannel, DeliveryReceipt, Error, HandoverCriteria,
    HandoverNotification, HandoverUpdate, Lead, LeadStore, Notifier,
};

/// Lead store backed by a concurrent map. The version check and the write
/// happen under the same shard lock.
#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: DashMap<String, Lead>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, lead: Lead) {
        self.leads.insert(lead.id.clone(), lead);
    }

    /// Snapshot of a stored lead
    pub fn get(&self, lead_id: &str) -> Option<Lead> {
        self.leads.get(lead_id).map(|l| l.clone())
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn get_lead(&self, lead_id: &str) -> handover_core::Result<Option<Lead>> {
        Ok(self.get(lead_id))
    }

    async fn apply_handover(
        &self,
        lead_id: &str,
        expected_version: u64,
        update: &HandoverUpdate,
    ) -> handover_core::Result<u64> {
        let mut entry = self
            .leads
            .get_mut(lead_id)
            .ok_or_else(|| Error::lead_not_found(lead_id))?;

        if entry.version != expected_version {
            return Err(Error::VersionConflict {
                lead_id: lead_id.to_string(),
                expected: expected_version,
            });
        }

        entry.apply(update);
        Ok(entry.version)
    }
}

/// Campaign settings kept as raw JSON, parsed on lookup like the real store
#[derive(Default)]
pub struct InMemoryCampaignStore {
    settings: DashMap<String, Value>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, campaign_id: impl Into<String>, settings: Value) {
        self.settings.insert(campaign_id.into(), settings);
    }
}

#[async_trait]
impl CriteriaSource for InMemoryCampaignStore {
    async fn campaign_criteria(
        &self,
        campaign_id: &str,
    ) -> handover_core::Result<Option<HandoverCriteria>> {
        match self.settings.get(campaign_id) {
            Some(settings) => HandoverCriteria::from_campaign_settings(settings.value()),
            None => Ok(None),
        }
    }
}

/// Notifier that keeps every notification in memory
#[derive(Default)]
pub struct InMemoryNotifier {
    sent: Mutex<Vec<HandoverNotification>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<HandoverNotification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(
        &self,
        notification: &HandoverNotification,
    ) -> handover_core::Result<DeliveryReceipt> {
        self.sent.lock().push(notification.clone());
        Ok(DeliveryReceipt::new(
            &notification.recipient.email,
            DeliveryChannel::Email,
            true,
        ))
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
