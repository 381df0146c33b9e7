//! Campaign settings lookup for handover criteria

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use handover_core::{CriteriaSource, HandoverCriteria};

use crate::{PersistenceError, ScyllaClient};

/// ScyllaDB-backed campaign settings reader
#[derive(Clone)]
pub struct ScyllaCampaignStore {
    client: ScyllaClient,
}

impl ScyllaCampaignStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    /// Store a campaign's settings blob
    pub async fn save_settings(
        &self,
        campaign_id: &str,
        name: &str,
        settings: &Value,
    ) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {} (campaign_id, name, settings_json, updated_at)
             VALUES (?, ?, ?, ?)",
            self.client.table("campaigns")
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    campaign_id,
                    name,
                    serde_json::to_string(settings)?,
                    Utc::now().timestamp_millis(),
                ),
            )
            .await?;

        Ok(())
    }

    /// Raw settings blob, `None` when the campaign does not exist
    pub async fn settings(&self, campaign_id: &str) -> Result<Option<Value>, PersistenceError> {
        let query = format!(
            "SELECT settings_json FROM {} WHERE campaign_id = ?",
            self.client.table("campaigns")
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (campaign_id,))
            .await?;

        let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) else {
            return Ok(None);
        };

        let (settings_json,): (Option<String>,) = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        match settings_json {
            Some(json) if !json.is_empty() => Ok(Some(serde_json::from_str(&json)?)),
            _ => Ok(Some(Value::Object(Default::default()))),
        }
    }
}

#[async_trait]
impl CriteriaSource for ScyllaCampaignStore {
    async fn campaign_criteria(
        &self,
        campaign_id: &str,
    ) -> handover_core::Result<Option<HandoverCriteria>> {
        match self.settings(campaign_id).await? {
            Some(settings) => HandoverCriteria::from_campaign_settings(&settings),
            None => {
                tracing::warn!(campaign_id = %campaign_id, "Campaign not found, using default criteria");
                Ok(None)
            },
        }
    }
}
