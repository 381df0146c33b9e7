//! Lead persistence using ScyllaDB
//!
//! The handover write is a lightweight transaction guarded by `version`, so a
//! concurrent handover of the same lead cannot silently overwrite metadata.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::frame::response::result::CqlValue;
use serde_json::{Map, Value};

use handover_core::{HandoverUpdate, Lead, LeadStatus, LeadStore, QualificationScore, ScoreScale};

use crate::{PersistenceError, ScyllaClient};

type LeadRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<i64>,
);

/// ScyllaDB implementation of the lead store
#[derive(Clone)]
pub struct ScyllaLeadStore {
    client: ScyllaClient,
}

impl ScyllaLeadStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    /// Insert or replace a lead row (used when seeding from the CRM)
    pub async fn upsert(&self, lead: &Lead) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {} (
                lead_id, campaign_id, first_name, last_name, email, phone,
                status, qualification_score, qualification_scale, metadata_json,
                version, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.table("leads")
        );

        let metadata_json = serde_json::to_string(&lead.metadata)?;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &lead.id,
                    &lead.campaign_id,
                    &lead.first_name,
                    &lead.last_name,
                    &lead.email,
                    &lead.phone,
                    lead.status.as_str(),
                    lead.qualification_score.map(|s| s.value),
                    lead.qualification_score.map(|s| s.scale.as_str()),
                    metadata_json,
                    lead.version as i64,
                    lead.updated_at.timestamp_millis(),
                ),
            )
            .await?;

        tracing::debug!(lead_id = %lead.id, "Lead upserted");
        Ok(())
    }

    async fn fetch(&self, lead_id: &str) -> Result<Option<Lead>, PersistenceError> {
        let query = format!(
            "SELECT lead_id, campaign_id, first_name, last_name, email, phone,
                    status, qualification_score, qualification_scale, metadata_json,
                    version, updated_at
             FROM {} WHERE lead_id = ?",
            self.client.table("leads")
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (lead_id,))
            .await?;

        let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) else {
            return Ok(None);
        };

        let row: LeadRow = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        Ok(Some(lead_from_row(row)?))
    }

    async fn conditional_update(
        &self,
        lead: &Lead,
        expected_version: u64,
    ) -> Result<bool, PersistenceError> {
        let query = format!(
            "UPDATE {} SET status = ?, qualification_score = ?, qualification_scale = ?,
                    metadata_json = ?, version = ?, updated_at = ?
             WHERE lead_id = ? IF version = ?",
            self.client.table("leads")
        );

        let metadata_json = serde_json::to_string(&lead.metadata)?;

        let result = self
            .client
            .session()
            .query_unpaged(
                query,
                (
                    lead.status.as_str(),
                    lead.qualification_score.map(|s| s.value),
                    lead.qualification_score.map(|s| s.scale.as_str()),
                    metadata_json,
                    lead.version as i64,
                    lead.updated_at.timestamp_millis(),
                    &lead.id,
                    expected_version as i64,
                ),
            )
            .await?;

        // LWT responses lead with the `[applied]` column
        let applied = result
            .rows
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.columns.into_iter().next().flatten())
            .map(|value| matches!(value, CqlValue::Boolean(true)))
            .unwrap_or(false);

        Ok(applied)
    }
}

fn lead_from_row(row: LeadRow) -> Result<Lead, PersistenceError> {
    let (
        id,
        campaign_id,
        first_name,
        last_name,
        email,
        phone,
        status,
        qualification_score,
        qualification_scale,
        metadata_json,
        version,
        updated_at,
    ) = row;

    // Rows written before the scale column existed hold ten-point values
    let scale = match qualification_scale.as_deref() {
        None => ScoreScale::Ten,
        Some(name) => ScoreScale::parse(name).ok_or_else(|| {
            PersistenceError::InvalidData(format!("unknown score scale '{}'", name))
        })?,
    };

    let metadata: Map<String, Value> = match metadata_json {
        Some(json) if !json.is_empty() => serde_json::from_str(&json)?,
        _ => Map::new(),
    };

    Ok(Lead {
        id,
        campaign_id,
        first_name,
        last_name,
        email: email.unwrap_or_default(),
        phone,
        status: status
            .as_deref()
            .map(LeadStatus::from_str)
            .unwrap_or_default(),
        qualification_score: qualification_score.map(|value| QualificationScore::new(value, scale)),
        metadata,
        version: version.unwrap_or(0).max(0) as u64,
        updated_at: updated_at
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now),
    })
}

#[async_trait]
impl LeadStore for ScyllaLeadStore {
    async fn get_lead(&self, lead_id: &str) -> handover_core::Result<Option<Lead>> {
        Ok(self.fetch(lead_id).await?)
    }

    async fn apply_handover(
        &self,
        lead_id: &str,
        expected_version: u64,
        update: &HandoverUpdate,
    ) -> handover_core::Result<u64> {
        let mut lead = self
            .fetch(lead_id)
            .await?
            .ok_or_else(|| handover_core::Error::lead_not_found(lead_id))?;

        if lead.version != expected_version {
            return Err(PersistenceError::VersionConflict {
                id: lead_id.to_string(),
                expected: expected_version,
            }
            .into());
        }

        lead.apply(update);

        if !self.conditional_update(&lead, expected_version).await? {
            tracing::warn!(
                lead_id = %lead_id,
                expected_version,
                "Conditional lead update not applied"
            );
            return Err(PersistenceError::VersionConflict {
                id: lead_id.to_string(),
                expected: expected_version,
            }
            .into());
        }

        tracing::info!(
            lead_id = %lead_id,
            version = lead.version,
            "Lead marked for handover in ScyllaDB"
        );

        Ok(lead.version)
    }
}
