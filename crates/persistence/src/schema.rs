//! ScyllaDB schema creation
//!
//! Timestamps are stored as epoch milliseconds in BIGINT columns.

use crate::error::PersistenceError;
use scylla::Session;

pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    // Leads; `version` backs the conditional handover update
    let leads_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.leads (
            lead_id TEXT,
            campaign_id TEXT,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            phone TEXT,
            status TEXT,
            qualification_score DOUBLE,
            qualification_scale TEXT,
            metadata_json TEXT,
            version BIGINT,
            updated_at BIGINT,
            PRIMARY KEY (lead_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(leads_table, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create leads table: {}", e)))?;

    // Campaign settings blob (JSON), read for handover criteria
    let campaigns_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.campaigns (
            campaign_id TEXT,
            name TEXT,
            settings_json TEXT,
            updated_at BIGINT,
            PRIMARY KEY (campaign_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(campaigns_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create campaigns table: {}", e))
        })?;

    // Simulated handover emails (audit trail)
    let notifications_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.handover_notifications (
            lead_id TEXT,
            notification_id UUID,
            campaign_id TEXT,
            recipient_email TEXT,
            recipient_role TEXT,
            subject TEXT,
            body TEXT,
            urgency TEXT,
            created_at BIGINT,
            PRIMARY KEY ((lead_id), notification_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(notifications_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!(
                "Failed to create handover_notifications table: {}",
                e
            ))
        })?;

    tracing::info!("All tables created successfully");
    Ok(())
}
