//! Storage layer for lead handover
//!
//! Provides:
//! - ScyllaDB-backed leads with versioned handover updates
//! - Campaign settings lookup for handover criteria
//! - Simulated handover email delivery (persisted, not sent)
//! - In-memory equivalents for development and tests

pub mod campaigns;
pub mod client;
pub mod error;
pub mod leads;
pub mod memory;
pub mod notifications;
pub mod schema;

pub use campaigns::ScyllaCampaignStore;
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use leads::ScyllaLeadStore;
pub use memory::{InMemoryCampaignStore, InMemoryLeadStore, InMemoryNotifier};
pub use notifications::SimulatedEmailNotifier;

/// Connect to ScyllaDB, ensure the schema and build every store
pub async fn init(config: ScyllaConfig) -> Result<PersistenceLayer, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;

    Ok(PersistenceLayer {
        leads: ScyllaLeadStore::new(client.clone()),
        campaigns: ScyllaCampaignStore::new(client.clone()),
        notifications: SimulatedEmailNotifier::new(client),
    })
}

/// Combined persistence layer with all services
pub struct PersistenceLayer {
    pub leads: ScyllaLeadStore,
    pub campaigns: ScyllaCampaignStore,
    pub notifications: SimulatedEmailNotifier,
}
