//! ScyllaDB session shared by the lead, campaign and notification stores

use std::sync::Arc;
use std::time::Duration;

use scylla::{Session, SessionBuilder};

use crate::error::PersistenceError;
use crate::schema;

const DEFAULT_KEYSPACE: &str = "lead_handover";

#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub replication_factor: u8,
    /// Per-node connection setup limit
    pub connect_timeout: Duration,
}

impl ScyllaConfig {
    pub fn new(hosts: Vec<String>, keyspace: impl Into<String>, replication_factor: u8) -> Self {
        Self {
            hosts,
            keyspace: keyspace.into(),
            replication_factor,
            ..Self::default()
        }
    }
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1:9042".to_string()],
            keyspace: DEFAULT_KEYSPACE.to_string(),
            replication_factor: 1,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Cheap to clone; all clones share one session
#[derive(Clone)]
pub struct ScyllaClient {
    session: Arc<Session>,
    config: ScyllaConfig,
}

impl ScyllaClient {
    pub async fn connect(config: ScyllaConfig) -> Result<Self, PersistenceError> {
        if config.hosts.is_empty() {
            return Err(PersistenceError::SchemaError(
                "no ScyllaDB hosts configured".to_string(),
            ));
        }
        tracing::info!(hosts = ?config.hosts, keyspace = %config.keyspace, "Connecting to ScyllaDB");

        let session = SessionBuilder::new()
            .known_nodes(&config.hosts)
            .connection_timeout(config.connect_timeout)
            .build()
            .await?;

        Ok(Self {
            session: Arc::new(session),
            config,
        })
    }

    /// Create the keyspace and handover tables when missing
    pub async fn ensure_schema(&self) -> Result<(), PersistenceError> {
        schema::create_keyspace(
            &self.session,
            &self.config.keyspace,
            self.config.replication_factor,
        )
        .await?;
        schema::create_tables(&self.session, &self.config.keyspace).await?;
        tracing::info!(keyspace = %self.config.keyspace, "Handover schema ready");
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn keyspace(&self) -> &str {
        &self.config.keyspace
    }

    /// Keyspace-qualified table name for query text
    pub fn table(&self, name: &str) -> String {
        format!("{}.{}", self.config.keyspace, name)
    }
}
