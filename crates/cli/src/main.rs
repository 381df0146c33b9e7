//! Lead handover command line
//!
//! Evaluates a conversation transcript and, on request, performs the handover
//! against the configured stores.
//!
//! # Usage
//!
//! ```bash
//! # Decide only
//! handover evaluate --conversation convo.json --campaign spring-promo
//!
//! # Decide and hand over when needed (in-memory stores need the lead record)
//! handover process --conversation convo.json --lead lead.json
//!
//! # Manual escalation
//! handover quick --conversation convo.json --lead lead.json --reason "Asked for the owner"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use handover_config::{load_criteria_file, load_settings, Settings};
use handover_core::{ConversationContext, CriteriaSource, Lead, LeadStore, Notifier};
use handover_engine::{HandoverService, LoggingNotifier, WebhookNotifier};
use handover_persistence::{InMemoryCampaignStore, InMemoryLeadStore, ScyllaConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config environment to load on top of config/default.yaml (overrides HANDOVER_ENV)
    #[arg(long)]
    env: Option<String>,

    /// YAML file with handover criteria replacing the configured defaults
    #[arg(long)]
    criteria: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a conversation and print the decision
    Evaluate {
        #[command(flatten)]
        input: Input,
    },
    /// Evaluate, then hand over when the evaluation says so
    Process {
        #[command(flatten)]
        input: Input,
    },
    /// Hand over immediately with a manual reason
    Quick {
        #[command(flatten)]
        input: Input,

        #[arg(long)]
        reason: String,
    },
}

#[derive(clap::Args, Debug)]
struct Input {
    /// Conversation context as JSON
    #[arg(long)]
    conversation: PathBuf,

    #[arg(long)]
    campaign: Option<String>,

    /// Lead record as JSON, stored before running
    #[arg(long)]
    lead: Option<PathBuf>,

    /// Campaign settings blob as JSON, stored under `--campaign` before running
    #[arg(long)]
    campaign_settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env = args.env.clone().or_else(|| std::env::var("HANDOVER_ENV").ok());
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&settings);
    tracing::debug!(
        environment = ?settings.environment,
        config_env = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let input = match &args.command {
        Command::Evaluate { input } | Command::Process { input } | Command::Quick { input, .. } => {
            input
        },
    };

    let context: ConversationContext = read_json(&input.conversation)?;
    let service = build_service(&settings, args.criteria.as_deref(), input).await?;
    let campaign = input.campaign.as_deref();

    let output = match &args.command {
        Command::Evaluate { .. } => {
            serde_json::to_value(service.evaluate(&context, campaign).await?)?
        },
        Command::Process { .. } => {
            serde_json::to_value(service.process_conversation(&context, campaign).await?)?
        },
        Command::Quick { reason, .. } => {
            let handed_over = service
                .quick_handover(&context.lead_id, reason, &context, campaign)
                .await?;
            json!({ "leadId": context.lead_id, "handedOver": handed_over })
        },
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("handover={}", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    subscriber.with(fmt_layer).init();
}

async fn build_service(
    settings: &Settings,
    criteria_path: Option<&Path>,
    input: &Input,
) -> Result<HandoverService> {
    let lead = input
        .lead
        .as_deref()
        .map(read_json::<Lead>)
        .transpose()?;
    let campaign_settings = input
        .campaign_settings
        .as_deref()
        .map(read_json::<Value>)
        .transpose()?;
    if campaign_settings.is_some() && input.campaign.is_none() {
        bail!("--campaign-settings needs --campaign");
    }

    let (leads, campaigns, stored_notifier): (
        Arc<dyn LeadStore>,
        Arc<dyn CriteriaSource>,
        Option<Arc<dyn Notifier>>,
    ) = if settings.persistence.enabled {
        let scylla_config = ScyllaConfig::new(
            settings.persistence.scylla_hosts.clone(),
            settings.persistence.keyspace.clone(),
            settings.persistence.replication_factor,
        );
        let persistence = handover_persistence::init(scylla_config)
            .await
            .context("initializing ScyllaDB persistence")?;
        tracing::info!(
            hosts = ?settings.persistence.scylla_hosts,
            keyspace = %settings.persistence.keyspace,
            "ScyllaDB persistence initialized"
        );

        if let Some(lead) = &lead {
            persistence.leads.upsert(lead).await?;
        }
        if let (Some(campaign_id), Some(blob)) = (&input.campaign, &campaign_settings) {
            persistence
                .campaigns
                .save_settings(campaign_id, campaign_id, blob)
                .await?;
        }

        let leads: Arc<dyn LeadStore> = Arc::new(persistence.leads);
        let campaigns: Arc<dyn CriteriaSource> = Arc::new(persistence.campaigns);
        let notifier: Arc<dyn Notifier> = Arc::new(persistence.notifications);
        (leads, campaigns, Some(notifier))
    } else {
        tracing::info!("Persistence disabled, using in-memory stores");
        let leads = InMemoryLeadStore::new();
        if let Some(lead) = lead {
            leads.insert(lead);
        }
        let campaigns = InMemoryCampaignStore::new();
        if let (Some(campaign_id), Some(blob)) = (&input.campaign, campaign_settings) {
            campaigns.insert(campaign_id.clone(), blob);
        }
        let leads: Arc<dyn LeadStore> = Arc::new(leads);
        let campaigns: Arc<dyn CriteriaSource> = Arc::new(campaigns);
        (leads, campaigns, None)
    };

    let notifier: Arc<dyn Notifier> = match &settings.notifications.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            settings.notifications.webhook_token.clone(),
            Duration::from_secs(settings.handover.notification_timeout_secs),
        )?),
        None => match stored_notifier {
            Some(stored) => stored,
            None => Arc::new(LoggingNotifier::new()),
        },
    };
    tracing::info!(notifier = notifier.name(), "Notification transport selected");

    let service = HandoverService::from_settings(&settings.handover, leads, campaigns, notifier)
        .context("invalid handover.default_criteria")?;
    match criteria_path {
        Some(path) => {
            let criteria = load_criteria_file(path)
                .with_context(|| format!("loading criteria from {}", path.display()))?;
            Ok(service.with_default_criteria(criteria))
        },
        None => Ok(service),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
