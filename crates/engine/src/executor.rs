//! Handover executor
//!
//! Turns a positive evaluation into notifications and a lead update:
//!
//! 1. look up the lead (missing lead fails before anything is sent)
//! 2. resolve recipients from the campaign, or the configured default
//! 3. build summary, key points and recommendations
//! 4. notify every recipient concurrently and count successes
//! 5. when at least one delivery succeeded, apply the versioned lead update

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;

use handover_config::HandoverSettings;
use handover_core::{
    ConversationContext, CriteriaSource, DeliveryReceipt, Error, HandoverEvaluation,
    HandoverNotification, HandoverRecipient, HandoverUpdate, Lead, LeadStore, Notifier, Result,
    UrgencyLevel,
};

use crate::evaluator::next_actions;
use crate::metrics;
use crate::summary::{extract_key_points, generate_recommendations, generate_summary};

/// Executor tuning, usually taken from [`HandoverSettings`]
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub default_recipient: HandoverRecipient,
    pub notification_timeout: Duration,
    pub max_update_attempts: u32,
}

impl ExecutorConfig {
    pub fn from_settings(settings: &HandoverSettings) -> Self {
        Self {
            default_recipient: settings.default_recipient.clone(),
            notification_timeout: Duration::from_secs(settings.notification_timeout_secs),
            max_update_attempts: settings.max_update_attempts,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_settings(&HandoverSettings::default())
    }
}

/// What happened during one handover
#[derive(Debug, Clone)]
pub struct HandoverReport {
    pub lead_id: String,
    pub recipients: Vec<HandoverRecipient>,
    pub delivered: usize,
    pub failed: usize,
    pub receipts: Vec<DeliveryReceipt>,
    pub lead_updated: bool,
    /// Lead version after the update, when one was written
    pub lead_version: Option<u64>,
}

impl HandoverReport {
    /// True when at least one recipient was reached
    pub fn success(&self) -> bool {
        self.delivered > 0
    }
}

pub struct HandoverExecutor {
    leads: Arc<dyn LeadStore>,
    criteria_source: Arc<dyn CriteriaSource>,
    notifier: Arc<dyn Notifier>,
    config: ExecutorConfig,
}

impl HandoverExecutor {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        criteria_source: Arc<dyn CriteriaSource>,
        notifier: Arc<dyn Notifier>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            leads,
            criteria_source,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Perform the handover; `Ok(false)` when no recipient could be reached
    pub async fn execute_handover(
        &self,
        lead_id: &str,
        evaluation: &HandoverEvaluation,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<bool> {
        let report = self
            .execute_handover_detailed(lead_id, evaluation, context, campaign_id)
            .await?;
        Ok(report.success())
    }

    pub async fn execute_handover_detailed(
        &self,
        lead_id: &str,
        evaluation: &HandoverEvaluation,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<HandoverReport> {
        self.execute_at(lead_id, evaluation, context, campaign_id, Utc::now())
            .await
    }

    /// Manual escalation: no evaluation, caller-supplied reason, high urgency
    pub async fn quick_handover(
        &self,
        lead_id: &str,
        reason: &str,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<bool> {
        let evaluation = quick_evaluation(reason, context);
        tracing::info!(lead_id = %lead_id, reason = %reason, "Quick handover requested");
        self.execute_handover(lead_id, &evaluation, context, campaign_id)
            .await
    }

    /// Full handover with an explicit clock
    pub async fn execute_at(
        &self,
        lead_id: &str,
        evaluation: &HandoverEvaluation,
        context: &ConversationContext,
        campaign_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<HandoverReport> {
        let lead = self
            .leads
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| Error::lead_not_found(lead_id))?;

        let campaign_id = campaign_id.or(lead.campaign_id.as_deref());
        let recipients = self.resolve_recipients(campaign_id).await?;

        let notifications =
            build_notifications(&lead, evaluation, context, campaign_id, &recipients, now);
        let receipts = self.dispatch(&notifications).await;

        let delivered = receipts.len();
        let failed = recipients.len() - delivered;
        let mut report = HandoverReport {
            lead_id: lead.id.clone(),
            recipients,
            delivered,
            failed,
            receipts,
            lead_updated: false,
            lead_version: None,
        };

        if delivered == 0 {
            metrics::record_execution("undelivered");
            tracing::error!(
                lead_id = %lead.id,
                recipients = report.recipients.len(),
                "Handover failed: no recipient could be notified"
            );
            return Ok(report);
        }

        let update = HandoverUpdate {
            qualification_score: evaluation.score.or(context.qualification_score),
            handover_time: now,
            reason: evaluation.reason.clone(),
            urgency: evaluation.urgency_level,
            recipients: report.recipients.clone(),
        };

        let version = self.update_lead(&lead, &update).await?;
        report.lead_updated = true;
        report.lead_version = Some(version);

        metrics::record_execution(if failed == 0 { "delivered" } else { "partial" });
        tracing::info!(
            lead_id = %lead.id,
            delivered = delivered,
            failed = failed,
            urgency = %evaluation.urgency_level,
            version = version,
            "Lead handed over"
        );

        Ok(report)
    }

    /// Campaign recipients when configured and non-empty, else the default
    async fn resolve_recipients(&self, campaign_id: Option<&str>) -> Result<Vec<HandoverRecipient>> {
        if let Some(campaign_id) = campaign_id {
            if let Some(criteria) = self.criteria_source.campaign_criteria(campaign_id).await? {
                if !criteria.handover_recipients.is_empty() {
                    return Ok(criteria.handover_recipients);
                }
            }
        }
        Ok(vec![self.config.default_recipient.clone()])
    }

    /// Send all notifications concurrently; returns receipts of the ones that landed
    async fn dispatch(&self, notifications: &[HandoverNotification]) -> Vec<DeliveryReceipt> {
        let timeout = self.config.notification_timeout;
        let notifier = self.notifier.as_ref();

        let sends = notifications.iter().map(|notification| async move {
            let email = &notification.recipient.email;
            match tokio::time::timeout(timeout, notifier.notify(notification)).await {
                Ok(Ok(receipt)) => {
                    metrics::record_notification("delivered");
                    Some(receipt)
                },
                Ok(Err(e)) => {
                    metrics::record_notification("failed");
                    tracing::warn!(
                        recipient = %email,
                        notifier = notifier.name(),
                        error = %e,
                        "Handover notification failed"
                    );
                    None
                },
                Err(_) => {
                    metrics::record_notification("timeout");
                    tracing::warn!(
                        recipient = %email,
                        notifier = notifier.name(),
                        timeout_secs = timeout.as_secs(),
                        "Handover notification timed out"
                    );
                    None
                },
            }
        });

        join_all(sends).await.into_iter().flatten().collect()
    }

    /// Versioned update, re-reading the lead after each lost race
    async fn update_lead(&self, lead: &Lead, update: &HandoverUpdate) -> Result<u64> {
        let max_attempts = self.config.max_update_attempts.max(1);
        let mut expected = lead.version;
        let mut attempt = 1;

        loop {
            match self.leads.apply_handover(&lead.id, expected, update).await {
                Ok(version) => return Ok(version),
                Err(e) if e.is_conflict() => {
                    metrics::record_update_conflict();
                    if attempt >= max_attempts {
                        tracing::error!(
                            lead_id = %lead.id,
                            attempts = attempt,
                            "Giving up on lead update after repeated conflicts"
                        );
                        return Err(e);
                    }
                    tracing::warn!(
                        lead_id = %lead.id,
                        expected_version = expected,
                        attempt = attempt,
                        "Lead changed during handover, retrying update"
                    );
                    let current = self
                        .leads
                        .get_lead(&lead.id)
                        .await?
                        .ok_or_else(|| Error::lead_not_found(&lead.id))?;
                    expected = current.version;
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

/// Evaluation record used by the quick path
pub fn quick_evaluation(reason: &str, context: &ConversationContext) -> HandoverEvaluation {
    HandoverEvaluation {
        should_handover: true,
        reason: reason.to_string(),
        score: context.qualification_score,
        triggered_criteria: Vec::new(),
        matched_keywords: Vec::new(),
        urgency_level: UrgencyLevel::High,
        next_actions: next_actions(true),
    }
}

/// One notification per recipient, sharing summary, key points and recommendations
pub fn build_notifications(
    lead: &Lead,
    evaluation: &HandoverEvaluation,
    context: &ConversationContext,
    campaign_id: Option<&str>,
    recipients: &[HandoverRecipient],
    now: DateTime<Utc>,
) -> Vec<HandoverNotification> {
    let score = evaluation.score.or(context.qualification_score);
    let summary = generate_summary(context, now);
    let key_points = extract_key_points(context);
    let recommendations =
        generate_recommendations(score, context.channel, evaluation.urgency_level, lead);

    recipients
        .iter()
        .map(|recipient| HandoverNotification {
            recipient: recipient.clone(),
            lead_id: lead.id.clone(),
            campaign_id: campaign_id.map(str::to_string),
            lead_name: lead.display_name(),
            lead_email: lead.email.clone(),
            lead_phone: lead.phone.clone(),
            conversation_summary: summary.clone(),
            qualification_score: score,
            key_points: key_points.clone(),
            recommendations: recommendations.clone(),
            urgency_level: evaluation.urgency_level,
            reason: evaluation.reason.clone(),
        })
        .collect()
}
