//! Facade tying the evaluator and executor to one set of stores

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use handover_config::HandoverSettings;
use handover_core::{
    ConversationContext, CriteriaSource, HandoverCriteria, HandoverEvaluation, LeadStore,
    Notifier, Result,
};

use crate::evaluator::HandoverEvaluator;
use crate::executor::{ExecutorConfig, HandoverExecutor, HandoverReport};

/// Result of handling one conversation turn
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationOutcome {
    pub evaluation: HandoverEvaluation,
    /// Present only when a handover was attempted
    pub handed_over: Option<bool>,
    pub delivered: usize,
    pub failed: usize,
    pub lead_updated: bool,
}

impl ConversationOutcome {
    fn evaluated(evaluation: HandoverEvaluation) -> Self {
        Self {
            evaluation,
            handed_over: None,
            delivered: 0,
            failed: 0,
            lead_updated: false,
        }
    }

    fn executed(evaluation: HandoverEvaluation, report: &HandoverReport) -> Self {
        Self {
            evaluation,
            handed_over: Some(report.success()),
            delivered: report.delivered,
            failed: report.failed,
            lead_updated: report.lead_updated,
        }
    }
}

/// Entry point used by conversation handlers
pub struct HandoverService {
    evaluator: HandoverEvaluator,
    executor: HandoverExecutor,
}

impl HandoverService {
    pub fn new(evaluator: HandoverEvaluator, executor: HandoverExecutor) -> Self {
        Self { evaluator, executor }
    }

    /// Wire a service from settings and the stores it should use
    pub fn from_settings(
        settings: &HandoverSettings,
        leads: Arc<dyn LeadStore>,
        criteria_source: Arc<dyn CriteriaSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let default_criteria = settings.default_criteria.to_criteria()?;
        Ok(Self::with_criteria(
            default_criteria,
            ExecutorConfig::from_settings(settings),
            leads,
            criteria_source,
            notifier,
        ))
    }

    pub fn with_criteria(
        default_criteria: HandoverCriteria,
        config: ExecutorConfig,
        leads: Arc<dyn LeadStore>,
        criteria_source: Arc<dyn CriteriaSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let evaluator = HandoverEvaluator::new(criteria_source.clone())
            .with_default_criteria(default_criteria);
        let executor = HandoverExecutor::new(leads, criteria_source, notifier, config);
        Self::new(evaluator, executor)
    }

    /// Replace the fallback criteria, e.g. with a criteria file given on the command line
    pub fn with_default_criteria(mut self, criteria: HandoverCriteria) -> Self {
        self.evaluator = self.evaluator.with_default_criteria(criteria);
        self
    }

    pub async fn evaluate(
        &self,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<HandoverEvaluation> {
        self.evaluator.evaluate(context, campaign_id).await
    }

    pub async fn evaluate_at(
        &self,
        context: &ConversationContext,
        campaign_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<HandoverEvaluation> {
        self.evaluator.evaluate_at(context, campaign_id, now).await
    }

    pub async fn execute_handover(
        &self,
        lead_id: &str,
        evaluation: &HandoverEvaluation,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<bool> {
        self.executor
            .execute_handover(lead_id, evaluation, context, campaign_id)
            .await
    }

    pub async fn execute_handover_detailed(
        &self,
        lead_id: &str,
        evaluation: &HandoverEvaluation,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<HandoverReport> {
        self.executor
            .execute_handover_detailed(lead_id, evaluation, context, campaign_id)
            .await
    }

    pub async fn quick_handover(
        &self,
        lead_id: &str,
        reason: &str,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<bool> {
        self.executor
            .quick_handover(lead_id, reason, context, campaign_id)
            .await
    }

    /// Evaluate, then hand over only when the evaluation says so
    pub async fn process_conversation(
        &self,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<ConversationOutcome> {
        self.process_conversation_at(context, campaign_id, Utc::now())
            .await
    }

    pub async fn process_conversation_at(
        &self,
        context: &ConversationContext,
        campaign_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ConversationOutcome> {
        let evaluation = self.evaluator.evaluate_at(context, campaign_id, now).await?;
        if !evaluation.should_handover {
            return Ok(ConversationOutcome::evaluated(evaluation));
        }

        let report = self
            .executor
            .execute_at(&context.lead_id, &evaluation, context, campaign_id, now)
            .await?;
        Ok(ConversationOutcome::executed(evaluation, &report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::LoggingNotifier;
    use handover_core::{Channel, Message, TriggeredCriterion};
    use handover_persistence::{InMemoryCampaignStore, InMemoryLeadStore};

    fn service(settings: &HandoverSettings) -> Result<HandoverService> {
        HandoverService::from_settings(
            settings,
            Arc::new(InMemoryLeadStore::new()),
            Arc::new(InMemoryCampaignStore::new()),
            Arc::new(LoggingNotifier::new()),
        )
    }

    fn two_messages() -> ConversationContext {
        ConversationContext::new("lead-1", Channel::Chat)
            .with_messages([Message::agent("Hello there"), Message::lead("Hi")])
    }

    #[tokio::test]
    async fn test_from_settings_uses_configured_criteria() {
        let mut settings = HandoverSettings::default();
        settings.default_criteria.conversation_length = 2;

        let eval = service(&settings)
            .unwrap()
            .evaluate(&two_messages(), None)
            .await
            .unwrap();
        assert!(eval.should_handover);
        assert!(eval.has_triggered(TriggeredCriterion::ConversationLength));
    }

    #[tokio::test]
    async fn test_default_criteria_override() {
        let mut settings = HandoverSettings::default();
        settings.default_criteria.conversation_length = 2;

        let service = service(&settings).unwrap().with_default_criteria(HandoverCriteria {
            conversation_length: 50,
            ..HandoverCriteria::default()
        });
        let eval = service.evaluate(&two_messages(), None).await.unwrap();
        assert!(!eval.should_handover);
    }

    #[test]
    fn test_from_settings_rejects_invalid_criteria() {
        let mut settings = HandoverSettings::default();
        settings.default_criteria.qualification_score = -1.0;
        assert!(service(&settings).is_err());
    }
}
