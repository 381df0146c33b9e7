//! Handover evaluator
//!
//! Runs four independent checks over a conversation and combines them with a
//! logical OR:
//!
//! 1. qualification score reached the threshold
//! 2. message count reached the threshold
//! 3. a keyword trigger appears anywhere in the transcript (case-insensitive substring)
//! 4. the conversation has been running longer than the time threshold
//!
//! The reason string lists the fired checks in that order, joined with " and ".

use std::sync::Arc;

use chrono::{DateTime, Utc};

use handover_core::{
    ConversationContext, CriteriaSource, HandoverCriteria, HandoverEvaluation, QualificationScore,
    Result, TriggeredCriterion, UrgencyLevel,
};

use crate::metrics;

/// Normalized score at or above which urgency is high
pub const HIGH_URGENCY_SCORE: f64 = 0.8;
/// Normalized score at or above which urgency is at least medium
pub const MEDIUM_URGENCY_SCORE: f64 = 0.6;

const HANDOVER_ACTIONS: &[&str] = &[
    "Notify handover recipients with the conversation summary",
    "Assign the lead to a sales representative",
    "Update lead status to handover",
    "Schedule a follow-up within the urgency window",
];

const CONTINUE_ACTIONS: &[&str] = &[
    "Continue the automated conversation",
    "Monitor for qualification signals",
    "Re-evaluate after the next lead reply",
];

/// Decides whether a conversation should go to a human
pub struct HandoverEvaluator {
    criteria_source: Arc<dyn CriteriaSource>,
    default_criteria: HandoverCriteria,
}

impl HandoverEvaluator {
    pub fn new(criteria_source: Arc<dyn CriteriaSource>) -> Self {
        Self {
            criteria_source,
            default_criteria: HandoverCriteria::default(),
        }
    }

    /// Use different built-in criteria for campaigns without their own
    pub fn with_default_criteria(mut self, criteria: HandoverCriteria) -> Self {
        self.default_criteria = criteria;
        self
    }

    pub fn default_criteria(&self) -> &HandoverCriteria {
        &self.default_criteria
    }

    /// Criteria for a campaign, or the defaults when none are configured.
    ///
    /// Storage errors propagate; they do not fall back to the defaults.
    pub async fn resolve_criteria(&self, campaign_id: Option<&str>) -> Result<HandoverCriteria> {
        let Some(campaign_id) = campaign_id else {
            return Ok(self.default_criteria.clone());
        };

        match self.criteria_source.campaign_criteria(campaign_id).await? {
            Some(criteria) => {
                tracing::debug!(campaign_id = %campaign_id, "Using campaign handover criteria");
                Ok(criteria)
            },
            None => {
                tracing::debug!(campaign_id = %campaign_id, "No campaign criteria, using defaults");
                Ok(self.default_criteria.clone())
            },
        }
    }

    /// Evaluate a conversation against its campaign criteria
    pub async fn evaluate(
        &self,
        context: &ConversationContext,
        campaign_id: Option<&str>,
    ) -> Result<HandoverEvaluation> {
        self.evaluate_at(context, campaign_id, Utc::now()).await
    }

    /// Evaluate with an explicit clock
    pub async fn evaluate_at(
        &self,
        context: &ConversationContext,
        campaign_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<HandoverEvaluation> {
        let criteria = self.resolve_criteria(campaign_id).await?;
        let evaluation = evaluate_with_criteria(context, &criteria, now);

        metrics::record_evaluation(evaluation.should_handover);
        tracing::info!(
            lead_id = %context.lead_id,
            campaign_id = campaign_id.unwrap_or("-"),
            should_handover = evaluation.should_handover,
            urgency = %evaluation.urgency_level,
            triggered = ?evaluation.triggered_criteria,
            "Handover evaluated"
        );

        Ok(evaluation)
    }
}

/// Pure evaluation of one conversation against one criteria set
pub fn evaluate_with_criteria(
    context: &ConversationContext,
    criteria: &HandoverCriteria,
    now: DateTime<Utc>,
) -> HandoverEvaluation {
    let mut triggered = Vec::with_capacity(4);
    let mut reasons = Vec::with_capacity(4);

    if let Some(score) = context.qualification_score {
        let threshold = criteria.score_threshold();
        if score.meets(&threshold) {
            triggered.push(TriggeredCriterion::QualificationScore);
            reasons.push(format!(
                "Qualification score ({}) meets threshold ({})",
                score, threshold
            ));
        }
    }

    let message_count = context.message_count();
    if message_count >= criteria.conversation_length as usize {
        triggered.push(TriggeredCriterion::ConversationLength);
        reasons.push(format!(
            "Conversation length ({} messages) reached threshold ({})",
            message_count, criteria.conversation_length
        ));
    }

    let matched_keywords = match_keywords(context, &criteria.keyword_triggers);
    if !matched_keywords.is_empty() {
        triggered.push(TriggeredCriterion::Keywords);
        reasons.push(format!("Keywords detected: {}", matched_keywords.join(", ")));
    }

    if let Some(duration) = context.duration_at(now) {
        let elapsed = duration.num_seconds();
        if elapsed >= 0 && elapsed as u64 >= criteria.time_threshold {
            triggered.push(TriggeredCriterion::TimeThreshold);
            reasons.push(format!(
                "Conversation duration ({}s) exceeded threshold ({}s)",
                elapsed, criteria.time_threshold
            ));
        }
    }

    let should_handover = !triggered.is_empty();
    let urgency_level = if should_handover {
        derive_urgency(triggered.len(), context.qualification_score)
    } else {
        UrgencyLevel::Low
    };

    let reason = if should_handover {
        reasons.join(" and ")
    } else {
        "No handover criteria met".to_string()
    };

    HandoverEvaluation {
        should_handover,
        reason,
        score: context.qualification_score,
        triggered_criteria: triggered,
        matched_keywords,
        urgency_level,
        next_actions: next_actions(should_handover),
    }
}

/// Keyword triggers found in the lower-cased transcript, in criteria order
pub fn match_keywords(context: &ConversationContext, keywords: &[String]) -> Vec<String> {
    if keywords.is_empty() || context.message_count() == 0 {
        return Vec::new();
    }

    let transcript = context.lowercase_transcript();
    keywords
        .iter()
        .filter(|k| !k.is_empty() && transcript.contains(&k.to_lowercase()))
        .cloned()
        .collect()
}

/// Urgency from the number of fired checks and the score magnitude
pub fn derive_urgency(triggered_count: usize, score: Option<QualificationScore>) -> UrgencyLevel {
    let normalized = score.map(|s| s.normalized()).unwrap_or(0.0);

    if triggered_count >= 3 || normalized >= HIGH_URGENCY_SCORE {
        UrgencyLevel::High
    } else if triggered_count >= 2 || normalized >= MEDIUM_URGENCY_SCORE {
        UrgencyLevel::Medium
    } else {
        UrgencyLevel::Low
    }
}

/// Advisory follow-ups for humans; no behavioural effect
pub fn next_actions(should_handover: bool) -> Vec<String> {
    let actions = if should_handover {
        HANDOVER_ACTIONS
    } else {
        CONTINUE_ACTIONS
    };
    actions.iter().map(|a| a.to_string()).collect()
}
