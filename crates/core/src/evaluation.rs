//! Handover decision record

use serde::{Deserialize, Serialize};

use crate::score::QualificationScore;

/// One of the independent checks that can request a handover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredCriterion {
    QualificationScore,
    ConversationLength,
    Keywords,
    TimeThreshold,
}

impl TriggeredCriterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggeredCriterion::QualificationScore => "qualification_score",
            TriggeredCriterion::ConversationLength => "conversation_length",
            TriggeredCriterion::Keywords => "keywords",
            TriggeredCriterion::TimeThreshold => "time_threshold",
        }
    }
}

impl std::fmt::Display for TriggeredCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse triage signal for the humans receiving the handover
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
        }
    }
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of a handover evaluation. Never persisted on its own; only its
/// effects on the lead are.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoverEvaluation {
    pub should_handover: bool,
    pub reason: String,
    /// Input score, carried through unchanged
    pub score: Option<QualificationScore>,
    /// Fired checks, in evaluation order
    pub triggered_criteria: Vec<TriggeredCriterion>,
    /// Keyword phrases that matched, in criteria order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
    pub urgency_level: UrgencyLevel,
    pub next_actions: Vec<String>,
}

impl HandoverEvaluation {
    pub fn has_triggered(&self, criterion: TriggeredCriterion) -> bool {
        self.triggered_criteria.contains(&criterion)
    }
}
