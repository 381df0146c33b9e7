//! Handover criteria: thresholds, keyword triggers and recipients
//!
//! Criteria live in a campaign's settings blob under `handoverCriteria`.
//! Missing fields fall back to the built-in defaults one by one; fields that
//! are present but malformed (wrong type, negative threshold, recipient
//! without an address) are rejected with [`Error::InvalidCriteria`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::score::{QualificationScore, ScoreScale};

/// Key under which campaign settings store the criteria object
pub const CAMPAIGN_CRITERIA_KEY: &str = "handoverCriteria";

/// Built-in keyword phrases that request a human
pub const DEFAULT_KEYWORD_TRIGGERS: &[&str] = &[
    "speak to human",
    "speak to someone",
    "talk to a person",
    "real person",
    "human agent",
    "manager",
    "urgent",
    "asap",
    "price",
    "pricing",
    "how much",
    "ready to buy",
    "sign up",
    "schedule a call",
];

pub const DEFAULT_QUALIFICATION_SCORE: f64 = 7.0;
pub const DEFAULT_CONVERSATION_LENGTH: u32 = 10;
pub const DEFAULT_TIME_THRESHOLD_SECS: u64 = 1800;

/// Person notified when a conversation is handed over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverRecipient {
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default = "default_recipient_role")]
    pub role: String,
}

fn default_recipient_role() -> String {
    "sales".to_string()
}

impl HandoverRecipient {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role: role.into(),
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::invalid_criteria(
                format!("handoverRecipients[{}].email", index),
                format!("'{}' is not an email address", self.email),
            ));
        }
        Ok(())
    }
}

/// Thresholds and triggers for one campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandoverCriteria {
    /// Minimum qualification score, on `score_scale`
    pub qualification_score: f64,
    pub score_scale: ScoreScale,
    /// Message count at which a conversation is handed over
    pub conversation_length: u32,
    /// Conversation duration threshold in seconds
    pub time_threshold: u64,
    pub keyword_triggers: Vec<String>,
    /// Carried for completeness; not consulted by the evaluator
    pub goal_completion_required: Vec<String>,
    pub handover_recipients: Vec<HandoverRecipient>,
}

impl Default for HandoverCriteria {
    fn default() -> Self {
        Self {
            qualification_score: DEFAULT_QUALIFICATION_SCORE,
            score_scale: ScoreScale::Ten,
            conversation_length: DEFAULT_CONVERSATION_LENGTH,
            time_threshold: DEFAULT_TIME_THRESHOLD_SECS,
            keyword_triggers: DEFAULT_KEYWORD_TRIGGERS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            goal_completion_required: Vec::new(),
            handover_recipients: Vec::new(),
        }
    }
}

impl HandoverCriteria {
    /// Extract criteria from a campaign settings blob.
    ///
    /// Returns `Ok(None)` when the campaign has no criteria configured.
    pub fn from_campaign_settings(settings: &serde_json::Value) -> Result<Option<Self>> {
        let raw = match settings.get(CAMPAIGN_CRITERIA_KEY) {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(raw) => raw,
        };

        let criteria: HandoverCriteria = serde_json::from_value(raw.clone())
            .map_err(|e| Error::invalid_criteria(CAMPAIGN_CRITERIA_KEY, e.to_string()))?;

        criteria.validated().map(Some)
    }

    /// Check thresholds and recipients, normalize keywords
    pub fn validated(mut self) -> Result<Self> {
        if !self.qualification_score.is_finite() || self.qualification_score < 0.0 {
            return Err(Error::invalid_criteria(
                "qualificationScore",
                format!("must be non-negative, got {}", self.qualification_score),
            ));
        }
        if self.qualification_score > self.score_scale.max() {
            return Err(Error::invalid_criteria(
                "qualificationScore",
                format!(
                    "{} exceeds the {} scale maximum of {}",
                    self.qualification_score,
                    self.score_scale.as_str(),
                    self.score_scale.max()
                ),
            ));
        }

        for (i, recipient) in self.handover_recipients.iter().enumerate() {
            recipient.validate(i)?;
        }

        let mut keywords: Vec<String> = Vec::with_capacity(self.keyword_triggers.len());
        for keyword in self.keyword_triggers.drain(..) {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
        self.keyword_triggers = keywords;

        Ok(self)
    }

    /// Score threshold as a comparable score
    pub fn score_threshold(&self) -> QualificationScore {
        QualificationScore::new(self.qualification_score, self.score_scale)
    }

    pub fn with_recipients(mut self, recipients: Vec<HandoverRecipient>) -> Self {
        self.handover_recipients = recipients;
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyword_triggers = keywords.into_iter().map(Into::into).collect();
        self
    }
}
