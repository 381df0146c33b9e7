//! Lead record as seen by the handover subsystem
//!
//! Leads are created and owned by the CRM side. Handover only reads them and
//! applies a versioned update when a conversation is handed to a human.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::criteria::HandoverRecipient;
use crate::evaluation::UrgencyLevel;
use crate::score::QualificationScore;

/// Metadata flag marking a returning customer
pub const PREVIOUS_CUSTOMER_FLAG: &str = "previousCustomer";

/// Lead lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Handover,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Handover => "handover",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "new" => Self::New,
            "contacted" => Self::Contacted,
            "qualified" => Self::Qualified,
            "handover" => Self::Handover,
            "converted" => Self::Converted,
            "lost" => Self::Lost,
            _ => Self::New,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub campaign_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
    /// Stored on the unit scale once written by a handover
    pub qualification_score: Option<QualificationScore>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Incremented on every successful write
    #[serde(default)]
    pub version: u64,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            campaign_id: None,
            first_name: None,
            last_name: None,
            email: email.into(),
            phone: None,
            status: LeadStatus::New,
            qualification_score: None,
            metadata: Map::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Display name, falling back to the email address
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }

    pub fn is_previous_customer(&self) -> bool {
        self.metadata
            .get(PREVIOUS_CUSTOMER_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Apply a handover update in place, bumping the version
    pub fn apply(&mut self, update: &HandoverUpdate) {
        self.status = LeadStatus::Handover;
        if let Some(score) = update.qualification_score {
            self.qualification_score = Some(score.to_unit());
        }
        update.merge_into(&mut self.metadata);
        self.version += 1;
        self.updated_at = update.handover_time;
    }
}

/// Mutation applied to a lead once a handover went out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoverUpdate {
    pub qualification_score: Option<QualificationScore>,
    pub handover_time: DateTime<Utc>,
    pub reason: String,
    pub urgency: UrgencyLevel,
    pub recipients: Vec<HandoverRecipient>,
}

impl HandoverUpdate {
    /// Merge handover keys into existing metadata.
    ///
    /// Unrelated keys are kept. The previous handover (if any) is appended to
    /// `handoverHistory` before the top-level keys are overwritten.
    pub fn merge_into(&self, metadata: &mut Map<String, Value>) {
        if let Some(previous_time) = metadata.get("handoverTime").cloned() {
            let previous = serde_json::json!({
                "handoverTime": previous_time,
                "handoverReason": metadata.get("handoverReason").cloned().unwrap_or(Value::Null),
            });
            match metadata.get_mut("handoverHistory") {
                Some(Value::Array(history)) => history.push(previous),
                _ => {
                    metadata.insert("handoverHistory".to_string(), Value::Array(vec![previous]));
                },
            }
        }

        metadata.insert(
            "handoverTime".to_string(),
            Value::String(self.handover_time.to_rfc3339()),
        );
        metadata.insert("handoverReason".to_string(), Value::String(self.reason.clone()));
        metadata.insert(
            "handoverUrgency".to_string(),
            Value::String(self.urgency.as_str().to_string()),
        );
        metadata.insert(
            "handoverRecipients".to_string(),
            Value::Array(
                self.recipients
                    .iter()
                    .map(|r| Value::String(r.email.clone()))
                    .collect(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(reason: &str) -> HandoverUpdate {
        HandoverUpdate {
            qualification_score: Some(QualificationScore::ten(8.0)),
            handover_time: Utc::now(),
            reason: reason.to_string(),
            urgency: UrgencyLevel::High,
            recipients: vec![HandoverRecipient::new("Ana", "ana@example.com", "ae")],
        }
    }

    #[test]
    fn test_display_name_fallback() {
        let lead = Lead::new("1", "jo@example.com");
        assert_eq!(lead.display_name(), "jo@example.com");
        let lead = lead.with_name("Jo", "Doe");
        assert_eq!(lead.display_name(), "Jo Doe");
    }

    #[test]
    fn test_apply_sets_status_and_bumps_version() {
        let mut lead = Lead::new("1", "jo@example.com").with_metadata("source", json!("csv"));
        lead.apply(&update("Keywords detected: urgent"));

        assert_eq!(lead.status, LeadStatus::Handover);
        assert_eq!(
            lead.qualification_score,
            Some(QualificationScore::new(0.8, crate::score::ScoreScale::Unit))
        );
        assert_eq!(lead.version, 1);
        assert_eq!(lead.metadata["source"], json!("csv"));
        assert_eq!(lead.metadata["handoverReason"], json!("Keywords detected: urgent"));
        assert_eq!(lead.metadata["handoverRecipients"], json!(["ana@example.com"]));
    }

    #[test]
    fn test_stored_score_is_scale_independent() {
        let mut on_ten = Lead::new("1", "a@example.com");
        let mut on_hundred = Lead::new("2", "b@example.com");

        let mut u = update("score");
        u.qualification_score = Some(QualificationScore::ten(7.2));
        on_ten.apply(&u);
        u.qualification_score = Some(QualificationScore::hundred(72.0));
        on_hundred.apply(&u);

        assert_eq!(on_ten.qualification_score, on_hundred.qualification_score);
    }

    #[test]
    fn test_lead_json_accepts_bare_score() {
        let lead: Lead = serde_json::from_str(
            r#"{"id": "1", "email": "jo@example.com", "qualificationScore": 6}"#,
        )
        .unwrap();
        assert_eq!(lead.qualification_score, Some(QualificationScore::ten(6.0)));
    }

    #[test]
    fn test_repeat_handover_appends_history() {
        let mut lead = Lead::new("1", "jo@example.com");
        lead.apply(&update("first"));
        lead.apply(&update("second"));

        let history = lead.metadata["handoverHistory"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["handoverReason"], json!("first"));
        assert_eq!(lead.metadata["handoverReason"], json!("second"));
        assert_eq!(lead.version, 2);
    }

    #[test]
    fn test_previous_customer_flag() {
        let lead = Lead::new("1", "jo@example.com");
        assert!(!lead.is_previous_customer());
        let lead = lead.with_metadata(PREVIOUS_CUSTOMER_FLAG, json!(true));
        assert!(lead.is_previous_customer());
    }

    #[test]
    fn test_status_round_trip_str() {
        assert_eq!(LeadStatus::from_str(LeadStatus::Handover.as_str()), LeadStatus::Handover);
        assert_eq!(LeadStatus::from_str("bogus"), LeadStatus::New);
    }
}
