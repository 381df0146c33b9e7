//! Handover notification payload and delivery receipt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::criteria::HandoverRecipient;
use crate::evaluation::UrgencyLevel;
use crate::score::QualificationScore;

/// Everything a human needs to pick up the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoverNotification {
    pub recipient: HandoverRecipient,
    pub lead_id: String,
    pub campaign_id: Option<String>,
    pub lead_name: String,
    pub lead_email: String,
    pub lead_phone: Option<String>,
    pub conversation_summary: String,
    pub qualification_score: Option<QualificationScore>,
    pub key_points: Vec<String>,
    pub recommendations: Vec<String>,
    pub urgency_level: UrgencyLevel,
    pub reason: String,
}

/// Plain-text email rendering of a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl HandoverNotification {
    /// Render the notification as a plain-text email
    pub fn to_email(&self) -> EmailMessage {
        let subject = format!(
            "[{}] Lead handover: {}",
            self.urgency_level.as_str().to_uppercase(),
            self.lead_name
        );

        let greeting = if self.recipient.name.is_empty() {
            "Hello,".to_string()
        } else {
            format!("Hi {},", self.recipient.name)
        };

        let mut body = format!(
            "{}\n\nA conversation needs a human follow-up.\n\n\
             Lead: {}\nEmail: {}\n",
            greeting, self.lead_name, self.lead_email
        );
        if let Some(phone) = &self.lead_phone {
            body.push_str(&format!("Phone: {}\n", phone));
        }
        let score = self
            .qualification_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        body.push_str(&format!(
            "Qualification score: {}\nUrgency: {}\nReason: {}\n\n{}\n",
            score, self.urgency_level, self.reason, self.conversation_summary
        ));

        if !self.key_points.is_empty() {
            body.push_str("\nKey points:\n");
            for point in &self.key_points {
                body.push_str(&format!("- {}\n", point));
            }
        }
        if !self.recommendations.is_empty() {
            body.push_str("\nRecommendations:\n");
            for rec in &self.recommendations {
                body.push_str(&format!("- {}\n", rec));
            }
        }

        EmailMessage {
            to: self.recipient.email.clone(),
            subject,
            body,
        }
    }
}

/// Delivery channel that produced a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Email,
    Webhook,
    Log,
}

/// Proof that one notification was accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub notification_id: Uuid,
    pub recipient_email: String,
    pub channel: DeliveryChannel,
    pub delivered_at: DateTime<Utc>,
    /// True when nothing actually left the process
    pub simulated: bool,
}

impl DeliveryReceipt {
    pub fn new(recipient_email: impl Into<String>, channel: DeliveryChannel, simulated: bool) -> Self {
        Self {
            notification_id: Uuid::new_v4(),
            recipient_email: recipient_email.into(),
            channel,
            delivered_at: Utc::now(),
            simulated,
        }
    }
}
