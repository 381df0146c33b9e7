//! Handover summary, key points and recommendations
//!
//! All three are fixed-format template fills over the transcript. Nothing
//! here calls a model.

use chrono::{DateTime, Utc};

use handover_core::{
    Channel, ConversationContext, Lead, MessageRole, QualificationScore, UrgencyLevel,
};

/// Messages quoted verbatim at the end of the summary
pub const SUMMARY_EXCERPT_MESSAGES: usize = 3;
/// Upper bound on extracted key points
pub const MAX_KEY_POINTS: usize = 5;

const INTEREST_PHRASES: &[&str] = &[
    "interested",
    "sounds good",
    "tell me more",
    "would love",
    "like to know",
    "want to",
];

const BUDGET_PHRASES: &[&str] = &["budget", "cost", "afford", "spend", "quote", "$"];

const TIMELINE_PHRASES: &[&str] = &[
    "timeline",
    "this week",
    "next week",
    "this month",
    "next month",
    "soon",
    "deadline",
    "by the end of",
];

/// Category a key point was picked up for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPointKind {
    Interest,
    Budget,
    Timeline,
    Question,
}

/// Plain-text summary: counts, duration, last three messages
pub fn generate_summary(context: &ConversationContext, now: DateTime<Utc>) -> String {
    let minutes = context
        .duration_at(now)
        .map(|d| d.num_minutes().max(0))
        .unwrap_or(0);

    let mut summary = format!(
        "Conversation summary: {} messages over {} minutes via {}.",
        context.message_count(),
        minutes,
        context.channel
    );

    let excerpt = context.last_messages(SUMMARY_EXCERPT_MESSAGES);
    if !excerpt.is_empty() {
        summary.push_str("\n\nRecent messages:");
        for message in excerpt {
            summary.push_str(&format!("\n{}: {}", speaker(message.role), message.content));
        }
    }

    summary
}

fn speaker(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Agent => "Agent",
        MessageRole::Lead => "Lead",
        MessageRole::System => "System",
    }
}

/// Classify one lead message, first matching category wins
pub fn classify(content: &str) -> Option<KeyPointKind> {
    let lower = content.to_lowercase();
    let contains_any = |phrases: &[&str]| phrases.iter().any(|p| lower.contains(p));

    if contains_any(INTEREST_PHRASES) {
        Some(KeyPointKind::Interest)
    } else if contains_any(BUDGET_PHRASES) {
        Some(KeyPointKind::Budget)
    } else if contains_any(TIMELINE_PHRASES) {
        Some(KeyPointKind::Timeline)
    } else if lower.contains('?') {
        Some(KeyPointKind::Question)
    } else {
        None
    }
}

/// Lead messages that mention interest, budget, timing or ask a question,
/// first five in transcript order
pub fn extract_key_points(context: &ConversationContext) -> Vec<String> {
    context
        .lead_messages()
        .filter(|m| classify(&m.content).is_some())
        .take(MAX_KEY_POINTS)
        .map(|m| m.content.trim().to_string())
        .collect()
}

/// Canned recommendations; each rule is independent and appends in order
pub fn generate_recommendations(
    score: Option<QualificationScore>,
    channel: Channel,
    urgency: UrgencyLevel,
    lead: &Lead,
) -> Vec<String> {
    let mut recs = Vec::new();
    let normalized = score.map(|s| s.normalized()).unwrap_or(0.0);

    if normalized >= 0.8 {
        recs.push("Highly qualified lead: prioritise a direct call and a tailored proposal".to_string());
    } else if normalized >= 0.6 {
        recs.push("Qualified lead: confirm requirements before sending pricing".to_string());
    } else {
        recs.push("Early-stage lead: focus on discovery and nurture interest".to_string());
    }

    match channel {
        Channel::Email => {
            recs.push("Reply by email first; the lead has been engaging over email".to_string())
        },
        Channel::Sms => {
            recs.push("Keep follow-ups short; the lead prefers text messages".to_string())
        },
        Channel::Chat => recs.push("Offer a live chat or call while the lead is active".to_string()),
    }

    match urgency {
        UrgencyLevel::High => recs.push("Contact the lead within the hour".to_string()),
        UrgencyLevel::Medium => recs.push("Contact the lead today".to_string()),
        UrgencyLevel::Low => recs.push("Contact the lead within two business days".to_string()),
    }

    if lead.is_previous_customer() {
        recs.push("Returning customer: review their purchase history before reaching out".to_string());
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use handover_core::{Message, PREVIOUS_CUSTOMER_FLAG};
    use serde_json::json;

    #[test]
    fn test_summary_template() {
        let now = Utc::now();
        let ctx = ConversationContext::new("lead-1", Channel::Sms)
            .started_at(now - Duration::minutes(12))
            .with_messages(vec![
                Message::agent("Hi"),
                Message::lead("Hello"),
                Message::agent("How can I help?"),
                Message::lead("Just browsing"),
            ]);

        let summary = generate_summary(&ctx, now);
        assert!(summary.starts_with("Conversation summary: 4 messages over 12 minutes via sms."));
        assert!(!summary.contains("Agent: Hi\n"));
        assert!(summary.contains("Lead: Hello"));
        assert!(summary.ends_with("Lead: Just browsing"));
    }

    #[test]
    fn test_summary_without_start_or_messages() {
        let ctx = ConversationContext::new("lead-1", Channel::Email);
        let summary = generate_summary(&ctx, Utc::now());
        assert_eq!(summary, "Conversation summary: 0 messages over 0 minutes via email.");
    }

    #[test]
    fn test_key_points_only_from_lead_and_capped() {
        let mut messages = vec![
            Message::system("Any questions about the budget?"),
            Message::agent("Any questions?"),
        ];
        for i in 0..7 {
            messages.push(Message::lead(format!("Question number {}?", i)));
        }
        let ctx = ConversationContext::new("lead-1", Channel::Chat).with_messages(messages);

        let points = extract_key_points(&ctx);
        assert_eq!(points.len(), MAX_KEY_POINTS);
        assert_eq!(points[0], "Question number 0?");
        assert!(!points.iter().any(|p| p.starts_with("Any questions")));
    }

    #[test]
    fn test_classify_categories() {
        assert_eq!(classify("I'm interested in the pro plan"), Some(KeyPointKind::Interest));
        assert_eq!(classify("Our budget is tight"), Some(KeyPointKind::Budget));
        assert_eq!(classify("We need it next month"), Some(KeyPointKind::Timeline));
        assert_eq!(classify("Does it integrate with Slack?"), Some(KeyPointKind::Question));
        assert_eq!(classify("ok"), None);
    }

    #[test]
    fn test_recommendation_table() {
        let lead = Lead::new("lead-1", "jo@example.com")
            .with_metadata(PREVIOUS_CUSTOMER_FLAG, json!(true));

        let recs = generate_recommendations(
            Some(QualificationScore::ten(9.0)),
            Channel::Email,
            UrgencyLevel::High,
            &lead,
        );
        assert_eq!(recs.len(), 4);
        assert!(recs[0].starts_with("Highly qualified"));
        assert!(recs[1].contains("email"));
        assert!(recs[2].contains("within the hour"));
        assert!(recs[3].starts_with("Returning customer"));

        let fresh = Lead::new("lead-2", "new@example.com");
        let recs = generate_recommendations(None, Channel::Sms, UrgencyLevel::Low, &fresh);
        assert_eq!(recs.len(), 3);
        assert!(recs[0].starts_with("Early-stage"));
        assert!(recs[1].contains("text messages"));
    }

    #[test]
    fn test_recommendation_buckets_are_scale_independent() {
        let lead = Lead::new("lead-1", "jo@example.com");
        let on_ten = generate_recommendations(
            Some(QualificationScore::ten(6.5)),
            Channel::Chat,
            UrgencyLevel::Medium,
            &lead,
        );
        let on_hundred = generate_recommendations(
            Some(QualificationScore::hundred(65.0)),
            Channel::Chat,
            UrgencyLevel::Medium,
            &lead,
        );
        assert_eq!(on_ten, on_hundred);
        assert!(on_ten[0].starts_with("Qualified lead"));
    }
}
