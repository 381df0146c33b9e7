//! End-to-end handover flows against the in-memory stores

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use handover_core::{
    Channel, ConversationContext, CriteriaSource, DeliveryChannel, DeliveryReceipt, Error,
    HandoverCriteria, HandoverNotification, HandoverRecipient, HandoverUpdate, Lead, LeadStatus,
    LeadStore, Message, Notifier, QualificationScore, TriggeredCriterion, UrgencyLevel,
};
use handover_engine::{ExecutorConfig, HandoverService};
use handover_persistence::{InMemoryCampaignStore, InMemoryLeadStore, InMemoryNotifier};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Fails for a fixed set of addresses, optionally stalls for others
#[derive(Default)]
struct ScriptedNotifier {
    fail_for: HashSet<String>,
    stall_for: HashSet<String>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedNotifier {
    fn failing(emails: &[&str]) -> Self {
        Self {
            fail_for: emails.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    fn stalling(emails: &[&str]) -> Self {
        Self {
            stall_for: emails.iter().map(|e| e.to_string()).collect(),
            ..Self::default()
        }
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for ScriptedNotifier {
    async fn notify(
        &self,
        notification: &HandoverNotification,
    ) -> handover_core::Result<DeliveryReceipt> {
        let email = notification.recipient.email.clone();
        self.attempts.lock().unwrap().push(email.clone());

        if self.stall_for.contains(&email) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if self.fail_for.contains(&email) {
            return Err(Error::Notification(format!("mailbox {} rejected", email)));
        }
        Ok(DeliveryReceipt::new(email, DeliveryChannel::Email, true))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Lead store where another writer bumps the lead before each of the first
/// `races` conditional updates
struct RacingLeadStore {
    inner: InMemoryLeadStore,
    races: AtomicU32,
}

impl RacingLeadStore {
    fn new(lead: Lead, races: u32) -> Self {
        let inner = InMemoryLeadStore::new();
        inner.insert(lead);
        Self {
            inner,
            races: AtomicU32::new(races),
        }
    }
}

#[async_trait]
impl LeadStore for RacingLeadStore {
    async fn get_lead(&self, lead_id: &str) -> handover_core::Result<Option<Lead>> {
        self.inner.get_lead(lead_id).await
    }

    async fn apply_handover(
        &self,
        lead_id: &str,
        expected_version: u64,
        update: &HandoverUpdate,
    ) -> handover_core::Result<u64> {
        let remaining = self.races.load(Ordering::SeqCst);
        if remaining > 0 {
            self.races.store(remaining - 1, Ordering::SeqCst);
            if let Some(mut lead) = self.inner.get(lead_id) {
                lead.metadata.insert("touchedBy".to_string(), json!("crm-sync"));
                lead.version += 1;
                self.inner.insert(lead);
            }
        }
        self.inner
            .apply_handover(lead_id, expected_version, update)
            .await
    }
}

struct BrokenCriteriaSource;

#[async_trait]
impl CriteriaSource for BrokenCriteriaSource {
    async fn campaign_criteria(
        &self,
        _campaign_id: &str,
    ) -> handover_core::Result<Option<HandoverCriteria>> {
        Err(Error::Storage("campaigns table unavailable".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn config() -> ExecutorConfig {
    ExecutorConfig {
        default_recipient: HandoverRecipient::new("Sales Team", "sales@example.com", "sales"),
        notification_timeout: Duration::from_millis(200),
        max_update_attempts: 3,
    }
}

fn lead() -> Lead {
    Lead::new("lead-1", "jo@example.com")
        .with_name("Jo", "Doe")
        .with_campaign("camp-1")
}

fn three_recipient_campaign() -> serde_json::Value {
    json!({
        "handoverCriteria": {
            "handoverRecipients": [
                { "name": "Ana", "email": "ana@example.com" },
                { "name": "Ben", "email": "ben@example.com", "role": "manager" },
                { "name": "Cy", "email": "cy@example.com" }
            ]
        }
    })
}

/// Neutral small talk with no default keyword in it
fn small_talk(count: usize) -> Vec<Message> {
    const LINES: &[&str] = &[
        "Hi there",
        "Hello",
        "How are you today",
        "Fine thanks",
        "What brings you here",
        "Just looking around",
        "Anything specific",
        "Not really",
        "Let me know",
        "Will do",
        "Great",
        "Bye for now",
    ];
    (0..count)
        .map(|i| {
            let line = LINES[i % LINES.len()];
            if i % 2 == 0 {
                Message::agent(line)
            } else {
                Message::lead(line)
            }
        })
        .collect()
}

struct Harness {
    leads: Arc<InMemoryLeadStore>,
    campaigns: Arc<InMemoryCampaignStore>,
    service: HandoverService,
}

fn harness(notifier: Arc<dyn Notifier>) -> Harness {
    let leads = Arc::new(InMemoryLeadStore::new());
    leads.insert(lead());
    let campaigns = Arc::new(InMemoryCampaignStore::new());
    let service = HandoverService::with_criteria(
        HandoverCriteria::default(),
        config(),
        leads.clone(),
        campaigns.clone(),
        notifier,
    );
    Harness {
        leads,
        campaigns,
        service,
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_end_to_end_length_only_example() {
    let h = harness(Arc::new(InMemoryNotifier::new()));
    let now = Utc::now();
    let ctx = ConversationContext::new("lead-1", Channel::Email)
        .with_messages(small_talk(11))
        .with_score(QualificationScore::ten(5.0))
        .started_at(now - chrono::Duration::minutes(10));

    let eval = h.service.evaluate_at(&ctx, None, now).await.unwrap();

    assert!(eval.should_handover);
    assert_eq!(
        eval.triggered_criteria,
        vec![TriggeredCriterion::ConversationLength]
    );
    assert_eq!(eval.urgency_level, UrgencyLevel::Low);
    assert_eq!(
        eval.reason,
        "Conversation length (11 messages) reached threshold (10)"
    );
}

#[tokio::test]
async fn test_single_criterion_is_enough() {
    let h = harness(Arc::new(InMemoryNotifier::new()));
    let now = Utc::now();

    let by_score = ConversationContext::new("lead-1", Channel::Email)
        .with_messages(small_talk(2))
        .with_score(QualificationScore::hundred(75.0));
    let by_keyword = ConversationContext::new("lead-1", Channel::Email)
        .with_messages(vec![Message::lead("Can I Speak To Someone please")]);
    let by_time = ConversationContext::new("lead-1", Channel::Email)
        .with_messages(small_talk(2))
        .started_at(now - chrono::Duration::hours(2));

    for (ctx, expected) in [
        (by_score, TriggeredCriterion::QualificationScore),
        (by_keyword, TriggeredCriterion::Keywords),
        (by_time, TriggeredCriterion::TimeThreshold),
    ] {
        let eval = h.service.evaluate_at(&ctx, None, now).await.unwrap();
        assert!(eval.should_handover);
        assert_eq!(eval.triggered_criteria, vec![expected]);
    }
}

#[tokio::test]
async fn test_default_criteria_when_campaign_has_none() {
    let h = harness(Arc::new(InMemoryNotifier::new()));
    h.campaigns
        .insert("custom", json!({ "handoverCriteria": { "keywordTriggers": ["pineapple"] } }));
    h.campaigns.insert("bare", json!({ "tone": "friendly" }));

    let ctx = ConversationContext::new("lead-1", Channel::Sms)
        .with_messages(vec![Message::lead("I need this ASAP")]);

    let eval = h.service.evaluate(&ctx, None).await.unwrap();
    assert_eq!(eval.matched_keywords, vec!["asap".to_string()]);

    let eval = h.service.evaluate(&ctx, Some("bare")).await.unwrap();
    assert_eq!(eval.matched_keywords, vec!["asap".to_string()]);

    let eval = h.service.evaluate(&ctx, Some("unknown")).await.unwrap();
    assert!(eval.has_triggered(TriggeredCriterion::Keywords));

    let eval = h.service.evaluate(&ctx, Some("custom")).await.unwrap();
    assert!(!eval.should_handover);
}

#[tokio::test]
async fn test_campaign_thresholds_on_hundred_scale() {
    let h = harness(Arc::new(InMemoryNotifier::new()));
    h.campaigns.insert(
        "strict",
        json!({ "handoverCriteria": { "qualificationScore": 90, "scoreScale": "hundred" } }),
    );
    let ctx = ConversationContext::new("lead-1", Channel::Chat)
        .with_messages(small_talk(1))
        .with_score(QualificationScore::ten(8.5));

    let eval = h.service.evaluate(&ctx, Some("strict")).await.unwrap();
    assert!(!eval.has_triggered(TriggeredCriterion::QualificationScore));

    let ctx = ctx.with_score(QualificationScore::ten(9.0));
    let eval = h.service.evaluate(&ctx, Some("strict")).await.unwrap();
    assert!(eval.has_triggered(TriggeredCriterion::QualificationScore));
    assert_eq!(eval.urgency_level, UrgencyLevel::High);
}

#[tokio::test]
async fn test_malformed_campaign_criteria_fail_loudly() {
    let h = harness(Arc::new(InMemoryNotifier::new()));
    h.campaigns.insert(
        "broken",
        json!({ "handoverCriteria": { "conversationLength": "ten" } }),
    );
    let ctx = ConversationContext::new("lead-1", Channel::Email).with_messages(small_talk(1));

    let err = h.service.evaluate(&ctx, Some("broken")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidCriteria { .. }));
}

#[tokio::test]
async fn test_criteria_storage_error_propagates() {
    let leads = Arc::new(InMemoryLeadStore::new());
    let service = HandoverService::with_criteria(
        HandoverCriteria::default(),
        config(),
        leads,
        Arc::new(BrokenCriteriaSource),
        Arc::new(InMemoryNotifier::new()),
    );
    let ctx = ConversationContext::new("lead-1", Channel::Email).with_messages(small_talk(1));

    let err = service.evaluate(&ctx, Some("camp-1")).await.unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    // no campaign means no lookup
    assert!(service.evaluate(&ctx, None).await.is_ok());
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

async fn positive_evaluation(service: &HandoverService) -> handover_core::HandoverEvaluation {
    let ctx = ConversationContext::new("lead-1", Channel::Email)
        .with_messages(vec![Message::lead("This is urgent, what is the budget range?")]);
    service.evaluate(&ctx, None).await.unwrap()
}

fn urgent_context() -> ConversationContext {
    ConversationContext::new("lead-1", Channel::Email)
        .with_messages(vec![Message::lead("This is urgent, what is the budget range?")])
}

#[tokio::test]
async fn test_one_of_three_delivered_is_success() {
    let notifier = Arc::new(ScriptedNotifier::failing(&["ben@example.com", "cy@example.com"]));
    let h = harness(notifier.clone());
    h.campaigns.insert("camp-1", three_recipient_campaign());
    let eval = positive_evaluation(&h.service).await;

    let report = h
        .service
        .execute_handover_detailed("lead-1", &eval, &urgent_context(), Some("camp-1"))
        .await
        .unwrap();

    assert!(report.success());
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
    assert!(report.lead_updated);
    assert_eq!(notifier.attempts().len(), 3);

    let stored = h.leads.get("lead-1").unwrap();
    assert_eq!(stored.status, LeadStatus::Handover);
    assert_eq!(stored.version, 1);
    assert_eq!(
        stored.metadata["handoverRecipients"],
        json!(["ana@example.com", "ben@example.com", "cy@example.com"])
    );
}

#[tokio::test]
async fn test_zero_of_three_delivered_leaves_lead_untouched() {
    let notifier = Arc::new(ScriptedNotifier::failing(&[
        "ana@example.com",
        "ben@example.com",
        "cy@example.com",
    ]));
    let h = harness(notifier.clone());
    h.campaigns.insert("camp-1", three_recipient_campaign());
    let eval = positive_evaluation(&h.service).await;

    let handed_over = h
        .service
        .execute_handover("lead-1", &eval, &urgent_context(), Some("camp-1"))
        .await
        .unwrap();

    assert!(!handed_over);
    assert_eq!(notifier.attempts().len(), 3);
    let stored = h.leads.get("lead-1").unwrap();
    assert_eq!(stored.status, LeadStatus::New);
    assert_eq!(stored.version, 0);
    assert!(!stored.metadata.contains_key("handoverTime"));
}

#[tokio::test]
async fn test_timed_out_notification_counts_as_failure() {
    let notifier = Arc::new(ScriptedNotifier::stalling(&["ana@example.com"]));
    let h = harness(notifier.clone());
    h.campaigns.insert("camp-1", three_recipient_campaign());
    let eval = positive_evaluation(&h.service).await;

    let report = h
        .service
        .execute_handover_detailed("lead-1", &eval, &urgent_context(), Some("camp-1"))
        .await
        .unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert!(report.receipts.iter().all(|r| r.recipient_email != "ana@example.com"));
}

#[tokio::test]
async fn test_missing_lead_fails_before_notifying() {
    let notifier = Arc::new(InMemoryNotifier::new());
    let h = harness(notifier.clone());
    let eval = positive_evaluation(&h.service).await;

    let err = h
        .service
        .execute_handover("nobody", &eval, &urgent_context(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound { .. }));
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_default_recipient_when_campaign_lists_none() {
    let notifier = Arc::new(InMemoryNotifier::new());
    let h = harness(notifier.clone());
    let eval = positive_evaluation(&h.service).await;

    let handed_over = h
        .service
        .execute_handover("lead-1", &eval, &urgent_context(), None)
        .await
        .unwrap();

    assert!(handed_over);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient.email, "sales@example.com");
    assert_eq!(sent[0].lead_name, "Jo Doe");
    assert_eq!(sent[0].campaign_id.as_deref(), Some("camp-1"));
    assert_eq!(
        sent[0].key_points,
        vec!["This is urgent, what is the budget range?".to_string()]
    );
    assert!(sent[0]
        .conversation_summary
        .starts_with("Conversation summary: 1 messages"));
}

#[tokio::test]
async fn test_quick_handover_is_high_urgency() {
    let notifier = Arc::new(InMemoryNotifier::new());
    let h = harness(notifier.clone());
    let ctx = ConversationContext::new("lead-1", Channel::Sms).with_messages(small_talk(2));

    let handed_over = h
        .service
        .quick_handover("lead-1", "Lead asked for a callback from the owner", &ctx, None)
        .await
        .unwrap();

    assert!(handed_over);
    let sent = notifier.sent();
    assert_eq!(sent[0].urgency_level, UrgencyLevel::High);
    assert_eq!(sent[0].reason, "Lead asked for a callback from the owner");

    let stored = h.leads.get("lead-1").unwrap();
    assert_eq!(stored.status, LeadStatus::Handover);
    assert_eq!(stored.metadata["handoverUrgency"], json!("high"));
    assert_eq!(
        stored.metadata["handoverReason"],
        json!("Lead asked for a callback from the owner")
    );
}

#[tokio::test]
async fn test_repeat_handover_keeps_history() {
    let h = harness(Arc::new(InMemoryNotifier::new()));
    let ctx = urgent_context();

    assert!(h.service.quick_handover("lead-1", "first", &ctx, None).await.unwrap());
    assert!(h.service.quick_handover("lead-1", "second", &ctx, None).await.unwrap());

    let stored = h.leads.get("lead-1").unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.metadata["handoverReason"], json!("second"));
    let history = stored.metadata["handoverHistory"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["handoverReason"], json!("first"));
}

#[tokio::test]
async fn test_lead_update_retries_after_conflict() {
    let leads = Arc::new(RacingLeadStore::new(lead(), 2));
    let service = HandoverService::with_criteria(
        HandoverCriteria::default(),
        config(),
        leads.clone(),
        Arc::new(InMemoryCampaignStore::new()),
        Arc::new(InMemoryNotifier::new()),
    );

    let handed_over = service
        .quick_handover("lead-1", "escalation", &urgent_context(), None)
        .await
        .unwrap();

    assert!(handed_over);
    let stored = leads.inner.get("lead-1").unwrap();
    assert_eq!(stored.version, 3);
    assert_eq!(stored.status, LeadStatus::Handover);
    assert_eq!(stored.metadata["touchedBy"], json!("crm-sync"));
    assert_eq!(stored.metadata["handoverReason"], json!("escalation"));
}

#[tokio::test]
async fn test_lead_update_gives_up_after_max_attempts() {
    let leads = Arc::new(RacingLeadStore::new(lead(), 10));
    let service = HandoverService::with_criteria(
        HandoverCriteria::default(),
        config(),
        leads.clone(),
        Arc::new(InMemoryCampaignStore::new()),
        Arc::new(InMemoryNotifier::new()),
    );

    let err = service
        .quick_handover("lead-1", "escalation", &urgent_context(), None)
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_ne!(leads.inner.get("lead-1").unwrap().status, LeadStatus::Handover);
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_process_conversation_skips_execution_when_not_needed() {
    let notifier = Arc::new(InMemoryNotifier::new());
    let h = harness(notifier.clone());
    let ctx = ConversationContext::new("lead-1", Channel::Email).with_messages(small_talk(3));

    let outcome = h.service.process_conversation(&ctx, None).await.unwrap();

    assert!(!outcome.evaluation.should_handover);
    assert_eq!(outcome.handed_over, None);
    assert!(notifier.sent().is_empty());
    assert_eq!(h.leads.get("lead-1").unwrap().status, LeadStatus::New);
}

#[tokio::test]
async fn test_process_conversation_hands_over() {
    let notifier = Arc::new(InMemoryNotifier::new());
    let h = harness(notifier.clone());
    h.campaigns.insert("camp-1", three_recipient_campaign());

    let outcome = h
        .service
        .process_conversation(&urgent_context(), Some("camp-1"))
        .await
        .unwrap();

    assert_eq!(outcome.handed_over, Some(true));
    assert_eq!(outcome.delivered, 3);
    assert!(outcome.lead_updated);
    assert_eq!(notifier.sent().len(), 3);
}
