//! Core traits and types for lead handover
//!
//! This crate provides the types shared by every other crate:
//! - Conversation transcript and context
//! - Qualification scores with an explicit scale
//! - Handover criteria, evaluation record and lead update
//! - Storage and notification traits
//! - Error types

pub mod conversation;
pub mod criteria;
pub mod error;
pub mod evaluation;
pub mod lead;
pub mod notification;
pub mod score;
pub mod traits;

pub use conversation::{Channel, ConversationContext, Message, MessageRole};
pub use criteria::{
    HandoverCriteria, HandoverRecipient, CAMPAIGN_CRITERIA_KEY, DEFAULT_KEYWORD_TRIGGERS,
};
pub use error::{Error, Result};
pub use evaluation::{HandoverEvaluation, TriggeredCriterion, UrgencyLevel};
pub use lead::{HandoverUpdate, Lead, LeadStatus, PREVIOUS_CUSTOMER_FLAG};
pub use notification::{DeliveryChannel, DeliveryReceipt, EmailMessage, HandoverNotification};
pub use score::{QualificationScore, ScoreScale};
pub use traits::{CriteriaSource, LeadStore, Notifier};
