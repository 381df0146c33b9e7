//! Lead handover engine
//!
//! Decides when an automated conversation should go to a human and carries
//! the handover out:
//! - [`HandoverEvaluator`]: four OR-combined checks, urgency and next actions
//! - [`HandoverExecutor`]: summary, parallel notification, versioned lead update
//! - [`HandoverService`]: both behind one facade

pub mod evaluator;
pub mod executor;
pub mod metrics;
pub mod notifier;
pub mod service;
pub mod summary;

pub use evaluator::{derive_urgency, evaluate_with_criteria, match_keywords, HandoverEvaluator};
pub use executor::{build_notifications, ExecutorConfig, HandoverExecutor, HandoverReport};
pub use notifier::{LoggingNotifier, WebhookNotifier};
pub use service::{ConversationOutcome, HandoverService};
pub use summary::{extract_key_points, generate_recommendations, generate_summary};
