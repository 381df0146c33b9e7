//! Trait seams between the handover engine and its collaborators

mod notifier;
mod store;

pub use notifier::Notifier;
pub use store::{CriteriaSource, LeadStore};
