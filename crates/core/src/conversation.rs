//! Conversation types: messages, roles, channels and the per-evaluation context

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::score::QualificationScore;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Automated agent
    Agent,
    /// The lead (customer)
    Lead,
    /// System notices
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::Agent => "agent",
            MessageRole::Lead => "lead",
            MessageRole::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Channel the conversation runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[default]
    Email,
    Sms,
    Chat,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Chat => "chat",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single message in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Agent, content)
    }

    pub fn lead(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Lead, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Transient view of one conversation, built per evaluation call.
///
/// Messages are kept in insertion order and only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub lead_id: String,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub qualification_score: Option<QualificationScore>,
}

impl ConversationContext {
    pub fn new(lead_id: impl Into<String>, channel: Channel) -> Self {
        Self {
            lead_id: lead_id.into(),
            messages: Vec::new(),
            channel,
            started_at: None,
            qualification_score: None,
        }
    }

    pub fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_score(mut self, score: QualificationScore) -> Self {
        self.qualification_score = Some(score);
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Append a message to the transcript
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Messages authored by the lead, in order
    pub fn lead_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role == MessageRole::Lead)
    }

    /// Last `n` messages, oldest first
    pub fn last_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Lower-cased concatenation of every message body
    pub fn lowercase_transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Elapsed time since `started_at`, `None` when the start is unknown
    pub fn duration_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.started_at.map(|start| now - start)
    }
}
