//! Notification transports that live outside storage

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use handover_core::{
    DeliveryChannel, DeliveryReceipt, EmailMessage, Error, HandoverNotification, Notifier, Result,
};

/// Writes the rendered email to the log and reports success.
///
/// Development default when neither persistence nor a webhook is configured.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(&self, notification: &HandoverNotification) -> Result<DeliveryReceipt> {
        let email = notification.to_email();
        tracing::info!(
            lead_id = %notification.lead_id,
            to = %email.to,
            subject = %email.subject,
            "Handover notification (log only)"
        );
        tracing::debug!(body = %email.body, "Handover notification body");

        Ok(DeliveryReceipt::new(email.to, DeliveryChannel::Log, true))
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    event: &'static str,
    notification: &'a HandoverNotification,
    email: EmailMessage,
}

/// POSTs each notification as JSON; any 2xx response counts as delivered
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    token: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Notification(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &HandoverNotification) -> Result<DeliveryReceipt> {
        let payload = WebhookPayload {
            event: "lead.handover",
            notification,
            email: notification.to_email(),
        };

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Notification(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Notification(format!(
                "Webhook returned {}: {}",
                status, body
            )));
        }

        tracing::debug!(
            lead_id = %notification.lead_id,
            recipient = %notification.recipient.email,
            "Webhook accepted handover notification"
        );

        Ok(DeliveryReceipt::new(
            &notification.recipient.email,
            DeliveryChannel::Webhook,
            false,
        ))
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
