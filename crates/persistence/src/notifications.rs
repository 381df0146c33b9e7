//! Simulated handover email delivery with ScyllaDB persistence
//!
//! Emails are NOT sent. Each rendered message is persisted so deliveries can
//! be audited and replayed against a real mail provider later.

use async_trait::async_trait;

use handover_core::{DeliveryChannel, DeliveryReceipt, HandoverNotification, Notifier};

use crate::{PersistenceError, ScyllaClient};

#[derive(Clone)]
pub struct SimulatedEmailNotifier {
    client: ScyllaClient,
}

impl SimulatedEmailNotifier {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn persist(
        &self,
        notification: &HandoverNotification,
    ) -> Result<DeliveryReceipt, PersistenceError> {
        let email = notification.to_email();
        let receipt = DeliveryReceipt::new(&email.to, DeliveryChannel::Email, true);

        let query = format!(
            "INSERT INTO {} (
                lead_id, notification_id, campaign_id, recipient_email, recipient_role,
                subject, body, urgency, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.table("handover_notifications")
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &notification.lead_id,
                    receipt.notification_id,
                    &notification.campaign_id,
                    &email.to,
                    &notification.recipient.role,
                    &email.subject,
                    &email.body,
                    notification.urgency_level.as_str(),
                    receipt.delivered_at.timestamp_millis(),
                ),
            )
            .await?;

        tracing::info!(
            lead_id = %notification.lead_id,
            recipient = %email.to,
            notification_id = %receipt.notification_id,
            "Handover email simulated and persisted to ScyllaDB"
        );

        tracing::debug!(subject = %email.subject, body = %email.body, "Handover email content (simulated)");

        Ok(receipt)
    }
}

#[async_trait]
impl Notifier for SimulatedEmailNotifier {
    async fn notify(
        &self,
        notification: &HandoverNotification,
    ) -> handover_core::Result<DeliveryReceipt> {
        self.persist(notification)
            .await
            .map_err(|e| handover_core::Error::Notification(e.to_string()))
    }

    fn name(&self) -> &str {
        "simulated_email"
    }
}
