//! Outbound notification seam

use async_trait::async_trait;

use crate::error::Result;
use crate::notification::{DeliveryReceipt, HandoverNotification};

/// Delivers one handover notification to one recipient
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &HandoverNotification) -> Result<DeliveryReceipt>;

    /// Name used in logs
    fn name(&self) -> &str;
}
