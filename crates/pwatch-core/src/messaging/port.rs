use async_trait::async_trait;

use crate::{domain::Recipient, messaging::types::DeliveryReceipt, Result};

/// Outbound messaging port.
///
/// Implementations return `Ok` with the provider's status/body for any HTTP
/// response (including 4xx/5xx) and `Err` only when no response was obtained
/// (timeout, DNS, TLS, ...). Throttle detection works on the receipt.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, to: &Recipient, text: &str) -> Result<DeliveryReceipt>;
}
