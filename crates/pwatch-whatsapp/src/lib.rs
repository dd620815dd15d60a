//! WhatsApp Cloud API adapter.
//!
//! Implements the `pwatch-core` MessagingPort by posting text messages to
//! `{base}/{version}/{phone_id}/messages`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use pwatch_core::{
    domain::Recipient,
    errors::Error,
    messaging::{port::MessagingPort, types::DeliveryReceipt},
    Result,
};

#[derive(Clone, Debug)]
pub struct WhatsAppMessenger {
    token: String,
    endpoint: String,
    http: reqwest::Client,
}

impl WhatsAppMessenger {
    pub fn new(
        token: impl Into<String>,
        api_base: &str,
        api_version: &str,
        phone_id: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("whatsapp client build: {e}")))?;
        Ok(Self {
            token: token.into(),
            endpoint: messages_endpoint(api_base, api_version, phone_id),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn messages_endpoint(api_base: &str, api_version: &str, phone_id: &str) -> String {
    format!(
        "{}/{}/{}/messages",
        api_base.trim_end_matches('/'),
        api_version.trim_matches('/'),
        phone_id
    )
}

fn text_message_body(to: &Recipient, text: &str) -> serde_json::Value {
    json!({
        "messaging_product": "whatsapp",
        "to": to.0,
        "type": "text",
        "text": { "body": text }
    })
}

/// An unreadable body is logged and treated as empty; the status still counts.
fn body_or_empty<E: std::fmt::Display>(
    to: &Recipient,
    status: u16,
    body: std::result::Result<String, E>,
) -> String {
    match body {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(to = %to, status, error = %e, "failed to read whatsapp response body");
            String::new()
        }
    }
}

#[async_trait]
impl MessagingPort for WhatsAppMessenger {
    async fn send_text(&self, to: &Recipient, text: &str) -> Result<DeliveryReceipt> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&text_message_body(to, text))
            .send()
            .await
            .map_err(|e| Error::Http(format!("whatsapp request error: {e}")))?;

        let status = resp.status().as_u16();
        let body = body_or_empty(to, status, resp.text().await);
        tracing::debug!(to = %to, status, body = %body, "whatsapp response");

        Ok(DeliveryReceipt { status, body })
    }
}
