use std::{sync::Arc, time::Duration};

use regex::Regex;

use crate::{
    domain::Recipient,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{DeliveryReceipt, DispatchReport},
    },
    timer::{Delay, Timer},
    Result,
};

/// Decides whether a send attempt means the provider blocked the sender.
pub trait ThrottleDetector: Send + Sync {
    fn is_throttled(&self, receipt: &DeliveryReceipt) -> bool;
}

/// Status code + body regex match.
#[derive(Clone, Debug)]
pub struct PatternThrottleDetector {
    status: u16,
    pattern: Regex,
}

impl PatternThrottleDetector {
    pub fn new(status: u16, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid throttle pattern {pattern:?}: {e}")))?;
        Ok(Self { status, pattern })
    }
}

impl ThrottleDetector for PatternThrottleDetector {
    fn is_throttled(&self, receipt: &DeliveryReceipt) -> bool {
        receipt.status == self.status && self.pattern.is_match(&receipt.body)
    }
}

/// Sends one message to every recipient, best effort.
///
/// A failed recipient never stops the others. If any attempt was throttled the
/// dispatcher sleeps `cooldown` after the fan-out and reports failure.
pub struct Dispatcher {
    messenger: Arc<dyn MessagingPort>,
    recipients: Vec<Recipient>,
    detector: Arc<dyn ThrottleDetector>,
    timer: Arc<dyn Timer>,
    cooldown: Duration,
}

impl Dispatcher {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        recipients: Vec<Recipient>,
        detector: Arc<dyn ThrottleDetector>,
        timer: Arc<dyn Timer>,
        cooldown: Duration,
    ) -> Self {
        Self {
            messenger,
            recipients,
            detector,
            timer,
            cooldown,
        }
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub async fn dispatch(&self, text: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        if self.recipients.is_empty() {
            tracing::warn!("no recipients configured, skipping notification");
            return report;
        }

        for to in &self.recipients {
            match self.messenger.send_text(to, text).await {
                Ok(receipt) if receipt.is_success() => {
                    tracing::info!(to = %to, status = receipt.status, "notification delivered");
                    report.delivered += 1;
                }
                Ok(receipt) => {
                    report.failed += 1;
                    if self.detector.is_throttled(&receipt) {
                        tracing::error!(
                            to = %to,
                            status = receipt.status,
                            body = %receipt.body_snippet(),
                            "sender throttled by messaging provider"
                        );
                        report.throttled = true;
                    } else {
                        tracing::warn!(
                            to = %to,
                            status = receipt.status,
                            body = %receipt.body_snippet(),
                            "notification rejected"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(to = %to, error = %e, "notification send failed");
                    report.failed += 1;
                }
            }
        }

        if report.throttled {
            tracing::warn!(
                secs = self.cooldown.as_secs(),
                "backing off after throttling"
            );
            self.timer
                .sleep(Delay::ThrottleCooldown, self.cooldown)
                .await;
        }

        report
    }
}
