/// Raw provider response for one send attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub status: u16,
    pub body: String,
}

impl DeliveryReceipt {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body truncated for log lines.
    pub fn body_snippet(&self) -> String {
        self.body.chars().take(200).collect()
    }
}

/// Result of fanning one message out to every recipient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    pub throttled: bool,
}

impl DispatchReport {
    /// Best effort: only throttling counts as overall failure.
    pub fn is_ok(&self) -> bool {
        !self.throttled
    }
}
