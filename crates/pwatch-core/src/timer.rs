use std::time::Duration;

use async_trait::async_trait;

/// The watcher's suspension points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delay {
    /// Normal wait between polls.
    Poll,
    /// Wait after a failed presence query.
    QueryCooldown,
    /// Wait after the messaging provider throttled the sender.
    ThrottleCooldown,
}

/// Timer port, so tests can observe delays without sleeping.
#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, delay: Delay, dur: Duration);
}

/// Production timer backed by `tokio::time::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, delay: Delay, dur: Duration) {
        tracing::debug!(?delay, secs = dur.as_secs(), "sleeping");
        tokio::time::sleep(dur).await;
    }
}
