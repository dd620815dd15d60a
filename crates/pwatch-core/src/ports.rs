use async_trait::async_trait;

use crate::{
    domain::{Presence, UserId},
    Result,
};

/// Profile fields returned by the identity lookup API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProfile {
    /// Preferred display field (Slack `real_name`).
    pub real_name: Option<String>,
    /// Fallback display field (Slack `profile.display_name`).
    pub display_name: Option<String>,
}

impl UserProfile {
    /// Pick a human-readable name: primary field, then fallback, then the raw id.
    pub fn best_name(&self, user: &UserId) -> String {
        [self.real_name.as_deref(), self.display_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| user.0.clone())
    }
}

/// Hexagonal port for the presence-query API.
#[async_trait]
pub trait PresenceSource: Send + Sync {
    async fn presence(&self, user: &UserId) -> Result<Presence>;
}

/// Hexagonal port for the identity lookup API.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn profile(&self, user: &UserId) -> Result<UserProfile>;
}
