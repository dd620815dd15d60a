//! Notification text rendering.

use chrono::{DateTime, Local};

use crate::domain::Presence;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What kind of transition notice a message represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Initial,
    Connected,
    Disconnected,
    Changed,
}

/// Renders notifications for one watched user.
#[derive(Clone, Debug)]
pub struct MessageRenderer {
    name: String,
    active_value: String,
}

impl MessageRenderer {
    pub fn new(name: impl Into<String>, active_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active_value: active_value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classify a change from `old` (if ever observed) to `new`.
    pub fn classify(&self, old: Option<&str>, new: &Presence) -> NoticeKind {
        match old {
            None => NoticeKind::Initial,
            Some(_) if new.as_str() == self.active_value => NoticeKind::Connected,
            Some(_) if new.as_str() == Presence::AWAY => NoticeKind::Disconnected,
            Some(_) => NoticeKind::Changed,
        }
    }

    pub fn transition(&self, old: Option<&str>, new: &Presence, now: &DateTime<Local>) -> String {
        let ts = now.format(TIMESTAMP_FORMAT);
        let name = &self.name;
        match (self.classify(old, new), old) {
            (NoticeKind::Initial, _) | (_, None) => {
                format!("ℹ️ {name} is currently {new} on Slack\n{ts}")
            }
            (NoticeKind::Connected, Some(old)) => {
                format!("🟢 {name} connected to Slack ({old} → {new})\n{ts}")
            }
            (NoticeKind::Disconnected, Some(old)) => {
                format!("🔴 {name} disconnected from Slack ({old} → {new})\n{ts}")
            }
            (_, Some(old)) => format!("{name} changed state: {old} → {new}\n{ts}"),
        }
    }

    pub fn heartbeat(&self, current: &Presence, now: &DateTime<Local>) -> String {
        let ts = now.format(TIMESTAMP_FORMAT);
        format!(
            "💓 Monitor running. {} is still {current}\n{ts}",
            self.name
        )
    }
}
