use std::fmt;

/// Slack user id of the watched identity (e.g. `U01ABCDEF`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

/// Outbound destination address (WhatsApp phone number, digits only).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Recipient(pub String);

/// Provider-reported presence value.
///
/// Treated as an opaque string; only the configured "present" value and
/// [`Presence::AWAY`] get dedicated wording.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Presence(pub String);

impl Presence {
    pub const ACTIVE: &'static str = "active";
    pub const AWAY: &'static str = "away";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
