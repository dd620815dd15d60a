use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    domain::{Presence, Recipient, UserId},
    errors::Error,
    Result,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20 * 60 * 60);
pub const DEFAULT_THROTTLE_COOLDOWN: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_QUERY_ERROR_COOLDOWN: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_WHATSAPP_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_WHATSAPP_API_VERSION: &str = "v18.0";

pub const DEFAULT_THROTTLE_STATUS: u16 = 400;
/// Meta error codes 131056 (pair rate limit) and 131048 (spam rate limit),
/// plus the wording the Graph API uses when a sender gets blocked.
pub const DEFAULT_THROTTLE_PATTERN: &str = r"(?i)(131056|131048|rate.?limit|spam|blocked)";

/// Typed, immutable configuration for one watcher process.
#[derive(Clone, Debug)]
pub struct Config {
    // Presence / lookup API (Slack)
    pub slack_bot_token: String,
    pub slack_api_base: String,
    pub target_user: UserId,
    pub active_value: String,

    // Messaging API (WhatsApp Cloud)
    pub whatsapp_token: String,
    pub whatsapp_phone_id: String,
    pub whatsapp_api_base: String,
    pub whatsapp_api_version: String,
    pub recipients: Vec<Recipient>,

    // Tunables
    pub poll_interval: Duration,
    pub keepalive_interval: Duration,
    pub throttle_cooldown: Duration,
    pub query_error_cooldown: Duration,
    pub http_timeout: Duration,

    // Throttle sentinel
    pub throttle_status: u16,
    pub throttle_pattern: String,

    // Persistence
    pub state_dir: PathBuf,
}

impl Config {
    /// Build the config from the process environment (after `.env`, if present).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required env vars
        let required = [
            "SLACK_BOT_TOKEN",
            "TARGET_USER",
            "WHATSAPP_TOKEN",
            "WHATSAPP_PHONE_ID",
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|k| get(*k).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let slack_bot_token = get("SLACK_BOT_TOKEN").unwrap_or_default();
        let target_user = UserId(get("TARGET_USER").unwrap_or_default().trim().to_string());
        let whatsapp_token = get("WHATSAPP_TOKEN").unwrap_or_default();
        let whatsapp_phone_id = get("WHATSAPP_PHONE_ID")
            .unwrap_or_default()
            .trim()
            .to_string();

        let recipients = parse_csv(get("WHATSAPP_TO"))
            .into_iter()
            .map(Recipient)
            .collect();

        let secs = |key: &str, default: Duration| {
            parse_u64(get(key))
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Ok(Self {
            slack_bot_token,
            slack_api_base: get("SLACK_API_BASE")
                .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string()),
            target_user,
            active_value: get("PRESENCE_ACTIVE_VALUE")
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| Presence::ACTIVE.to_string()),
            whatsapp_token,
            whatsapp_phone_id,
            whatsapp_api_base: get("WHATSAPP_API_BASE")
                .unwrap_or_else(|| DEFAULT_WHATSAPP_API_BASE.to_string()),
            whatsapp_api_version: get("WHATSAPP_API_VERSION")
                .unwrap_or_else(|| DEFAULT_WHATSAPP_API_VERSION.to_string()),
            recipients,
            poll_interval: secs("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL),
            keepalive_interval: secs("KEEPALIVE_INTERVAL_SECS", DEFAULT_KEEPALIVE_INTERVAL),
            throttle_cooldown: secs("THROTTLE_COOLDOWN_SECS", DEFAULT_THROTTLE_COOLDOWN),
            query_error_cooldown: secs("QUERY_ERROR_COOLDOWN_SECS", DEFAULT_QUERY_ERROR_COOLDOWN),
            http_timeout: secs("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT),
            throttle_status: get("WHATSAPP_THROTTLE_STATUS")
                .and_then(|s| s.trim().parse::<u16>().ok())
                .unwrap_or(DEFAULT_THROTTLE_STATUS),
            throttle_pattern: get("WHATSAPP_THROTTLE_PATTERN")
                .unwrap_or_else(|| DEFAULT_THROTTLE_PATTERN.to_string()),
            state_dir: get("STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv(v: Option<String>) -> Vec<String> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SLACK_BOT_TOKEN", "xoxb-1"),
        ("TARGET_USER", "U123"),
        ("WHATSAPP_TOKEN", "EAAG"),
        ("WHATSAPP_PHONE_ID", "555"),
    ];

    #[test]
    fn missing_required_vars_are_all_reported() {
        let err = Config::from_lookup(lookup(&[("TARGET_USER", "U1"), ("WHATSAPP_TOKEN", " ")]))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SLACK_BOT_TOKEN"), "{msg}");
        assert!(msg.contains("WHATSAPP_TOKEN"), "{msg}");
        assert!(msg.contains("WHATSAPP_PHONE_ID"), "{msg}");
        assert!(!msg.contains("TARGET_USER"), "{msg}");
    }

    #[test]
    fn defaults_apply_when_tunables_absent() {
        let cfg = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.target_user, UserId("U123".to_string()));
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.keepalive_interval, Duration::from_secs(72_000));
        assert_eq!(cfg.throttle_cooldown, Duration::from_secs(1_800));
        assert_eq!(cfg.query_error_cooldown, Duration::from_secs(300));
        assert_eq!(cfg.active_value, "active");
        assert_eq!(cfg.throttle_status, 400);
        assert!(cfg.recipients.is_empty());
        assert_eq!(cfg.state_dir, PathBuf::from("."));
    }

    #[test]
    fn recipients_and_overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("WHATSAPP_TO", " 5215500000001, ,5215500000002 "),
            ("POLL_INTERVAL_SECS", "15"),
            ("KEEPALIVE_INTERVAL_SECS", "not-a-number"),
            ("STATE_DIR", "/var/lib/pwatch"),
        ]);
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            cfg.recipients,
            vec![
                Recipient("5215500000001".to_string()),
                Recipient("5215500000002".to_string())
            ]
        );
        assert_eq!(cfg.poll_interval, Duration::from_secs(15));
        assert_eq!(cfg.keepalive_interval, DEFAULT_KEEPALIVE_INTERVAL);
        assert_eq!(cfg.state_dir, PathBuf::from("/var/lib/pwatch"));
    }

    #[test]
    fn dotenv_lines_strip_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\nSLACK_BOT_TOKEN=\"xoxb-abc\"\nexport TARGET_USER='U9'\nnovalue\n=x\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("SLACK_BOT_TOKEN".to_string(), "xoxb-abc".to_string()),
                ("TARGET_USER".to_string(), "U9".to_string()),
            ]
        );
    }
}
