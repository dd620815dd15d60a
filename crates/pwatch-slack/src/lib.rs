//! Slack adapter.
//!
//! Implements the presence-query port (`users.getPresence`) and the identity
//! lookup port (`users.info`) of `pwatch-core` over the Slack Web API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use pwatch_core::{
    domain::{Presence, UserId},
    errors::Error,
    ports::{PresenceSource, ProfileLookup, UserProfile},
    Result,
};

#[derive(Clone, Debug)]
pub struct SlackClient {
    token: String,
    api_base: String,
    http: reqwest::Client,
}

impl SlackClient {
    pub fn new(
        token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("slack client build: {e}")))?;
        Ok(Self {
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn call(&self, method: &'static str, user: &UserId) -> Result<serde_json::Value> {
        let url = format!("{}/{method}", self.api_base);
        tracing::debug!(method, user = %user, "slack api call");
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("user", user.0.as_str())])
            .send()
            .await
            .map_err(|e| Error::Http(format!("slack {method} request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            // Slack reports rate limiting as HTTP 429 with no `ok` body.
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                api: method,
                code: format!(
                    "http {status}: {}",
                    body.chars().take(200).collect::<String>()
                ),
            });
        }

        resp.json()
            .await
            .map_err(|e| Error::Http(format!("slack {method} json error: {e}")))
    }
}

#[async_trait]
impl PresenceSource for SlackClient {
    async fn presence(&self, user: &UserId) -> Result<Presence> {
        let v = self.call("users.getPresence", user).await?;
        parse_presence(v)
    }
}

#[async_trait]
impl ProfileLookup for SlackClient {
    async fn profile(&self, user: &UserId) -> Result<UserProfile> {
        let v = self.call("users.info", user).await?;
        parse_user_info(v)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

fn check_ok(api: &'static str, v: &serde_json::Value) -> Result<()> {
    let env: Envelope = serde_json::from_value(v.clone())?;
    if env.ok {
        Ok(())
    } else {
        Err(Error::Api {
            api,
            code: env.error.unwrap_or_else(|| "unknown_error".to_string()),
        })
    }
}

fn parse_presence(v: serde_json::Value) -> Result<Presence> {
    check_ok("users.getPresence", &v)?;
    v.get("presence")
        .and_then(|p| p.as_str())
        .filter(|p| !p.trim().is_empty())
        .map(Presence::new)
        .ok_or_else(|| Error::Api {
            api: "users.getPresence",
            code: "missing_presence".to_string(),
        })
}

#[derive(Debug, Default, Deserialize)]
struct SlackUser {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    profile: SlackProfile,
}

#[derive(Debug, Default, Deserialize)]
struct SlackProfile {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

fn parse_user_info(v: serde_json::Value) -> Result<UserProfile> {
    check_ok("users.info", &v)?;
    let user: SlackUser = match v.get("user") {
        Some(u) => serde_json::from_value(u.clone())?,
        None => SlackUser::default(),
    };

    let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
    Ok(UserProfile {
        real_name: non_blank(user.real_name).or_else(|| non_blank(user.profile.real_name)),
        display_name: non_blank(user.profile.display_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn presence_ok_response() {
        let p = parse_presence(json!({"ok": true, "presence": "away", "online": false})).unwrap();
        assert_eq!(p, Presence::new("away"));
    }

    #[test]
    fn presence_error_code_is_surfaced() {
        let err = parse_presence(json!({"ok": false, "error": "user_not_found"})).unwrap_err();
        match err {
            Error::Api { api, code } => {
                assert_eq!(api, "users.getPresence");
                assert_eq!(code, "user_not_found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn presence_missing_field_is_an_error() {
        assert!(parse_presence(json!({"ok": true})).is_err());
        assert!(parse_presence(json!({"presence": "active"})).is_err());
    }

    #[test]
    fn user_info_prefers_real_name() {
        let profile = parse_user_info(json!({
            "ok": true,
            "user": {
                "id": "U1",
                "real_name": "Ada Lovelace",
                "profile": {"real_name": "Ada L.", "display_name": "ada"}
            }
        }))
        .unwrap();
        assert_eq!(profile.real_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.display_name.as_deref(), Some("ada"));
    }

    #[test]
    fn user_info_falls_back_to_profile_fields() {
        let profile = parse_user_info(json!({
            "ok": true,
            "user": {"id": "U1", "real_name": "", "profile": {"display_name": "gracie"}}
        }))
        .unwrap();
        assert_eq!(profile.real_name, None);
        assert_eq!(profile.best_name(&UserId("U1".to_string())), "gracie");

        let bare = parse_user_info(json!({"ok": true, "user": {"id": "U2"}})).unwrap();
        assert_eq!(bare.best_name(&UserId("U2".to_string())), "U2");
    }

    #[test]
    fn client_trims_trailing_slash_from_base() {
        let c = SlackClient::new("xoxb", "http://localhost:9999/api/", Duration::from_secs(1))
            .unwrap();
        assert_eq!(c.api_base, "http://localhost:9999/api");
    }
}
