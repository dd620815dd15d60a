//! Persisted watcher state.
//!
//! Three independent JSON records live in the state directory:
//! - `presence_state.json`: last observed presence
//! - `keepalive_state.json`: epoch seconds of the last delivered notification
//! - `user_profile.json`: cached display name, keyed by user id
//!
//! Reads never fail: a missing, empty, or unparsable record is the default.
//! Writes replace the whole file atomically (temp file + rename).

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{domain::UserId, Result};

pub const PRESENCE_FILE: &str = "presence_state.json";
pub const KEEPALIVE_FILE: &str = "keepalive_state.json";
pub const PROFILE_FILE: &str = "user_profile.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceState {
    /// `None` means "never observed".
    pub state: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepAliveState {
    pub last_sent_ts: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCache {
    pub user_id: String,
    pub name: String,
}

impl ProfileCache {
    /// Cached name, only if it belongs to `user`.
    pub fn name_for(&self, user: &UserId) -> Option<&str> {
        if self.user_id == user.0 && !self.name.trim().is_empty() {
            Some(&self.name)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn presence_path(&self) -> PathBuf {
        self.dir.join(PRESENCE_FILE)
    }

    pub fn keepalive_path(&self) -> PathBuf {
        self.dir.join(KEEPALIVE_FILE)
    }

    pub fn profile_path(&self) -> PathBuf {
        self.dir.join(PROFILE_FILE)
    }

    pub fn load_presence(&self) -> PresenceState {
        let path = self.presence_path();
        let Some(txt) = read_text(&path) else {
            return PresenceState::default();
        };
        match serde_json::from_str::<PresenceState>(&txt) {
            Ok(v) => v,
            // Older runs stored the bare presence string.
            Err(_) if !txt.trim_start().starts_with('{') => PresenceState {
                state: Some(txt.trim().to_string()),
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable presence state, starting fresh");
                PresenceState::default()
            }
        }
    }

    pub fn save_presence(&self, state: &PresenceState) -> Result<()> {
        write_json(&self.presence_path(), state)
    }

    pub fn load_keepalive(&self) -> KeepAliveState {
        load_json(&self.keepalive_path()).unwrap_or_default()
    }

    pub fn save_keepalive(&self, state: &KeepAliveState) -> Result<()> {
        write_json(&self.keepalive_path(), state)
    }

    pub fn load_profile(&self) -> Option<ProfileCache> {
        load_json(&self.profile_path())
    }

    pub fn save_profile(&self, profile: &ProfileCache) -> Result<()> {
        write_json(&self.profile_path(), profile)
    }
}

fn read_text(path: &Path) -> Option<String> {
    let txt = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read state file");
            return None;
        }
    };
    if txt.trim().is_empty() {
        return None;
    }
    Some(txt)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let txt = read_text(path)?;
    match serde_json::from_str(&txt) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unparsable state file, ignoring");
            None
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let txt = serde_json::to_string(value)?;
    atomic_write(path, &txt)
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        assert_eq!(store.load_presence(), PresenceState::default());
        assert_eq!(store.load_keepalive(), KeepAliveState::default());
        assert!(store.load_profile().is_none());
    }

    #[test]
    fn records_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        store
            .save_presence(&PresenceState {
                state: Some("away".to_string()),
            })
            .unwrap();
        store
            .save_keepalive(&KeepAliveState {
                last_sent_ts: Some(1_700_000_000),
            })
            .unwrap();

        let reopened = StateStore::new(dir.path());
        assert_eq!(reopened.load_presence().state.as_deref(), Some("away"));
        assert_eq!(reopened.load_keepalive().last_sent_ts, Some(1_700_000_000));

        let on_disk = std::fs::read_to_string(reopened.presence_path()).unwrap();
        assert_eq!(on_disk, r#"{"state":"away"}"#);
    }

    #[test]
    fn corrupt_records_fail_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        std::fs::write(store.presence_path(), "{not json").unwrap();
        std::fs::write(store.keepalive_path(), "[1,2").unwrap();
        std::fs::write(store.profile_path(), "   ").unwrap();

        assert_eq!(store.load_presence(), PresenceState::default());
        assert_eq!(store.load_keepalive(), KeepAliveState::default());
        assert!(store.load_profile().is_none());
    }

    #[test]
    fn bare_text_presence_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        std::fs::write(store.presence_path(), "active\n").unwrap();

        assert_eq!(store.load_presence().state.as_deref(), Some("active"));
    }

    #[test]
    fn profile_cache_is_keyed_by_user() {
        let cache = ProfileCache {
            user_id: "U1".to_string(),
            name: "Ada Lovelace".to_string(),
        };
        assert_eq!(cache.name_for(&UserId("U1".to_string())), Some("Ada Lovelace"));
        assert_eq!(cache.name_for(&UserId("U2".to_string())), None);
    }

    #[test]
    fn save_creates_missing_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested/state"));
        store
            .save_profile(&ProfileCache {
                user_id: "U1".to_string(),
                name: "Ada".to_string(),
            })
            .unwrap();
        assert_eq!(store.load_profile().unwrap().name, "Ada");
    }
}
