use crate::{
    domain::UserId,
    ports::ProfileLookup,
    state::{ProfileCache, StateStore},
};

/// Resolve the watched user's display name.
///
/// Uses the on-disk cache when it belongs to `user`; otherwise asks the lookup
/// API once and caches the result. Lookup failures fall back to the raw id.
pub async fn resolve_display_name(
    store: &StateStore,
    lookup: &dyn ProfileLookup,
    user: &UserId,
) -> String {
    if let Some(cached) = store.load_profile() {
        if let Some(name) = cached.name_for(user) {
            tracing::debug!(user = %user, name, "display name from cache");
            return name.to_string();
        }
        tracing::info!(cached_user = %cached.user_id, user = %user, "profile cache is for another user, refreshing");
    }

    let name = match lookup.profile(user).await {
        Ok(profile) => profile.best_name(user),
        Err(e) => {
            tracing::warn!(user = %user, error = %e, "profile lookup failed, using raw id");
            return user.0.clone();
        }
    };

    let entry = ProfileCache {
        user_id: user.0.clone(),
        name: name.clone(),
    };
    if let Err(e) = store.save_profile(&entry) {
        tracing::warn!(error = %e, "failed to persist profile cache");
    }

    tracing::info!(user = %user, name = %name, "resolved display name");
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ports::UserProfile, Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeLookup {
        profile: Option<UserProfile>,
        calls: AtomicUsize,
    }

    impl FakeLookup {
        fn ok(real_name: Option<&str>, display_name: Option<&str>) -> Self {
            Self {
                profile: Some(UserProfile {
                    real_name: real_name.map(str::to_string),
                    display_name: display_name.map(str::to_string),
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                profile: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileLookup for FakeLookup {
        async fn profile(&self, _user: &UserId) -> Result<UserProfile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.profile.clone().ok_or_else(|| Error::Api {
                api: "users.info",
                code: "user_not_found".to_string(),
            })
        }
    }

    fn user(id: &str) -> UserId {
        UserId(id.to_string())
    }

    #[tokio::test]
    async fn lookup_result_is_cached_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let lookup = FakeLookup::ok(Some("Ada Lovelace"), Some("ada"));

        let first = resolve_display_name(&store, &lookup, &user("U1")).await;
        let second = resolve_display_name(&store, &lookup, &user("U1")).await;

        assert_eq!(first, "Ada Lovelace");
        assert_eq!(second, "Ada Lovelace");
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn cache_for_another_user_forces_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store
            .save_profile(&ProfileCache {
                user_id: "U1".to_string(),
                name: "Ada".to_string(),
            })
            .unwrap();
        let lookup = FakeLookup::ok(Some("Grace Hopper"), None);

        let name = resolve_display_name(&store, &lookup, &user("U2")).await;

        assert_eq!(name, "Grace Hopper");
        assert_eq!(lookup.calls(), 1);
        assert_eq!(store.load_profile().unwrap().user_id, "U2");
    }

    #[tokio::test]
    async fn name_falls_back_through_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        let lookup = FakeLookup::ok(Some("  "), Some("gracie"));
        assert_eq!(resolve_display_name(&store, &lookup, &user("U7")).await, "gracie");

        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let lookup = FakeLookup::ok(None, None);
        assert_eq!(resolve_display_name(&store, &lookup, &user("U8")).await, "U8");
    }

    #[tokio::test]
    async fn lookup_failure_returns_raw_id_without_caching() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let lookup = FakeLookup::failing();

        let name = resolve_display_name(&store, &lookup, &user("U9")).await;

        assert_eq!(name, "U9");
        assert!(store.load_profile().is_none());
    }
}
