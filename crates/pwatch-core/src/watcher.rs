//! The polling loop: query presence, diff against persisted state, notify.
//!
//! Transition detection is at-most-once: a changed presence value is persisted
//! even when delivery fails, so a throttled send never re-triggers the same
//! transition. `last_sent_ts` only moves on successful delivery, which is what
//! makes heartbeats retry.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    domain::{Presence, UserId},
    formatting::{MessageRenderer, NoticeKind},
    messaging::{
        dispatch::{Dispatcher, PatternThrottleDetector},
        port::MessagingPort,
    },
    ports::{PresenceSource, ProfileLookup},
    profile::resolve_display_name,
    state::{KeepAliveState, PresenceState, StateStore},
    timer::{Delay, Timer},
    Result,
};

/// What one iteration did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Presence query failed; nothing was touched.
    QueryFailed,
    /// Value differed from the persisted one.
    Transition { kind: NoticeKind, delivered: bool },
    /// Value unchanged and the keep-alive deadline had passed.
    Heartbeat { delivered: bool },
    /// Value unchanged, keep-alive not due.
    Unchanged,
}

impl TickOutcome {
    pub fn next_delay(&self) -> Delay {
        match self {
            TickOutcome::QueryFailed => Delay::QueryCooldown,
            _ => Delay::Poll,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Intervals {
    poll: Duration,
    keepalive: Duration,
    query_error_cooldown: Duration,
}

pub struct PresenceWatcher {
    user: UserId,
    source: Arc<dyn PresenceSource>,
    dispatcher: Dispatcher,
    store: StateStore,
    renderer: MessageRenderer,
    timer: Arc<dyn Timer>,
    intervals: Intervals,

    presence: PresenceState,
    keepalive: KeepAliveState,
}

impl PresenceWatcher {
    /// Assemble a watcher from already-built parts; loads persisted state once.
    pub fn new(
        cfg: &Config,
        source: Arc<dyn PresenceSource>,
        dispatcher: Dispatcher,
        timer: Arc<dyn Timer>,
        display_name: impl Into<String>,
    ) -> Self {
        let store = StateStore::new(&cfg.state_dir);
        let presence = store.load_presence();
        let keepalive = store.load_keepalive();

        Self {
            user: cfg.target_user.clone(),
            source,
            dispatcher,
            store,
            renderer: MessageRenderer::new(display_name, cfg.active_value.clone()),
            timer,
            intervals: Intervals {
                poll: cfg.poll_interval,
                keepalive: cfg.keepalive_interval,
                query_error_cooldown: cfg.query_error_cooldown,
            },
            presence,
            keepalive,
        }
    }

    /// Startup: resolve the display name and wire the dispatcher.
    ///
    /// Only an invalid throttle pattern can fail here; a failed profile lookup
    /// degrades to the raw user id.
    pub async fn start(
        cfg: &Config,
        source: Arc<dyn PresenceSource>,
        lookup: &dyn ProfileLookup,
        messenger: Arc<dyn MessagingPort>,
        timer: Arc<dyn Timer>,
    ) -> Result<Self> {
        let detector = PatternThrottleDetector::new(cfg.throttle_status, &cfg.throttle_pattern)?;
        let dispatcher = Dispatcher::new(
            messenger,
            cfg.recipients.clone(),
            Arc::new(detector),
            timer.clone(),
            cfg.throttle_cooldown,
        );

        let store = StateStore::new(&cfg.state_dir);
        let name = resolve_display_name(&store, lookup, &cfg.target_user).await;

        Ok(Self::new(cfg, source, dispatcher, timer, name))
    }

    pub fn display_name(&self) -> &str {
        self.renderer.name()
    }

    pub fn keepalive_state(&self) -> &KeepAliveState {
        &self.keepalive
    }

    /// Poll until `cancel` fires. In-flight work is abandoned on cancellation.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!(
            user = %self.user,
            name = %self.renderer.name(),
            recipients = self.dispatcher.recipients().len(),
            poll_secs = self.intervals.poll.as_secs(),
            keepalive_secs = self.intervals.keepalive.as_secs(),
            "presence watcher started"
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.tick(Local::now()) => outcome,
            };

            let delay = outcome.next_delay();
            let Some(dur) = self.duration_for(delay) else {
                continue;
            };
            let timer = self.timer.clone();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.sleep(delay, dur) => {}
            }
        }

        tracing::info!("presence watcher stopped");
    }

    /// Loop-level delays only; throttle cooldowns are slept inside the dispatcher.
    fn duration_for(&self, delay: Delay) -> Option<Duration> {
        match delay {
            Delay::Poll => Some(self.intervals.poll),
            Delay::QueryCooldown => Some(self.intervals.query_error_cooldown),
            Delay::ThrottleCooldown => None,
        }
    }

    /// One iteration. `now` is used both for display and keep-alive arithmetic.
    pub async fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        let current = match self.source.presence(&self.user).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(
                    user = %self.user,
                    error = %e,
                    cooldown_secs = self.intervals.query_error_cooldown.as_secs(),
                    "presence query failed"
                );
                return TickOutcome::QueryFailed;
            }
        };

        if self.presence.state.as_deref() == Some(current.as_str()) {
            return self.on_unchanged(&current, now).await;
        }

        self.on_transition(current, now).await
    }

    async fn on_transition(&mut self, current: Presence, now: DateTime<Local>) -> TickOutcome {
        let old = self.presence.state.clone();
        let kind = self.renderer.classify(old.as_deref(), &current);
        let text = self.renderer.transition(old.as_deref(), &current, &now);

        tracing::info!(
            old = old.as_deref().unwrap_or("<none>"),
            new = %current,
            ?kind,
            "presence change detected"
        );

        let delivered = self.dispatcher.dispatch(&text).await.is_ok();

        // Presence first: a restart must not re-send a delivered transition.
        self.presence = PresenceState {
            state: Some(current.0),
        };
        if let Err(e) = self.store.save_presence(&self.presence) {
            tracing::error!(error = %e, "failed to persist presence state");
        }

        if delivered {
            self.mark_sent(now);
        } else {
            tracing::warn!("transition notice not delivered; keep-alive timestamp unchanged");
        }

        TickOutcome::Transition { kind, delivered }
    }

    async fn on_unchanged(&mut self, current: &Presence, now: DateTime<Local>) -> TickOutcome {
        if !self.keepalive_due(now) {
            tracing::debug!(state = %current, "no change");
            return TickOutcome::Unchanged;
        }

        tracing::info!(state = %current, "keep-alive due, sending heartbeat");
        let text = self.renderer.heartbeat(current, &now);
        let delivered = self.dispatcher.dispatch(&text).await.is_ok();
        if delivered {
            self.mark_sent(now);
        } else {
            tracing::warn!("heartbeat not delivered, will retry next poll");
        }

        TickOutcome::Heartbeat { delivered }
    }

    fn keepalive_due(&self, now: DateTime<Local>) -> bool {
        let Some(last) = self.keepalive.last_sent_ts else {
            return true;
        };
        let elapsed = now.timestamp().saturating_sub(last);
        elapsed >= 0 && elapsed as u64 >= self.intervals.keepalive.as_secs()
    }

    fn mark_sent(&mut self, now: DateTime<Local>) {
        self.keepalive = KeepAliveState {
            last_sent_ts: Some(now.timestamp()),
        };
        if let Err(e) = self.store.save_keepalive(&self.keepalive) {
            tracing::error!(error = %e, "failed to persist keep-alive state");
        }
    }
}
