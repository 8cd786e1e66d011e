//! Fetch/retry/fallback orchestration for the presence widget.
//!
//! A fetch cycle makes up to `max_attempts` network attempts. Failed attempts
//! back off linearly (`retry_delay × attempt`) and rotate to the next proxy
//! mirror, except after the first attempt: the first retry reuses the
//! original mirror once. When every attempt fails the cycle renders the last
//! cached payload, or the static placeholder when nothing was ever cached,
//! so the view is never left empty.
//!
//! All timers and in-flight requests hang off one shutdown
//! [`CancellationToken`]; [`LiveDataSync::stop`] cancels everything.
//! Going offline cancels a child token so the in-flight attempt is abandoned
//! and its outcome discarded.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{decode_payload, FetchError, HttpClient};
use crate::cache::{CacheEntry, PersistentCache};
use crate::config::SyncConfig;
use crate::models::PresencePayload;
use crate::render::{self, Renderer, MSG_CACHED_AFTER_FAILURE, MSG_LIVE, MSG_OFFLINE};

use super::{Clock, ConnectionStatus, SyncState};

/// External collaborators, passed in by the application bootstrap.
#[derive(Clone)]
pub struct Collaborators {
    pub http: Arc<dyn HttpClient>,
    pub cache: Arc<dyn PersistentCache>,
    pub renderer: Arc<dyn Renderer>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The network was reported unreachable; no attempt was made.
    Offline,
    /// The cached payload is still inside the freshness window.
    CacheFresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackSource {
    Cache,
    Placeholder,
}

/// How a fetch cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Skipped(SkipReason),
    Live { attempts: u32 },
    /// Every attempt failed; the view shows `fallback`.
    Exhausted { fallback: FallbackSource },
    /// Cancelled by `stop()` or an offline event; nothing was rendered.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HostSignals {
    visible: bool,
    online: bool,
}

enum Attempt {
    Fetched(PresencePayload),
    CacheFresh,
}

struct Inner {
    config: SyncConfig,
    http: Arc<dyn HttpClient>,
    cache: Arc<dyn PersistentCache>,
    renderer: Arc<dyn Renderer>,
    clock: Arc<dyn Clock>,
    /// Also serializes commits: cache write, state update and render happen
    /// under this lock so a view never mixes two payloads.
    state: Mutex<SyncState>,
    signals: watch::Sender<HostSignals>,
    shutdown: CancellationToken,
    connectivity: Mutex<CancellationToken>,
}

/// Live presence synchronization component.
///
/// Clone is cheap and every clone drives the same component. Must be used
/// from within a tokio runtime.
#[derive(Clone)]
pub struct LiveDataSync {
    inner: Arc<Inner>,
}

impl LiveDataSync {
    pub fn new(config: SyncConfig, collaborators: Collaborators) -> Self {
        let shutdown = CancellationToken::new();
        let connectivity = shutdown.child_token();
        let (signals, _) = watch::channel(HostSignals {
            visible: true,
            online: true,
        });

        Self {
            inner: Arc::new(Inner {
                config,
                http: collaborators.http,
                cache: collaborators.cache,
                renderer: collaborators.renderer,
                clock: collaborators.clock,
                state: Mutex::new(SyncState::default()),
                signals,
                shutdown,
                connectivity: Mutex::new(connectivity),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Render any usable cached payload, then schedule the initial fetch and
    /// start periodic refresh.
    pub fn start(&self) {
        if self.inner.shutdown.is_cancelled() {
            warn!("Presence sync already stopped, not starting");
            return;
        }

        let now = self.inner.clock.now();
        if let Some(entry) = self.load_cache() {
            if entry.is_usable_fallback(now, self.inner.config.freshness_window) {
                render::render_payload(self.renderer(), &entry.payload, true, entry.stored_at);
                info!(age = %entry.age_display(now), "Loaded cached presence data");
            } else {
                debug!(age = %entry.age_display(now), "Cached presence data too old to show");
            }
        }

        let initial = self.clone();
        let delay = self.inner.config.initial_fetch_delay;
        self.spawn_guarded("initial fetch", async move {
            time::sleep(delay).await;
            initial.fetch(false).await;
        });

        let periodic = self.clone();
        self.spawn_guarded("periodic refresh", async move {
            periodic.run_periodic().await;
        });
    }

    /// User-triggered refresh: reset retry and proxy state, then fetch
    /// bypassing the freshness check.
    pub async fn refresh_now(&self) -> FetchOutcome {
        info!("Manual refresh triggered");
        self.state().reset_retry();
        self.fetch(true).await
    }

    /// Cancel all timers and in-flight requests. Idempotent.
    pub fn stop(&self) {
        if !self.inner.shutdown.is_cancelled() {
            info!("Stopping presence sync");
        }
        self.inner.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn snapshot(&self) -> SyncState {
        self.state().clone()
    }

    /// Visibility signal from the host. Becoming visible fetches immediately;
    /// either transition switches the refresh cadence.
    pub fn set_visible(&self, visible: bool) {
        let mut became_visible = false;
        let changed = self.inner.signals.send_if_modified(|signals| {
            if signals.visible == visible {
                return false;
            }
            became_visible = visible;
            signals.visible = visible;
            true
        });
        if !changed {
            return;
        }

        if became_visible {
            info!("Became visible, refreshing presence");
            let sync = self.clone();
            self.spawn_guarded("visibility fetch", async move {
                sync.fetch(true).await;
            });
        } else {
            debug!("Hidden, slowing refresh cadence");
        }
    }

    /// Connectivity signal from the host.
    pub fn set_online(&self, online: bool) {
        let changed = self.inner.signals.send_if_modified(|signals| {
            if signals.online == online {
                return false;
            }
            signals.online = online;
            true
        });
        if !changed {
            return;
        }

        if online {
            info!("Network connection restored");
            {
                let mut state = self.state();
                state.consecutive_failures = 0;
                state.connection_status = ConnectionStatus::Connecting;
            }
            let sync = self.clone();
            self.spawn_guarded("reconnect fetch", async move {
                sync.fetch(false).await;
            });
        } else {
            info!("Network connection lost");
            {
                let mut token = self.connectivity();
                token.cancel();
                *token = self.inner.shutdown.child_token();
            }
            let mut state = self.state();
            state.connection_status = ConnectionStatus::Offline;
            self.renderer().render_connection_status(false, MSG_OFFLINE);
        }
    }

    /// Run one fetch cycle with the current retry and proxy state.
    pub async fn fetch(&self, skip_cache: bool) -> FetchOutcome {
        let cancel = self.connectivity().clone();
        if cancel.is_cancelled() {
            return FetchOutcome::Abandoned;
        }

        let max_attempts = self.inner.config.max_attempts;
        let mut attempt = 1;
        loop {
            let proxy_index = self.state().active_proxy_index;
            match self.fetch_once(attempt, skip_cache, &cancel).await {
                Ok(Attempt::CacheFresh) => {
                    debug!("Using cached presence data (still fresh)");
                    return FetchOutcome::Skipped(SkipReason::CacheFresh);
                }
                Ok(Attempt::Fetched(payload)) => {
                    return self.commit_success(payload, attempt, &cancel);
                }
                Err(e) if !e.counts_as_attempt() => {
                    debug!(attempt, reason = %e, "Presence fetch ended without an attempt");
                    return match e {
                        FetchError::NetworkUnavailable => FetchOutcome::Skipped(SkipReason::Offline),
                        _ => FetchOutcome::Abandoned,
                    };
                }
                Err(e) => {
                    let failures = {
                        let mut state = self.state();
                        state.consecutive_failures += 1;
                        state.consecutive_failures
                    };
                    warn!(
                        attempt,
                        proxy = %self.inner.config.proxies.get(proxy_index),
                        failures,
                        error = %e,
                        "Presence fetch attempt failed"
                    );

                    if attempt >= max_attempts {
                        warn!(attempts = attempt, "All proxy attempts failed, falling back");
                        return self.commit_failure(&cancel);
                    }

                    if attempt > 1 {
                        self.rotate_proxy();
                    }

                    let delay = self.inner.config.retry_delay * attempt;
                    info!(
                        delay_ms = delay.as_millis() as u64,
                        proxy = %self.inner.config.proxies.get(self.state().active_proxy_index),
                        "Retrying presence fetch"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return FetchOutcome::Abandoned,
                        _ = time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// A single network attempt against the active proxy.
    async fn fetch_once(
        &self,
        attempt: u32,
        skip_cache: bool,
        cancel: &CancellationToken,
    ) -> Result<Attempt, FetchError> {
        if !self.is_online() {
            return Err(FetchError::NetworkUnavailable);
        }

        if !skip_cache && self.cache_is_fresh() {
            return Ok(Attempt::CacheFresh);
        }

        let proxy_index = {
            let mut state = self.state();
            state.connection_status = ConnectionStatus::Connecting;
            state.active_proxy_index
        };
        self.renderer().render_loading_placeholder();

        let route = self.inner.config.proxies.get(proxy_index);
        let url = route.url_for(&self.inner.config.endpoint);
        let timeout = self.inner.config.request_timeout;
        debug!(attempt, proxy = %route, "Fetching presence widget");

        let request = time::timeout(timeout, self.inner.http.get(&url, timeout));
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = request => result.map_err(|_| FetchError::Timeout(timeout))??,
        };

        if !response.is_success() {
            return Err(FetchError::from_status(response.status, &response.body));
        }

        decode_payload(&response.body).map(Attempt::Fetched)
    }

    fn commit_success(
        &self,
        payload: PresencePayload,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let mut state = self.state();
        if cancel.is_cancelled() {
            return FetchOutcome::Abandoned;
        }

        let now = self.inner.clock.now();
        // Synchronous write under the state lock: cache and view must commit
        // in the same order. A single small JSON file keeps this short.
        if let Err(e) = self.inner.cache.set(&self.inner.config.cache_key, &payload, now) {
            warn!(error = %e, "Failed to save presence cache");
        }

        state.consecutive_failures = 0;
        state.connection_status = ConnectionStatus::Connected;
        state.last_success_at = Some(now);

        render::render_payload(self.renderer(), &payload, false, now);
        self.renderer().render_connection_status(true, MSG_LIVE);

        info!(
            online = payload.presence_count,
            members = payload.members.len(),
            attempts,
            "Live presence data updated"
        );
        FetchOutcome::Live { attempts }
    }

    fn commit_failure(&self, cancel: &CancellationToken) -> FetchOutcome {
        let mut state = self.state();
        if cancel.is_cancelled() {
            return FetchOutcome::Abandoned;
        }
        state.connection_status = ConnectionStatus::Failed;

        match self.load_cache() {
            Some(entry) => {
                render::render_payload(self.renderer(), &entry.payload, true, entry.stored_at);
                self.renderer().render_connection_status(false, MSG_CACHED_AFTER_FAILURE);
                FetchOutcome::Exhausted {
                    fallback: FallbackSource::Cache,
                }
            }
            None => {
                render::render_fallback(self.renderer());
                FetchOutcome::Exhausted {
                    fallback: FallbackSource::Placeholder,
                }
            }
        }
    }

    async fn run_periodic(&self) {
        let mut signals = self.inner.signals.subscribe();
        loop {
            let visible = signals.borrow_and_update().visible;
            let period = if visible {
                self.inner.config.visible_interval
            } else {
                self.inner.config.hidden_interval
            };
            info!(
                interval_ms = period.as_millis() as u64,
                mode = if visible { "fast" } else { "slow" },
                "Auto-refresh cadence set"
            );

            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.inner.shutdown.cancelled() => return,
                    changed = signals.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let now_visible = signals.borrow().visible;
                        if now_visible != visible {
                            break;
                        }
                    }
                    _ = ticker.tick() => self.on_tick(),
                }
            }
        }
    }

    fn on_tick(&self) {
        if !self.is_online() {
            debug!("Periodic refresh skipped while offline");
            return;
        }

        let skip_cache = self.state().consecutive_failures > 0 || self.cached_data_is_stale();
        let sync = self.clone();
        self.spawn_guarded("periodic fetch", async move {
            sync.fetch(skip_cache).await;
        });
    }

    fn rotate_proxy(&self) {
        let mut state = self.state();
        state.active_proxy_index = self.inner.config.proxies.next_index(state.active_proxy_index);
        debug!(
            proxy = %self.inner.config.proxies.get(state.active_proxy_index),
            "Switching to next proxy"
        );
    }

    /// Spawn a task that ends on shutdown. Panics are logged and swallowed so
    /// one failed task never takes the host down.
    fn spawn_guarded<F>(&self, task: &'static str, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = self.inner.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => debug!(task, "Task cancelled"),
                result = AssertUnwindSafe(work).catch_unwind() => {
                    if result.is_err() {
                        error!(task, "Presence sync task panicked");
                    }
                }
            }
        });
    }

    fn load_cache(&self) -> Option<CacheEntry<PresencePayload>> {
        match self.inner.cache.get(&self.inner.config.cache_key) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Failed to load presence cache");
                None
            }
        }
    }

    fn cache_is_fresh(&self) -> bool {
        let now = self.inner.clock.now();
        self.load_cache()
            .map(|entry| entry.is_fresh(now, self.inner.config.freshness_window))
            .unwrap_or(false)
    }

    fn cached_data_is_stale(&self) -> bool {
        let now = self.inner.clock.now();
        self.load_cache()
            .map(|entry| entry.age(now) > self.inner.config.stale_after())
            .unwrap_or(false)
    }

    fn is_online(&self) -> bool {
        self.inner.signals.borrow().online
    }

    fn renderer(&self) -> &dyn Renderer {
        self.inner.renderer.as_ref()
    }

    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn connectivity(&self) -> MutexGuard<'_, CancellationToken> {
        self.inner.connectivity.lock().unwrap_or_else(|e| e.into_inner())
    }
}
