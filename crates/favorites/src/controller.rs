//! Per-listing favorite state bound to one rendered favorite button.
//!
//! The controller keeps a boolean view of server truth fresh (mount, sign-in,
//! periodic refresh, visibility) and runs user toggles optimistically. Writes
//! are serialized by the `is_loading` gate. Unmount and sign-out start a new
//! generation; results from an older generation release the gate but never
//! touch the visible state.

use autotrader_core::favorites::FAVORITE_ANIMATION_MS;
use autotrader_core::session::SessionProvider;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::FavoritesConfig;
use crate::error::FavoritesError;
use crate::navigation::{sign_in_url, SignInNavigator};
use crate::pending::PendingActionStore;
use crate::service::FavoritesServiceTrait;

/// Called with the new favorite flag on every optimistic flip or rollback.
pub type ToggleCallback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoritePhase {
    /// No check has completed; the caller's hint is shown.
    Unknown,
    Checking,
    Favorited,
    NotFavorited,
    /// A write is in flight.
    Toggling,
}

impl FavoritePhase {
    fn settled(is_favorite: bool) -> Self {
        if is_favorite {
            Self::Favorited
        } else {
            Self::NotFavorited
        }
    }
}

/// Snapshot for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteView {
    pub phase: FavoritePhase,
    pub is_favorite: bool,
    pub is_loading: bool,
    pub is_animating: bool,
}

#[derive(Debug)]
pub enum ToggleOutcome {
    /// Signed out; the user was sent to this sign-in URL.
    Redirected(String),
    /// The write went through; holds the new state.
    Toggled(bool),
    /// No listing, unmounted, or a write already in flight.
    Ignored,
    /// The write failed and the optimistic flip was rolled back.
    Failed(FavoritesError),
}

#[derive(Clone)]
pub struct ControllerOptions {
    /// State shown before the first check and after sign-out.
    pub default_favorite: bool,
    pub sign_in_path: String,
    pub refresh_interval: Duration,
    pub on_toggle: Option<ToggleCallback>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from_config(&FavoritesConfig::default())
    }
}

impl ControllerOptions {
    pub fn from_config(config: &FavoritesConfig) -> Self {
        Self {
            default_favorite: false,
            sign_in_path: config.sign_in_path.clone(),
            refresh_interval: config.refresh_interval,
            on_toggle: None,
        }
    }

    pub fn with_default_favorite(mut self, default_favorite: bool) -> Self {
        self.default_favorite = default_favorite;
        self
    }

    pub fn with_on_toggle(mut self, callback: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_toggle = Some(Arc::new(callback));
        self
    }
}

#[derive(Debug)]
struct ControllerState {
    phase: FavoritePhase,
    is_favorite: bool,
    is_loading: bool,
    checked: bool,
    had_session: bool,
    animating_until: Option<Instant>,
    generation: u64,
}

struct ControllerInner {
    listing_id: Option<String>,
    service: Arc<dyn FavoritesServiceTrait>,
    sessions: Arc<dyn SessionProvider>,
    pending: PendingActionStore,
    navigator: Arc<dyn SignInNavigator>,
    options: ControllerOptions,
    state: Mutex<ControllerState>,
    mounted: AtomicBool,
}

pub struct FavoriteController {
    inner: Arc<ControllerInner>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl FavoriteController {
    pub fn new(
        listing_id: Option<&str>,
        service: Arc<dyn FavoritesServiceTrait>,
        sessions: Arc<dyn SessionProvider>,
        pending: PendingActionStore,
        navigator: Arc<dyn SignInNavigator>,
        options: ControllerOptions,
    ) -> Self {
        let listing_id = listing_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        let state = ControllerState {
            phase: FavoritePhase::Unknown,
            is_favorite: options.default_favorite,
            is_loading: false,
            checked: false,
            had_session: false,
            animating_until: None,
            generation: 0,
        };

        Self {
            inner: Arc::new(ControllerInner {
                listing_id,
                service,
                sessions,
                pending,
                navigator,
                options,
                state: Mutex::new(state),
                mounted: AtomicBool::new(false),
            }),
            refresh_task: Mutex::new(None),
        }
    }

    pub fn listing_id(&self) -> Option<&str> {
        self.inner.listing_id.as_deref()
    }

    pub fn view(&self) -> FavoriteView {
        let state = self.inner.lock_state();
        FavoriteView {
            phase: state.phase,
            is_favorite: state.is_favorite,
            is_loading: state.is_loading,
            is_animating: state
                .animating_until
                .is_some_and(|until| Instant::now() < until),
        }
    }

    /// Attach the controller. With a listing and a session this checks
    /// status, replays a matching pending intent and starts the refresh timer.
    pub async fn mount(&self) {
        self.inner.mounted.store(true, Ordering::SeqCst);
        let has_session = self.inner.has_session();
        self.inner.lock_state().had_session = has_session;

        if self.inner.listing_id.is_none() || !has_session {
            return;
        }
        self.start_refresh_timer();
        self.inner.check_status(true).await;
        self.inner.replay_pending().await;
    }

    /// Detach. Timers stop and results arriving later are discarded.
    pub fn unmount(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
        self.inner.lock_state().generation += 1;
        self.stop_refresh_timer();
    }

    /// Re-read the session provider and react to sign-in or sign-out.
    pub async fn on_session_changed(&self) {
        if !self.inner.is_mounted() {
            return;
        }
        let has_session = self.inner.has_session();
        let had_session = {
            let mut state = self.inner.lock_state();
            std::mem::replace(&mut state.had_session, has_session)
        };

        match (had_session, has_session) {
            (false, true) => {
                if self.inner.listing_id.is_none() {
                    return;
                }
                debug!(
                    "[Favorites] Session available for listing {:?}",
                    self.inner.listing_id
                );
                self.start_refresh_timer();
                self.inner.check_status(true).await;
                self.inner.replay_pending().await;
            }
            (true, false) => {
                self.stop_refresh_timer();
                let mut state = self.inner.lock_state();
                state.generation += 1;
                state.is_favorite = self.inner.options.default_favorite;
                state.phase = FavoritePhase::Unknown;
                state.checked = false;
            }
            _ => {}
        }
    }

    pub async fn on_visibility_changed(&self, visibility: Visibility) {
        if visibility == Visibility::Visible && self.inner.has_session() {
            self.inner.check_status(true).await;
        }
    }

    /// Refresh from the server. Skipped while a write is in flight, and when
    /// a check already completed unless `force` is set.
    pub async fn check_status(&self, force: bool) {
        self.inner.check_status(force).await;
    }

    /// Handle a click on the favorite button.
    pub async fn toggle(&self) -> ToggleOutcome {
        let inner = &self.inner;
        let Some(listing_id) = inner.listing_id.as_deref() else {
            return ToggleOutcome::Ignored;
        };
        if !inner.is_mounted() {
            return ToggleOutcome::Ignored;
        }

        if !inner.has_session() {
            let currently_favorite = inner.lock_state().is_favorite;
            if !currently_favorite {
                inner.pending.store(listing_id);
            }
            let url = sign_in_url(
                &inner.options.sign_in_path,
                &inner.navigator.current_url(),
                listing_id,
            );
            info!("[Favorites] Redirecting to sign-in for listing {}", listing_id);
            inner.navigator.navigate(&url);
            return ToggleOutcome::Redirected(url);
        }

        let target = {
            let mut state = inner.lock_state();
            if state.is_loading {
                debug!("[Favorites] Toggle ignored, write in flight for {}", listing_id);
                return ToggleOutcome::Ignored;
            }
            !state.is_favorite
        };
        inner.run_write(listing_id, target).await
    }

    fn start_refresh_timer(&self) {
        let mut slot = self
            .refresh_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.as_ref() {
            if !handle.is_finished() {
                return;
            }
            slot.take();
        }

        let inner = Arc::clone(&self.inner);
        let period = inner.options.refresh_interval;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if !inner.is_mounted() || !inner.has_session() {
                    break;
                }
                inner.check_status(true).await;
            }
        });
        *slot = Some(handle);
    }

    fn stop_refresh_timer(&self) {
        let mut slot = self
            .refresh_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl Drop for FavoriteController {
    fn drop(&mut self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
        self.stop_refresh_timer();
    }
}

impl ControllerInner {
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn has_session(&self) -> bool {
        self.sessions.usable_session().is_some()
    }

    /// Apply `update` only while mounted and still in `generation`.
    fn apply_current(&self, generation: u64, update: impl FnOnce(&mut ControllerState)) -> bool {
        let mut state = self.lock_state();
        if !self.is_mounted() || state.generation != generation {
            return false;
        }
        update(&mut state);
        true
    }

    fn notify(&self, is_favorite: bool) {
        if let Some(callback) = self.options.on_toggle.as_ref() {
            callback(is_favorite);
        }
    }

    async fn check_status(&self, force: bool) {
        let Some(listing_id) = self.listing_id.as_deref() else {
            return;
        };
        if !self.is_mounted() || !self.has_session() {
            return;
        }
        let generation = {
            let mut state = self.lock_state();
            if state.is_loading || (state.checked && !force) {
                return;
            }
            state.phase = FavoritePhase::Checking;
            state.generation
        };

        let status = self.service.is_favorited(listing_id).await;

        self.apply_current(generation, |state| {
            if state.is_loading {
                return;
            }
            state.is_favorite = status.is_favorite;
            state.phase = FavoritePhase::settled(status.is_favorite);
            state.checked = true;
        });
    }

    /// Replay an intent captured while signed out, if it belongs here.
    async fn replay_pending(&self) {
        let Some(listing_id) = self.listing_id.as_deref() else {
            return;
        };
        if !self.has_session() || self.lock_state().is_loading {
            return;
        }
        let Some(action) = self.pending.drain(listing_id) else {
            return;
        };

        info!("[Favorites] Replaying pending favorite for {}", action.listing_id);
        if let ToggleOutcome::Failed(err) = self.run_write(listing_id, true).await {
            warn!(
                "[Favorites] Pending favorite for {} could not be applied: {}",
                listing_id, err
            );
        }
    }

    /// Optimistically show `target`, write it, and roll back on failure.
    async fn run_write(&self, listing_id: &str, target: bool) -> ToggleOutcome {
        let (previous, generation) = {
            let mut state = self.lock_state();
            if state.is_loading {
                return ToggleOutcome::Ignored;
            }
            let previous = state.is_favorite;
            state.is_loading = true;
            state.phase = FavoritePhase::Toggling;
            state.is_favorite = target;
            state.animating_until =
                Some(Instant::now() + Duration::from_millis(FAVORITE_ANIMATION_MS));
            (previous, state.generation)
        };
        self.notify(target);

        let result = if target {
            self.service.add_to_favorites(listing_id).await
        } else {
            self.service.remove_from_favorites(listing_id).await
        };

        let settled = if result.is_ok() { target } else { previous };
        let current = {
            let mut state = self.lock_state();
            state.is_loading = false;
            let current = self.is_mounted() && state.generation == generation;
            if current {
                state.is_favorite = settled;
                state.phase = FavoritePhase::settled(settled);
                state.checked = result.is_ok();
            } else if state.phase == FavoritePhase::Toggling {
                state.phase = FavoritePhase::Unknown;
                state.checked = false;
            }
            current
        };

        if let Err(err) = &result {
            warn!(
                "[Favorites] Toggle for {} failed ({}): {}",
                listing_id,
                err.code(),
                err
            );
            if current {
                self.notify(previous);
            }
        }
        if !current {
            debug!("[Favorites] Write for {} finished in a stale session", listing_id);
        }
        if !current || result.is_err() {
            self.check_status(true).await;
        }

        match result {
            Ok(()) => ToggleOutcome::Toggled(target),
            Err(err) => ToggleOutcome::Failed(err),
        }
    }
}
