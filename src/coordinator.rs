//! Viewport change coordination
//!
//! Receives bounds/filter changes from the map, debounces bursts, skips fetches
//! the already-loaded data covers, and makes sure only the most recently issued
//! fetch can ever reach the sink.
//!
//! All mutable state lives behind one mutex owned by the coordinator. The
//! debounce timer and the in-flight fetch are spawned tasks; both re-check a
//! generation counter under that mutex before touching anything, so an aborted
//! timer or a superseded fetch that still completes is a no-op.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cancellation::CancellationToken;
use crate::config::ViewportConfig;
use crate::models::{Bounds, FilterSnapshot};
use crate::orchestrator::DataFetchOrchestrator;
use crate::repository::SpotPage;
use crate::{Result, SpotMapError};

/// Kind of device driving the map. Touch gestures emit longer event bursts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputProfile {
    #[default]
    Pointer,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The new viewport lies inside the last loaded one
    ZoomIn,
    /// The viewport moved less than the pan threshold
    BelowThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDecision {
    Skip(SkipReason),
    Fetch,
}

/// Debounce intervals and skip thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportSettings {
    pub pointer_debounce: Duration,
    pub touch_debounce: Duration,
    pub containment_epsilon_deg: f64,
    pub pan_threshold_ratio: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self::from(&ViewportConfig::default())
    }
}

impl From<&ViewportConfig> for ViewportSettings {
    fn from(config: &ViewportConfig) -> Self {
        Self {
            pointer_debounce: config.pointer_debounce(),
            touch_debounce: config.touch_debounce(),
            containment_epsilon_deg: config.containment_epsilon_deg,
            pan_threshold_ratio: config.pan_threshold_ratio,
        }
    }
}

impl ViewportSettings {
    #[must_use]
    pub fn debounce_for(&self, profile: InputProfile) -> Duration {
        match profile {
            InputProfile::Pointer => self.pointer_debounce,
            InputProfile::Touch => self.touch_debounce,
        }
    }

    /// Whether `bounds` needs a fetch given the last loaded bounds
    #[must_use]
    pub fn decide(&self, last_loaded: Option<&Bounds>, bounds: &Bounds) -> LoadDecision {
        let Some(last) = last_loaded else {
            return LoadDecision::Fetch;
        };
        if bounds.contains_within(last, self.containment_epsilon_deg) {
            return LoadDecision::Skip(SkipReason::ZoomIn);
        }
        let (lat_ratio, lng_ratio) = bounds.movement_ratio(last);
        if lat_ratio <= self.pan_threshold_ratio && lng_ratio <= self.pan_threshold_ratio {
            return LoadDecision::Skip(SkipReason::BelowThreshold);
        }
        LoadDecision::Fetch
    }
}

#[derive(Debug, Clone)]
struct LoadedView {
    bounds: Bounds,
    filters: FilterSnapshot,
}

#[derive(Default)]
struct CoordinatorState {
    last_loaded: Option<LoadedView>,
    first_call_seen: bool,
    initial_load_done: bool,
    debounce_timer: Option<JoinHandle<()>>,
    debounce_generation: u64,
    fetch_generation: u64,
    active_fetch: Option<CancellationToken>,
    shut_down: bool,
}

impl CoordinatorState {
    fn cancel_debounce(&mut self) {
        self.debounce_generation += 1;
        if let Some(timer) = self.debounce_timer.take() {
            timer.abort();
        }
    }

    fn cancel_active_fetch(&mut self) {
        if let Some(token) = self.active_fetch.take() {
            debug!(generation = token.generation(), "Superseding in-flight fetch");
            token.cancel();
        }
    }
}

struct Inner {
    orchestrator: Arc<DataFetchOrchestrator>,
    settings: ViewportSettings,
    profile: InputProfile,
    runtime: Handle,
    state: Mutex<CoordinatorState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decide_and_fetch(
        self: &Arc<Self>,
        state: &mut CoordinatorState,
        bounds: Bounds,
        filters: FilterSnapshot,
    ) {
        if let Some(last) = &state.last_loaded {
            if last.filters == filters {
                if let LoadDecision::Skip(reason) =
                    self.settings.decide(Some(&last.bounds), &bounds)
                {
                    debug!(?reason, ?bounds, last = ?last.bounds, "Skipping fetch");
                    // The loaded data already covers this view; anything still in
                    // flight was for a view the user has left.
                    state.cancel_active_fetch();
                    return;
                }
            } else {
                debug!("Filters changed since last load");
            }
        }
        self.issue_fetch(state, bounds, filters);
    }

    fn issue_fetch(
        self: &Arc<Self>,
        state: &mut CoordinatorState,
        bounds: Bounds,
        filters: FilterSnapshot,
    ) {
        state.cancel_active_fetch();
        state.fetch_generation += 1;
        let token = CancellationToken::new(state.fetch_generation);
        state.active_fetch = Some(token.clone());

        info!(generation = token.generation(), ?bounds, "Issuing fetch");

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            // Held across `complete` so the sink never sees an idle, empty map
            // between the fetch returning and the spots arriving.
            let _loading = inner.orchestrator.begin_loading();
            let result = inner
                .orchestrator
                .load(bounds, filters.clone(), token.clone())
                .await;
            inner.complete(&token, bounds, filters, result);
        });
    }

    fn complete(
        &self,
        token: &CancellationToken,
        bounds: Bounds,
        filters: FilterSnapshot,
        result: Result<SpotPage>,
    ) {
        let mut state = self.lock();
        let is_current = state
            .active_fetch
            .as_ref()
            .is_some_and(|active| active.generation() == token.generation());
        if !is_current || token.is_cancelled() {
            debug!(generation = token.generation(), "Discarding stale fetch result");
            return;
        }
        state.active_fetch = None;

        match result {
            Ok(page) => {
                info!(
                    generation = token.generation(),
                    count = page.spots.len(),
                    total = page.total,
                    ?bounds,
                    "Applying fetch result"
                );
                // Delivered under the lock so a newer result cannot overtake it.
                self.orchestrator.deliver(page);
                state.last_loaded = Some(LoadedView { bounds, filters });
                state.initial_load_done = true;
            }
            Err(err) => {
                debug!(generation = token.generation(), error = %err, "Fetch did not complete");
                self.orchestrator.report_error(&err);
            }
        }
    }
}

/// Owns the debounce timer, the active fetch and the last loaded bounds.
///
/// Sink callbacks run while the coordinator's state is locked and must not call
/// back into the coordinator synchronously.
pub struct ViewportChangeCoordinator {
    inner: Arc<Inner>,
}

impl ViewportChangeCoordinator {
    /// Must be created inside a Tokio runtime; timers and fetches are spawned on it.
    pub fn new(
        orchestrator: Arc<DataFetchOrchestrator>,
        settings: ViewportSettings,
        profile: InputProfile,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            SpotMapError::config(format!("Viewport coordinator needs a Tokio runtime: {e}"))
        })?;
        Ok(Self {
            inner: Arc::new(Inner {
                orchestrator,
                settings,
                profile,
                runtime,
                state: Mutex::new(CoordinatorState::default()),
            }),
        })
    }

    /// Handle a viewport change. The first change since construction is decided
    /// immediately; every later one after the debounce interval, each one
    /// restarting the timer, whether or not the first load has succeeded yet.
    pub fn on_bounds_changed(&self, bounds: Bounds, filters: FilterSnapshot) {
        let mut state = self.inner.lock();
        if state.shut_down {
            return;
        }
        state.cancel_debounce();

        if !state.first_call_seen {
            state.first_call_seen = true;
            debug!(?bounds, "Initial viewport, deciding immediately");
            self.inner.decide_and_fetch(&mut state, bounds, filters);
            return;
        }

        let delay = self.inner.settings.debounce_for(self.inner.profile);
        let generation = state.debounce_generation;
        let inner = Arc::clone(&self.inner);
        debug!(?bounds, ?delay, "Debouncing viewport change");

        state.debounce_timer = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = inner.lock();
            if state.shut_down || state.debounce_generation != generation {
                return;
            }
            state.debounce_timer = None;
            inner.decide_and_fetch(&mut state, bounds, filters);
        }));
    }

    /// Fetch regardless of thresholds, e.g. after a filter change.
    /// Clears the last loaded bounds and drops any pending debounced change.
    pub fn force_reload(&self, bounds: Bounds, filters: FilterSnapshot) {
        let mut state = self.inner.lock();
        if state.shut_down {
            return;
        }
        state.cancel_debounce();
        state.last_loaded = None;
        debug!(?bounds, "Forced reload");
        self.inner.issue_fetch(&mut state, bounds, filters);
    }

    /// Cancel the pending timer and the active fetch; later calls are ignored
    pub fn shutdown(&self) {
        let mut state = self.inner.lock();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        state.cancel_debounce();
        state.cancel_active_fetch();
        debug!("Viewport coordinator shut down");
    }

    #[must_use]
    pub fn last_loaded_bounds(&self) -> Option<Bounds> {
        self.inner.lock().last_loaded.as_ref().map(|view| view.bounds)
    }

    #[must_use]
    pub fn is_initial_load_done(&self) -> bool {
        self.inner.lock().initial_load_done
    }

    #[must_use]
    pub fn has_active_fetch(&self) -> bool {
        self.inner.lock().active_fetch.is_some()
    }

    #[must_use]
    pub fn debounce_interval(&self) -> Duration {
        self.inner.settings.debounce_for(self.inner.profile)
    }
}

impl Drop for ViewportChangeCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
