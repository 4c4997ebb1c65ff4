//! Turns raw viewport and position updates into rate-limited weather
//! refreshes.

use std::{sync::Arc, time::Duration};

use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    error::WeatherError,
    geo::distance_meters,
    model::{
        CURRENT_LOCATION_NAME, PlaceCandidate, Position, RefreshTarget, Viewport, WeatherSnapshot,
    },
    scheduler::Scheduler,
    weather::WeatherProvider,
    zoom::DEFAULT_SPAN,
};

/// Name shown for refreshes driven by map movement.
pub const MAP_CENTER_NAME: &str = "Map Center";

/// Thresholds and delays of the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshPolicy {
    /// Viewports with either span below this are display-only.
    pub too_zoomed_span: f64,
    /// Position moves shorter than this are GPS noise.
    pub noise_floor_meters: f64,
    /// Minimum gap between refreshes that were not forced.
    pub min_refresh_interval_ms: u64,
    /// Updates arriving this soon after a refresh schedule nothing.
    pub recent_refresh_window_ms: u64,
    /// Quiet period for wide viewports and position updates.
    pub base_debounce_ms: u64,
    /// Quiet period once the smallest span drops below `zoomed_span`.
    pub zoomed_debounce_ms: u64,
    /// Quiet period once the smallest span drops below `close_span`.
    pub close_debounce_ms: u64,
    /// Below this span the zoomed debounce applies.
    pub zoomed_span: f64,
    /// Below this span the close debounce applies.
    pub close_span: f64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            too_zoomed_span: 0.001,
            noise_floor_meters: 50.0,
            min_refresh_interval_ms: 10_000,
            recent_refresh_window_ms: 3_000,
            base_debounce_ms: 3_000,
            zoomed_debounce_ms: 5_000,
            close_debounce_ms: 8_000,
            zoomed_span: 0.05,
            close_span: 0.01,
        }
    }
}

impl RefreshPolicy {
    pub fn min_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.min_refresh_interval_ms)
    }

    pub fn recent_refresh_window(&self) -> Duration {
        Duration::from_millis(self.recent_refresh_window_ms)
    }

    pub fn base_debounce(&self) -> Duration {
        Duration::from_millis(self.base_debounce_ms)
    }

    /// Longer quiet periods the further the map is zoomed in.
    pub fn debounce_for(&self, min_span: f64) -> Duration {
        let ms = if min_span < self.close_span {
            self.close_debounce_ms
        } else if min_span < self.zoomed_span {
            self.zoomed_debounce_ms
        } else {
            self.base_debounce_ms
        };
        Duration::from_millis(ms)
    }

    pub fn is_too_zoomed(&self, viewport: &Viewport) -> bool {
        viewport.latitude_span < self.too_zoomed_span
            || viewport.longitude_span < self.too_zoomed_span
    }

    /// Longest a debounced update can wait before its refresh fires.
    pub fn max_settle(&self) -> Duration {
        let longest =
            self.base_debounce_ms.max(self.zoomed_debounce_ms).max(self.close_debounce_ms);
        Duration::from_millis(longest.max(self.min_refresh_interval_ms))
    }
}

/// Delivered to the owner of the coordinator.
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// Animate the map to this viewport.
    MoveCamera(Viewport),
    /// A weather fetch was invoked.
    RefreshStarted(RefreshTarget),
    Weather { target: RefreshTarget, result: Result<WeatherSnapshot, WeatherError> },
}

/// What an update operation decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A refresh will fire after this delay unless superseded.
    Scheduled(Duration),
    /// A forced refresh is firing now.
    Fired,
    /// Recorded for display; zoomed in too far to refresh.
    DisplayOnly,
    /// A refresh fired moments ago; nothing scheduled.
    Throttled,
    /// Position moved less than the noise floor; ignored.
    BelowNoiseFloor,
    /// Fix taken before the last accepted one; ignored.
    Stale,
    /// Non-finite input, or the coordinator was shut down.
    Rejected,
}

impl UpdateOutcome {
    /// Whether the update changed the coordinator's state.
    pub fn is_accepted(&self) -> bool {
        !matches!(
            self,
            UpdateOutcome::BelowNoiseFloor | UpdateOutcome::Stale | UpdateOutcome::Rejected
        )
    }
}

#[derive(Debug, Default)]
struct State {
    viewport: Option<Viewport>,
    last_position: Option<Position>,
    last_refresh: Option<Instant>,
    /// When the oldest still-pending debounced update arrived.
    pending_since: Option<Instant>,
    shut_down: bool,
}

#[derive(Debug)]
struct Shared {
    policy: RefreshPolicy,
    weather: Arc<dyn WeatherProvider>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
    state: Mutex<State>,
    /// In-flight weather fetch. Replaced only when a newer refresh starts.
    fetches: Scheduler,
}

/// Owns the viewport, the last accepted position and the refresh clock.
///
/// Operations never block and never fail loudly: they record what they
/// decided in an [`UpdateOutcome`]. Debounced updates share one timer, so
/// the newest accepted update always determines the next refresh. A fetch
/// that already started keeps running until a newer refresh starts, a
/// refresh is forced, or the coordinator shuts down. Refreshes that were
/// not forced are never closer together than
/// [`RefreshPolicy::min_refresh_interval`], and a stream of updates cannot
/// postpone a refresh beyond [`RefreshPolicy::max_settle`].
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct LocationCoordinator {
    shared: Arc<Shared>,
    timer: Scheduler,
}

impl LocationCoordinator {
    pub fn new(
        policy: RefreshPolicy,
        weather: Arc<dyn WeatherProvider>,
    ) -> (Self, mpsc::UnboundedReceiver<CoordinatorEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            policy,
            weather,
            events,
            state: Mutex::new(State::default()),
            fetches: Scheduler::new(),
        });

        (Self { shared, timer: Scheduler::new() }, rx)
    }

    pub fn policy(&self) -> &RefreshPolicy {
        &self.shared.policy
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.shared.state.lock().viewport
    }

    pub fn last_position(&self) -> Option<Position> {
        self.shared.state.lock().last_position
    }

    pub fn last_refresh(&self) -> Option<Instant> {
        self.shared.state.lock().last_refresh
    }

    /// Map moved or zoomed.
    pub fn on_viewport_changed(&self, viewport: Viewport) -> UpdateOutcome {
        if !viewport.is_finite() {
            warn!("Rejecting non-finite viewport {:?}", viewport);
            return UpdateOutcome::Rejected;
        }

        let mut state = self.shared.state.lock();
        if state.shut_down {
            return UpdateOutcome::Rejected;
        }
        state.viewport = Some(viewport);

        let policy = &self.shared.policy;
        if policy.is_too_zoomed(&viewport) {
            debug!(
                "Viewport span {:.5} x {:.5} is below the refresh threshold",
                viewport.latitude_span, viewport.longitude_span
            );
            return UpdateOutcome::DisplayOnly;
        }

        let debounce = policy.debounce_for(viewport.min_span());
        let target = RefreshTarget::new(
            viewport.center_latitude,
            viewport.center_longitude,
            MAP_CENTER_NAME,
        );
        self.schedule_debounced(state, target, debounce)
    }

    /// New fix from the position watch.
    pub fn on_position_updated(&self, position: Position) -> UpdateOutcome {
        if !position.is_finite() {
            warn!("Rejecting non-finite position {:?}", position);
            return UpdateOutcome::Rejected;
        }

        let mut state = self.shared.state.lock();
        if state.shut_down {
            return UpdateOutcome::Rejected;
        }

        if let Some(previous) = state.last_position {
            if position.timestamp < previous.timestamp {
                debug!(
                    "Ignoring fix from {}, last accepted fix is from {}",
                    position.timestamp, previous.timestamp
                );
                return UpdateOutcome::Stale;
            }
            let moved = distance_meters(
                (previous.latitude, previous.longitude),
                (position.latitude, position.longitude),
            );
            if moved < self.shared.policy.noise_floor_meters {
                debug!("Ignoring position update, moved only {:.1} m", moved);
                return UpdateOutcome::BelowNoiseFloor;
            }
            debug!("Position moved {:.1} m", moved);
        }
        state.last_position = Some(position);

        let target =
            RefreshTarget::new(position.latitude, position.longitude, CURRENT_LOCATION_NAME);
        let debounce = self.shared.policy.base_debounce();
        self.schedule_debounced(state, target, debounce)
    }

    /// Explicit selection of a search result or marker.
    pub fn select_location(&self, candidate: &PlaceCandidate) -> UpdateOutcome {
        let target = candidate.refresh_target();
        if let Err(err) = target.validate() {
            warn!("Rejecting selection of '{}': {}", candidate.display_name, err);
            return UpdateOutcome::Rejected;
        }

        info!("Selected '{}' ({})", candidate.display_name, candidate.zoom_class);
        self.force(target, Some(candidate.target_viewport()))
    }

    /// Tap on the map; keeps the current zoom level.
    pub fn select_point(&self, latitude: f64, longitude: f64) -> UpdateOutcome {
        let target = PlaceCandidate::pin(latitude, longitude).refresh_target();
        if let Err(err) = target.validate() {
            warn!("Rejecting map tap: {}", err);
            return UpdateOutcome::Rejected;
        }

        let span = self.viewport().map(|v| v.span()).unwrap_or(DEFAULT_SPAN);
        self.force(target, Some(Viewport::around(latitude, longitude, span)))
    }

    /// Manual "use current location".
    pub fn use_current_location(&self) -> UpdateOutcome {
        let Some(position) = self.last_position() else {
            warn!("No position known yet, cannot use current location");
            return UpdateOutcome::Rejected;
        };

        let target =
            RefreshTarget::new(position.latitude, position.longitude, CURRENT_LOCATION_NAME);
        let camera = Viewport::around(position.latitude, position.longitude, DEFAULT_SPAN);
        self.force(target, Some(camera))
    }

    /// Refresh immediately, e.g. on initial load.
    pub fn force_refresh(&self, target: RefreshTarget) -> UpdateOutcome {
        if let Err(err) = target.validate() {
            warn!("Rejecting forced refresh: {}", err);
            return UpdateOutcome::Rejected;
        }
        self.force(target, None)
    }

    /// Cancel pending timers and in-flight fetches. Later updates are rejected.
    pub fn shutdown(&self) {
        self.shared.state.lock().shut_down = true;
        self.timer.shutdown();
        self.shared.fetches.shutdown();
        debug!("Location coordinator shut down");
    }

    fn force(&self, target: RefreshTarget, camera: Option<Viewport>) -> UpdateOutcome {
        let mut state = self.shared.state.lock();
        if state.shut_down {
            return UpdateOutcome::Rejected;
        }

        // Stamped now so the camera animation's own viewport updates are throttled.
        state.last_refresh = Some(Instant::now());
        state.pending_since = None;
        if let Some(viewport) = camera {
            state.viewport = Some(viewport);
            let _ = self.shared.events.send(CoordinatorEvent::MoveCamera(viewport));
        }
        drop(state);

        self.timer.cancel();
        start_refresh(&self.shared, target);
        UpdateOutcome::Fired
    }

    fn schedule_debounced(
        &self,
        mut state: MutexGuard<'_, State>,
        target: RefreshTarget,
        debounce: Duration,
    ) -> UpdateOutcome {
        let policy = &self.shared.policy;
        let now = Instant::now();

        if let Some(last) = state.last_refresh {
            if now.duration_since(last) < policy.recent_refresh_window() {
                debug!("Refresh fired {:?} ago, not scheduling another", now.duration_since(last));
                return UpdateOutcome::Throttled;
            }
        }

        let pending_since = *state.pending_since.get_or_insert(now);
        let mut fire_at = (now + debounce).min(pending_since + policy.max_settle());
        if let Some(last) = state.last_refresh {
            fire_at = fire_at.max(last + policy.min_refresh_interval());
        }
        drop(state);

        let delay = fire_at.duration_since(now);
        debug!("Refresh for '{}' scheduled in {:?}", target.display_name, delay);
        let shared = self.shared.clone();
        self.timer.schedule(delay, async move { start_refresh(&shared, target) });
        UpdateOutcome::Scheduled(delay)
    }
}

impl Drop for LocationCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Replaces any in-flight fetch with one for `target`.
fn start_refresh(shared: &Arc<Shared>, target: RefreshTarget) {
    shared.fetches.schedule(Duration::ZERO, run_refresh(shared.clone(), target));
}

async fn run_refresh(shared: Arc<Shared>, target: RefreshTarget) {
    {
        let mut state = shared.state.lock();
        state.last_refresh = Some(Instant::now());
        state.pending_since = None;
    }

    info!(
        "Refreshing weather for '{}' ({:.4}, {:.4})",
        target.display_name, target.latitude, target.longitude
    );
    let _ = shared.events.send(CoordinatorEvent::RefreshStarted(target.clone()));

    let result = shared.weather.get_weather(&target.request()).await;
    if let Err(err) = &result {
        warn!("Weather refresh for '{}' failed: {}", target.display_name, err);
    }

    let _ = shared.events.send(CoordinatorEvent::Weather { target, result });
}
