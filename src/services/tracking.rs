// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tracking session: one map screen's worth of presence tracking.
//!
//! A session owns the care and transit trackers and runs them in a single
//! task that reacts to:
//! - a new fix from the location stream (geofence evaluation)
//! - the location-push interval (tracked user only)
//! - the fence-out retry interval
//! - viewport changes from the map
//! - completion of the one-off care zone fetch
//!
//! Ticks run one at a time; backend calls are spawned and never block the
//! loop. Dropping the [`TrackingHandle`] stops the loop, the stream and the
//! timers. Calls already in flight are left to finish.

use crate::config::Config;
use crate::models::{CareZone, FenceEvent, LocationFix, SessionContext, Viewport};
use crate::services::backend::{Backend, LocationUpdate};
use crate::services::care::CareGeofenceService;
use crate::services::stations::StationCatalog;
use crate::services::transit::{ExitBackoff, TransitGeofenceEventSender};
use futures_util::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy)]
pub struct TrackingSettings {
    pub location_push_interval: Duration,
    pub exit_retry_interval: Duration,
    pub exit_backoff: ExitBackoff,
    pub move_window: chrono::Duration,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self::from(&Config::test_default())
    }
}

impl From<&Config> for TrackingSettings {
    fn from(config: &Config) -> Self {
        Self {
            location_push_interval: config.location_push_interval,
            exit_retry_interval: config.exit_retry_interval,
            exit_backoff: ExitBackoff {
                initial: config.exit_retry_interval,
                max: config.exit_retry_max_backoff,
            },
            move_window: config.move_window,
        }
    }
}

/// Trackers for one mounted map screen, ready to be spawned.
pub struct TrackingSession {
    session: SessionContext,
    backend: Arc<dyn Backend>,
    care: CareGeofenceService,
    transit: Option<TransitGeofenceEventSender>,
    stations: Arc<StationCatalog>,
    settings: TrackingSettings,
}

impl TrackingSession {
    /// Transit events are only sent from the tracked user's own device; a
    /// supporter session renders care zones and nothing else.
    pub fn new(
        session: SessionContext,
        backend: Arc<dyn Backend>,
        stations: Arc<StationCatalog>,
        settings: TrackingSettings,
    ) -> Self {
        let care = CareGeofenceService::new(session.clone(), backend.clone())
            .with_move_window(settings.move_window);
        let transit = session.is_tracked_user().then(|| {
            TransitGeofenceEventSender::new(&session, backend.clone())
                .with_backoff(settings.exit_backoff)
        });

        Self {
            session,
            backend,
            care,
            transit,
            stations,
            settings,
        }
    }

    /// Start tracking `fixes` in a background task.
    pub fn spawn<S>(self, fixes: S) -> TrackingHandle
    where
        S: Stream<Item = LocationFix> + Send + 'static,
    {
        let (viewport_tx, viewport_rx) = watch::channel(None);
        let (zones_tx, zones_rx) = watch::channel(Vec::new());
        let events = self.transit.as_ref().map(|t| t.event_sender());

        let task = tokio::spawn(self.run(fixes, viewport_rx, zones_tx));

        TrackingHandle {
            task: Some(task),
            viewport: viewport_tx,
            zones: zones_rx,
            events,
        }
    }

    async fn run<S>(
        mut self,
        fixes: S,
        mut viewport_rx: watch::Receiver<Option<Viewport>>,
        zones_tx: watch::Sender<Vec<CareZone>>,
    ) where
        S: Stream<Item = LocationFix> + Send,
    {
        let number = self.session.tracked_number.clone();
        tracing::info!(
            number = %number,
            role = ?self.session.viewer_role,
            stations = self.stations.len(),
            "Tracking session started"
        );

        // Care evaluation is skipped until the zones arrive; transit runs
        // from the first fix.
        let fetch = {
            let backend = self.backend.clone();
            let number = number.clone();
            async move { backend.fetch_care_zones(&number).await }
        };
        let mut fetch = std::pin::pin!(fetch);
        let mut fetch_pending = true;

        let mut fixes = std::pin::pin!(fixes);
        let mut push = every(self.settings.location_push_interval);
        let mut retry = every(self.settings.exit_retry_interval);
        let mut viewport_open = true;
        let mut last_fix: Option<LocationFix> = None;

        loop {
            // Viewport changes apply before the next fix is evaluated.
            tokio::select! {
                biased;

                changed = viewport_rx.changed(), if viewport_open => match changed {
                    Ok(()) => {
                        let viewport = *viewport_rx.borrow_and_update();
                        if let Some(transit) = &mut self.transit {
                            transit.set_viewport(viewport);
                        }
                    }
                    Err(_) => viewport_open = false,
                },
                result = &mut fetch, if fetch_pending => {
                    fetch_pending = false;
                    let zones = self.care.load_zones(result).to_vec();
                    zones_tx.send_replace(zones);
                }
                fix = fixes.next() => match fix {
                    Some(fix) => {
                        last_fix = Some(fix);
                        self.on_fix(fix);
                    }
                    None => {
                        tracing::info!(number = %number, "Location stream ended");
                        break;
                    }
                },
                _ = push.tick() => {
                    if let Some(fix) = last_fix {
                        self.push_location(fix);
                    }
                }
                _ = retry.tick() => {
                    if let Some(transit) = &self.transit {
                        let _ = transit.retry_pending_exits(std::time::Instant::now());
                    }
                }
            }
        }
    }

    /// Evaluate one fix. Spawned calls are detached.
    fn on_fix(&mut self, fix: LocationFix) {
        if let Some(care) = self.care.evaluate(Some(fix.point), fix.timestamp) {
            for care_move in &care.moves {
                tracing::debug!(
                    from = %care_move.from.kind,
                    to = %care_move.to.kind,
                    "Care move detected"
                );
            }
        }

        if let Some(transit) = &mut self.transit {
            if let Some(tick) = transit.tick(Some(fix.point), self.stations.stations()) {
                if !tick.entered.is_empty() || !tick.exited.is_empty() {
                    tracing::debug!(
                        entered = ?tick.entered,
                        exited = ?tick.exited,
                        "Transit membership changed"
                    );
                }
            }
        }
    }

    /// Push the tracked user's last fix. Supporters never push.
    fn push_location(&self, fix: LocationFix) {
        if !self.session.is_tracked_user() {
            return;
        }

        let backend = self.backend.clone();
        let update = LocationUpdate {
            number: self.session.tracked_number.clone(),
            latitude: fix.point.latitude,
            longitude: fix.point.longitude,
        };
        tokio::spawn(async move {
            if let Err(e) = backend.save_location(&update).await {
                tracing::warn!(error = %e, "Failed to push location");
            }
        });
    }
}

/// Shortest timer period; tokio intervals reject zero.
const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// Repeating timer whose first tick is one period from now.
fn every(period: Duration) -> tokio::time::Interval {
    let period = period.max(MIN_TIMER_PERIOD);
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Owner of a running session. Dropping it stops the session.
pub struct TrackingHandle {
    task: Option<JoinHandle<()>>,
    viewport: watch::Sender<Option<Viewport>>,
    zones: watch::Receiver<Vec<CareZone>>,
    events: Option<broadcast::Sender<FenceEvent>>,
}

impl TrackingHandle {
    /// Tell the session which map region is on screen.
    pub fn set_viewport(&self, viewport: Option<Viewport>) {
        self.viewport.send_replace(viewport);
    }

    /// Care zones to draw; updated once the fetch completes.
    pub fn care_zones(&self) -> watch::Receiver<Vec<CareZone>> {
        self.zones.clone()
    }

    /// Transit fence events, or `None` for a supporter session.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<FenceEvent>> {
        self.events.as_ref().map(|tx| tx.subscribe())
    }

    /// Wait for the location stream to end.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Tracking session task failed");
            }
        }
    }

    /// Stop tracking now and wait for the loop to wind down.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Location stream for a supporter: poll the target's most recent location.
///
/// The first poll happens immediately. Failed polls are logged and skipped.
pub fn poll_target_locations(
    backend: Arc<dyn Backend>,
    number: String,
    period: Duration,
) -> impl Stream<Item = LocationFix> + Send {
    futures_util::stream::unfold(
        (backend, number, None::<tokio::time::Interval>),
        move |(backend, number, ticker)| async move {
            let mut ticker = ticker.unwrap_or_else(|| {
                let mut t = interval(period.max(MIN_TIMER_PERIOD));
                t.set_missed_tick_behavior(MissedTickBehavior::Delay);
                t
            });
            loop {
                ticker.tick().await;
                match backend.recent_location(&number).await {
                    Ok(point) => {
                        return Some((LocationFix::now(point), (backend, number, Some(ticker))));
                    }
                    Err(e) => {
                        tracing::warn!(number = %number, error = %e, "Failed to fetch target location");
                    }
                }
            }
        },
    )
}
