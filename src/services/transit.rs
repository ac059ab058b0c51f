// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transit station fence-in / fence-out delivery.
//!
//! Each tick matches a fix against the stations visible on the map and turns
//! membership edges into backend events. Per-station delivery state makes the
//! events idempotent:
//!
//! - a station gets at most one fence-in while it has a delivery entry, even
//!   if the first POST has not completed yet
//! - a fence-out is only sent for a station whose fence-in was acknowledged
//! - the entry is removed only after the fence-out is acknowledged
//! - a failed fence-out is retried with exponential backoff

use crate::models::{FenceEvent, GeoPoint, SessionContext, TransitZone, Viewport};
use crate::services::backend::{Backend, FenceRequest};
use crate::services::membership::MembershipTracker;
use crate::services::Dispatch;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Where a station's notifications stand with the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Fence-in in flight. `left` is set when the station was exited before the ack.
    Entering { left: bool },
    /// Fence-in acknowledged.
    Sent,
    /// Fence-out in flight. `returned` is set when the station was re-entered
    /// before the ack; `attempts` counts earlier failed fence-outs.
    Exiting { returned: bool, attempts: u32 },
    /// Fence-out failed; due for another attempt at `retry_at`.
    ExitPending { attempts: u32, retry_at: Instant },
}

/// Backoff schedule for failed fence-outs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ExitBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(15),
            max: Duration::from_secs(300),
        }
    }
}

impl ExitBackoff {
    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        self.initial.saturating_mul(1 << shift).min(self.max)
    }
}

/// Outcome of one transit tick.
#[derive(Debug, Default)]
pub struct TransitTick {
    pub entered: Vec<u32>,
    pub exited: Vec<u32>,
    pub dispatch: Dispatch,
}

#[derive(Debug, Clone)]
struct Delivery {
    station: TransitZone,
    state: DeliveryState,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    FenceIn,
    FenceOut,
}

/// Everything a spawned delivery needs, detached from the sender itself so a
/// call in flight can finish after the session is gone.
#[derive(Clone)]
struct Courier {
    backend: Arc<dyn Backend>,
    number: String,
    deliveries: Arc<DashMap<u32, Delivery>>,
    events: broadcast::Sender<FenceEvent>,
    backoff: ExitBackoff,
}

impl Courier {
    /// Deliver `first`, then whatever the ack says is owed next.
    async fn run(self, station: TransitZone, first: Action) {
        let mut next = Some(first);
        while let Some(action) = next {
            next = match action {
                Action::FenceIn => self.fence_in(&station).await,
                Action::FenceOut => self.fence_out(&station).await,
            };
        }
    }

    async fn fence_in(&self, station: &TransitZone) -> Option<Action> {
        let id = station.station_number;
        let request = FenceRequest::new(&self.number, station);

        match self.backend.fence_in(&request).await {
            Ok(()) => {
                let left = match self.deliveries.get_mut(&id) {
                    Some(mut d) => {
                        let state = d.state;
                        match state {
                            DeliveryState::Entering { left } => {
                                d.state = if left {
                                    DeliveryState::Exiting {
                                        returned: false,
                                        attempts: 0,
                                    }
                                } else {
                                    DeliveryState::Sent
                                };
                                left
                            }
                            _ => false,
                        }
                    }
                    None => false,
                };

                tracing::info!(station = id, name = %station.name, "Fence-in sent");
                // No subscribers is fine.
                let _ = self.events.send(FenceEvent::Entered(station.clone()));

                left.then_some(Action::FenceOut)
            }
            Err(e) => {
                tracing::warn!(station = id, name = %station.name, error = %e, "Fence-in failed");
                self.deliveries
                    .remove_if(&id, |_, d| matches!(d.state, DeliveryState::Entering { .. }));
                None
            }
        }
    }

    async fn fence_out(&self, station: &TransitZone) -> Option<Action> {
        let id = station.station_number;
        let request = FenceRequest::new(&self.number, station);

        match self.backend.fence_out(&request).await {
            Ok(()) => {
                let returned = match self.deliveries.entry(id) {
                    Entry::Occupied(mut o) => {
                        let state = o.get().state;
                        match state {
                            DeliveryState::Exiting { returned: true, .. } => {
                                o.get_mut().state = DeliveryState::Entering { left: false };
                                true
                            }
                            DeliveryState::Exiting { .. } => {
                                o.remove();
                                false
                            }
                            _ => false,
                        }
                    }
                    Entry::Vacant(_) => false,
                };

                tracing::info!(station = id, name = %station.name, "Fence-out sent");
                let _ = self.events.send(FenceEvent::Exited(station.clone()));

                returned.then_some(Action::FenceIn)
            }
            Err(e) => {
                tracing::warn!(station = id, name = %station.name, error = %e, "Fence-out failed");
                if let Some(mut d) = self.deliveries.get_mut(&id) {
                    let state = d.state;
                    if let DeliveryState::Exiting { returned, attempts } = state {
                        d.state = if returned {
                            // Back inside: the backend's view is correct again.
                            DeliveryState::Sent
                        } else {
                            let failures = attempts + 1;
                            DeliveryState::ExitPending {
                                attempts: failures,
                                retry_at: Instant::now() + self.backoff.delay(failures),
                            }
                        };
                    }
                }
                None
            }
        }
    }
}

/// Sends idempotent transit fence events for one tracking session.
pub struct TransitGeofenceEventSender {
    courier: Courier,
    membership: MembershipTracker<u32>,
    viewport: Option<Viewport>,
}

impl TransitGeofenceEventSender {
    pub fn new(session: &SessionContext, backend: Arc<dyn Backend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            courier: Courier {
                backend,
                number: session.tracked_number.clone(),
                deliveries: Arc::new(DashMap::new()),
                events,
                backoff: ExitBackoff::default(),
            },
            membership: MembershipTracker::new(),
            viewport: None,
        }
    }

    pub fn with_backoff(mut self, backoff: ExitBackoff) -> Self {
        self.courier.backoff = backoff;
        self
    }

    /// Subscribe to acknowledged fence transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<FenceEvent> {
        self.courier.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<FenceEvent> {
        self.courier.events.clone()
    }

    /// Restrict candidates to the visible map region (`None` = all stations).
    pub fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.viewport = viewport;
    }

    pub fn delivery_state(&self, station_number: u32) -> Option<DeliveryState> {
        self.courier
            .deliveries
            .get(&station_number)
            .map(|d| d.state)
    }

    /// Stations the backend has (or is about to have) a fence-in for.
    pub fn pending_stations(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.courier.deliveries.iter().map(|d| *d.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Stations inside as of the last tick.
    pub fn inside(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.membership.inside().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Evaluate one fix against the station catalog.
    ///
    /// Returns `None` (and changes nothing) without a fix or without any
    /// visible station.
    pub fn tick(
        &mut self,
        location: Option<GeoPoint>,
        stations: &[TransitZone],
    ) -> Option<TransitTick> {
        let viewport = self.viewport;
        let candidates = stations
            .iter()
            .filter(|s| viewport.map_or(true, |v| v.contains(s.center)));

        let transitions = self.membership.evaluate(location, candidates)?;
        let mut tick = TransitTick::default();

        for station in transitions.entered {
            tick.entered.push(station.station_number);
            if let Some(action) = self.on_entered(station) {
                tick.dispatch
                    .spawn(self.courier.clone().run(station.clone(), action));
            }
        }

        for station in transitions.exited {
            tick.exited.push(station.station_number);
            if let Some(action) = self.on_exited(station) {
                tick.dispatch
                    .spawn(self.courier.clone().run(station.clone(), action));
            }
        }

        Some(tick)
    }

    fn on_entered(&self, station: &TransitZone) -> Option<Action> {
        match self.courier.deliveries.entry(station.station_number) {
            Entry::Vacant(v) => {
                v.insert(Delivery {
                    station: station.clone(),
                    state: DeliveryState::Entering { left: false },
                });
                Some(Action::FenceIn)
            }
            Entry::Occupied(mut o) => {
                let d = o.get_mut();
                d.state = match d.state {
                    DeliveryState::Entering { .. } => DeliveryState::Entering { left: false },
                    DeliveryState::Sent | DeliveryState::ExitPending { .. } => {
                        DeliveryState::Sent
                    }
                    DeliveryState::Exiting { attempts, .. } => DeliveryState::Exiting {
                        returned: true,
                        attempts,
                    },
                };
                tracing::debug!(station = station.station_number, "Fence-in already sent");
                None
            }
        }
    }

    fn on_exited(&self, station: &TransitZone) -> Option<Action> {
        let mut d = self.courier.deliveries.get_mut(&station.station_number)?;
        let state = d.state;
        match state {
            DeliveryState::Sent => {
                d.state = DeliveryState::Exiting {
                    returned: false,
                    attempts: 0,
                };
                Some(Action::FenceOut)
            }
            DeliveryState::Entering { .. } => {
                d.state = DeliveryState::Entering { left: true };
                None
            }
            DeliveryState::Exiting { attempts, .. } => {
                d.state = DeliveryState::Exiting {
                    returned: false,
                    attempts,
                };
                None
            }
            DeliveryState::ExitPending { .. } => None,
        }
    }

    /// Re-send fence-outs whose backoff has elapsed as of `now`.
    pub fn retry_pending_exits(&self, now: Instant) -> Dispatch {
        let mut due = Vec::new();
        for mut d in self.courier.deliveries.iter_mut() {
            let state = d.state;
            if let DeliveryState::ExitPending { attempts, retry_at } = state {
                if retry_at <= now {
                    d.state = DeliveryState::Exiting {
                        returned: false,
                        attempts,
                    };
                    due.push(d.station.clone());
                }
            }
        }

        let mut dispatch = Dispatch::new();
        for station in due {
            tracing::debug!(station = station.station_number, "Retrying fence-out");
            dispatch.spawn(self.courier.clone().run(station, Action::FenceOut));
        }
        dispatch
    }
}
