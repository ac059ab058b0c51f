// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Care geofences: the tracked person's home and day-care center.
//!
//! Zones are fetched once per session. Every fix is run through a
//! [`MembershipTracker`], and entering one care zone within the move window of
//! having entered the other is reported to the backend as a single move, which
//! lets it infer a likely transit ride without knowing anything about fares.

use crate::error::Result;
use crate::models::{CareEntry, CareMove, CareZone, CareZoneKind, GeoPoint, SessionContext};
use crate::services::backend::{Backend, CareZoneCoordinates, MoveHistoryEntry, MoveReport};
use crate::services::membership::MembershipTracker;
use crate::services::Dispatch;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Default longest gap between the two entries of a reportable move.
pub const DEFAULT_MOVE_WINDOW_MINUTES: i64 = 60;

/// Outcome of one care evaluation.
#[derive(Debug, Default)]
pub struct CareEvaluation {
    pub entered: Vec<CareZoneKind>,
    pub exited: Vec<CareZoneKind>,
    /// Moves detected this tick (reported only when reporting is enabled).
    pub moves: Vec<CareMove>,
    pub dispatch: Dispatch,
}

/// Tracks presence in the two care zones of one subject.
pub struct CareGeofenceService {
    session: SessionContext,
    backend: Arc<dyn Backend>,
    zones: Vec<CareZone>,
    membership: MembershipTracker<CareZoneKind>,
    current_fence: Option<CareZoneKind>,
    last_entry: Option<CareEntry>,
    move_window: Duration,
    report_moves: bool,
}

impl CareGeofenceService {
    /// Moves are reported only from the tracked user's own device.
    pub fn new(session: SessionContext, backend: Arc<dyn Backend>) -> Self {
        let report_moves = session.is_tracked_user();
        Self {
            session,
            backend,
            zones: Vec::new(),
            membership: MembershipTracker::new(),
            current_fence: None,
            last_entry: None,
            move_window: Duration::minutes(DEFAULT_MOVE_WINDOW_MINUTES),
            report_moves,
        }
    }

    pub fn with_move_window(mut self, window: Duration) -> Self {
        self.move_window = window;
        self
    }

    /// Zones to draw on the map.
    pub fn zones(&self) -> &[CareZone] {
        &self.zones
    }

    pub fn current_fence(&self) -> Option<CareZoneKind> {
        self.current_fence
    }

    pub fn last_entry(&self) -> Option<CareEntry> {
        self.last_entry
    }

    /// Fetch the subject's home and center zones.
    pub async fn fetch_zones(&mut self) -> &[CareZone] {
        let result = self
            .backend
            .fetch_care_zones(&self.session.tracked_number)
            .await;
        self.load_zones(result)
    }

    /// Install the outcome of a care zone lookup.
    ///
    /// A subject with no zones configured is normal: the list stays empty and
    /// a warning is logged. Other failures are logged too; neither is retried.
    pub fn load_zones(&mut self, result: Result<CareZoneCoordinates>) -> &[CareZone] {
        let number = self.session.tracked_number.as_str();

        match result {
            Ok(coords) => {
                self.zones = vec![
                    CareZone::new(CareZoneKind::Home, coords.home()),
                    CareZone::new(CareZoneKind::Center, coords.center()),
                ];
                tracing::info!(number, "Care zones loaded");
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(number, "No care zones configured");
                self.zones.clear();
            }
            Err(e) => {
                tracing::error!(number, error = %e, "Failed to fetch care zones");
                self.zones.clear();
            }
        }

        &self.zones
    }

    /// Run one fix through the care zones.
    ///
    /// Returns `None` when there is no fix or no zone; nothing changes then.
    pub fn evaluate(
        &mut self,
        location: Option<GeoPoint>,
        at: DateTime<Utc>,
    ) -> Option<CareEvaluation> {
        let transitions = self.membership.evaluate(location, &self.zones)?;

        let mut evaluation = CareEvaluation {
            entered: transitions.entered.iter().map(|z| z.id).collect(),
            exited: transitions.exited.iter().map(|z| z.id).collect(),
            ..Default::default()
        };
        let now_empty = transitions.inside.is_empty();

        for kind in &evaluation.exited {
            tracing::debug!(zone = %kind, "Left care zone");
        }

        // Compare against the entry recorded before this tick so that two zones
        // entered in the same fix are never reported as a move.
        let prior = self.last_entry;
        for &kind in &evaluation.entered {
            let entry = CareEntry { kind, at };
            tracing::debug!(zone = %kind, "Entered care zone");

            if let Some(from) = prior {
                if self.is_move(from, entry) {
                    let care_move = CareMove { from, to: entry };
                    if self.report_moves {
                        evaluation.dispatch.spawn(report_move(
                            self.backend.clone(),
                            self.session.tracked_number.clone(),
                            care_move,
                        ));
                    }
                    evaluation.moves.push(care_move);
                }
            }

            self.last_entry = Some(entry);
            self.current_fence = Some(kind);
        }

        if now_empty {
            self.current_fence = None;
        }

        Some(evaluation)
    }

    fn is_move(&self, from: CareEntry, to: CareEntry) -> bool {
        let elapsed = to.at - from.at;
        from.kind != to.kind && elapsed >= Duration::zero() && elapsed <= self.move_window
    }
}

async fn report_move(backend: Arc<dyn Backend>, number: String, care_move: CareMove) {
    let report = MoveReport {
        number,
        history: vec![
            MoveHistoryEntry::new(care_move.from.kind.as_str(), care_move.from.at),
            MoveHistoryEntry::new(care_move.to.kind.as_str(), care_move.to.at),
        ],
    };

    match backend.report_move(&report).await {
        Ok(()) => tracing::info!(
            from = %care_move.from.kind,
            to = %care_move.to.kind,
            "Care move reported"
        ),
        Err(e) => tracing::warn!(
            from = %care_move.from.kind,
            to = %care_move.to.kind,
            error = %e,
            "Failed to report care move"
        ),
    }
}
