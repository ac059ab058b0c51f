// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use paypass_tracker::error::{BackendError, Result};
use paypass_tracker::models::{GeoPoint, SessionContext, TransitZone, ViewerRole};
use paypass_tracker::services::backend::{
    Backend, CareZoneCoordinates, FenceRequest, LocationUpdate, MoveReport,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Meters per degree of latitude for the 6,371 km sphere.
#[allow(dead_code)]
pub const METERS_PER_DEGREE: f64 = 111_194.93;

/// What the mock answers to a care zone lookup.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum CareZoneReply {
    Found(CareZoneCoordinates),
    NotFound,
    Unavailable,
}

/// In-memory backend that records every call.
pub struct MockBackend {
    pub care_reply: Mutex<CareZoneReply>,
    pub care_lookups: AtomicUsize,
    pub stations: Mutex<Option<Vec<serde_json::Value>>>,
    pub recent: Mutex<Option<GeoPoint>>,

    pub fail_fence_in: AtomicBool,
    pub fail_fence_out: AtomicBool,
    pub stall_fence_in: AtomicBool,
    pub stall_care_lookup: AtomicBool,
    pub fail_moves: AtomicBool,

    pub fence_ins: Mutex<Vec<FenceRequest>>,
    pub fence_outs: Mutex<Vec<FenceRequest>>,
    pub moves: Mutex<Vec<MoveReport>>,
    pub locations: Mutex<Vec<LocationUpdate>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            care_reply: Mutex::new(CareZoneReply::NotFound),
            care_lookups: AtomicUsize::new(0),
            stations: Mutex::new(Some(Vec::new())),
            recent: Mutex::new(None),
            fail_fence_in: AtomicBool::new(false),
            fail_fence_out: AtomicBool::new(false),
            stall_fence_in: AtomicBool::new(false),
            stall_care_lookup: AtomicBool::new(false),
            fail_moves: AtomicBool::new(false),
            fence_ins: Mutex::new(Vec::new()),
            fence_outs: Mutex::new(Vec::new()),
            moves: Mutex::new(Vec::new()),
            locations: Mutex::new(Vec::new()),
        }
    }
}

#[allow(dead_code)]
impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_care_zones(home: GeoPoint, center: GeoPoint) -> Arc<Self> {
        let backend = Self::default();
        *backend.care_reply.lock().unwrap() = CareZoneReply::Found(CareZoneCoordinates {
            home_latitude: home.latitude,
            home_longitude: home.longitude,
            center_latitude: center.latitude,
            center_longitude: center.longitude,
        });
        Arc::new(backend)
    }

    pub fn set(&self, flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    pub fn fence_in_count(&self) -> usize {
        self.fence_ins.lock().unwrap().len()
    }

    pub fn fence_out_count(&self) -> usize {
        self.fence_outs.lock().unwrap().len()
    }

    pub fn move_count(&self) -> usize {
        self.moves.lock().unwrap().len()
    }

    pub fn network_calls(&self) -> usize {
        self.care_lookups.load(Ordering::SeqCst)
            + self.fence_in_count()
            + self.fence_out_count()
            + self.move_count()
            + self.locations.lock().unwrap().len()
    }
}

fn unavailable() -> BackendError {
    BackendError::Transport("connection refused".to_string())
}

#[async_trait]
impl Backend for MockBackend {
    async fn fetch_care_zones(&self, _number: &str) -> Result<CareZoneCoordinates> {
        self.care_lookups.fetch_add(1, Ordering::SeqCst);
        if self.stall_care_lookup.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let reply = *self.care_reply.lock().unwrap();
        match reply {
            CareZoneReply::Found(coords) => Ok(coords),
            CareZoneReply::NotFound => Err(BackendError::NotFound(
                "/geofence/getCareGeofence".to_string(),
            )),
            CareZoneReply::Unavailable => Err(unavailable()),
        }
    }

    async fn report_move(&self, report: &MoveReport) -> Result<()> {
        self.moves.lock().unwrap().push(report.clone());
        if self.fail_moves.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn fence_in(&self, request: &FenceRequest) -> Result<()> {
        self.fence_ins.lock().unwrap().push(request.clone());
        if self.stall_fence_in.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_fence_in.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn fence_out(&self, request: &FenceRequest) -> Result<()> {
        self.fence_outs.lock().unwrap().push(request.clone());
        if self.fail_fence_out.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn fetch_stations(&self) -> Result<Vec<serde_json::Value>> {
        self.stations.lock().unwrap().clone().ok_or_else(unavailable)
    }

    async fn save_location(&self, update: &LocationUpdate) -> Result<()> {
        self.locations.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn recent_location(&self, number: &str) -> Result<GeoPoint> {
        let recent = *self.recent.lock().unwrap();
        recent.ok_or_else(|| BackendError::NotFound(number.to_string()))
    }
}

/// Let spawned backend calls run up to their first real suspension point.
#[allow(dead_code)]
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// A point `meters` due north of `p`.
#[allow(dead_code)]
pub fn north_of(p: GeoPoint, meters: f64) -> GeoPoint {
    GeoPoint::new(p.latitude + meters / METERS_PER_DEGREE, p.longitude)
}

#[allow(dead_code)]
pub fn user_session() -> SessionContext {
    SessionContext::new("01012345678", ViewerRole::User)
}

#[allow(dead_code)]
pub fn station(number: u32, name: &str, center: GeoPoint) -> TransitZone {
    TransitZone::new(number, name, center)
}
