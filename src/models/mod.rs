// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the tracker.

pub mod event;
pub mod location;
pub mod session;
pub mod station;
pub mod zone;

pub use event::{CareEntry, CareMove, FenceEvent};
pub use location::{GeoPoint, LocationFix, Viewport};
pub use session::{SessionContext, ViewerRole};
pub use station::StationRecord;
pub use zone::{
    CareZone, CareZoneKind, Geofence, TransitZone, CARE_RADIUS_METERS, TRANSIT_RADIUS_METERS,
};
