// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - geofence tracking and backend plumbing.

pub mod backend;
pub mod care;
pub mod dispatch;
pub mod membership;
pub mod stations;
pub mod tracking;
pub mod transit;

pub use backend::{Backend, HttpBackend};
pub use care::{CareEvaluation, CareGeofenceService};
pub use dispatch::Dispatch;
pub use membership::{MembershipTracker, Transitions};
pub use stations::StationCatalog;
pub use tracking::{poll_target_locations, TrackingHandle, TrackingSession, TrackingSettings};
pub use transit::{DeliveryState, ExitBackoff, TransitGeofenceEventSender, TransitTick};
