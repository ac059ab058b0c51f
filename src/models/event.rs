// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Events published by the trackers.

use crate::models::{CareZoneKind, TransitZone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Transit fence transition acknowledged by the backend.
///
/// `Entered` is what the presentation layer turns into a transient toast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "station", rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub enum FenceEvent {
    Entered(TransitZone),
    Exited(TransitZone),
}

/// One side of a care-zone move: the zone and when it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareEntry {
    pub kind: CareZoneKind,
    pub at: DateTime<Utc>,
}

/// A move between the two care zones within the reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CareMove {
    pub from: CareEntry,
    pub to: CareEntry,
}
