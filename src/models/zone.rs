// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Circular geofences: personal care zones and transit stations.

use crate::models::GeoPoint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Radius of both care zones, in meters.
pub const CARE_RADIUS_METERS: f64 = 100.0;

/// Entry radius shared by every transit station, in meters.
pub const TRANSIT_RADIUS_METERS: f64 = 70.0;

/// A circle that the membership tracker can test fixes against.
pub trait Geofence {
    type Id: Clone + Eq + Hash;

    fn fence_id(&self) -> Self::Id;
    fn center(&self) -> GeoPoint;
    fn radius_meters(&self) -> f64;
}

/// Which of the two personal zones a care zone is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub enum CareZoneKind {
    Home,
    Center,
}

impl CareZoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CareZoneKind::Home => "home",
            CareZoneKind::Center => "center",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            CareZoneKind::Home => "Home",
            CareZoneKind::Center => "Center",
        }
    }

    fn style(&self) -> (&'static str, &'static str) {
        match self {
            CareZoneKind::Home => ("rgba(0, 122, 255, 0.5)", "rgba(0, 122, 255, 0.1)"),
            CareZoneKind::Center => ("rgba(255, 122, 0, 0.5)", "rgba(255, 122, 0, 0.1)"),
        }
    }
}

impl fmt::Display for CareZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A personal zone (home or day-care center) ready to be drawn as a circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub struct CareZone {
    pub id: CareZoneKind,
    pub name: String,
    pub center: GeoPoint,
    pub radius: f64,
    pub stroke_color: String,
    pub fill_color: String,
}

impl CareZone {
    /// Build a zone with the fixed radius and presentation hints for `kind`.
    pub fn new(kind: CareZoneKind, center: GeoPoint) -> Self {
        let (stroke, fill) = kind.style();
        Self {
            id: kind,
            name: kind.display_name().to_string(),
            center,
            radius: CARE_RADIUS_METERS,
            stroke_color: stroke.to_string(),
            fill_color: fill.to_string(),
        }
    }
}

impl Geofence for CareZone {
    type Id = CareZoneKind;

    fn fence_id(&self) -> CareZoneKind {
        self.id
    }

    fn center(&self) -> GeoPoint {
        self.center
    }

    fn radius_meters(&self) -> f64 {
        self.radius
    }
}

/// A bus or transfer station from the shared catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub struct TransitZone {
    pub station_number: u32,
    pub name: String,
    pub center: GeoPoint,
}

impl TransitZone {
    pub fn new(station_number: u32, name: impl Into<String>, center: GeoPoint) -> Self {
        Self {
            station_number,
            name: name.into(),
            center,
        }
    }

    /// Identifier the backend uses for this station's geofence.
    pub fn station_identifier(&self) -> String {
        format!("station-{}", self.station_number)
    }
}

impl Geofence for TransitZone {
    type Id = u32;

    fn fence_id(&self) -> u32 {
        self.station_number
    }

    fn center(&self) -> GeoPoint {
        self.center
    }

    fn radius_meters(&self) -> f64 {
        TRANSIT_RADIUS_METERS
    }
}
