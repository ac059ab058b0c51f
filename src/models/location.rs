// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location fixes and the visible map region.

use chrono::{DateTime, Utc};
use geo::{coord, Intersects, Point, Rect};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/generated/")
)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<GeoPoint> for Point<f64> {
    fn from(p: GeoPoint) -> Self {
        Point::new(p.longitude, p.latitude)
    }
}

/// One sample from the platform location service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub point: GeoPoint,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(point: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Self { point, timestamp }
    }

    /// A fix stamped with the current wall clock.
    pub fn now(point: GeoPoint) -> Self {
        Self::new(point, Utc::now())
    }
}

/// The map region currently on screen, in the center/delta form map views use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl Viewport {
    /// Region centered on `center` spanning the given deltas (full width, degrees).
    pub fn around(center: GeoPoint, latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            latitude: center.latitude,
            longitude: center.longitude,
            latitude_delta,
            longitude_delta,
        }
    }

    fn bounds(&self) -> Rect<f64> {
        let half_lat = self.latitude_delta.abs() / 2.0;
        let half_lon = self.longitude_delta.abs() / 2.0;
        Rect::new(
            coord! { x: self.longitude - half_lon, y: self.latitude - half_lat },
            coord! { x: self.longitude + half_lon, y: self.latitude + half_lat },
        )
    }

    /// Whether `point` lies inside the region (edges included).
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.bounds().intersects(&Point::from(point))
    }
}
