// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Station catalog records as served by the backend.

use crate::models::{GeoPoint, TransitZone};
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// One row of `/station/getStationList`.
///
/// Coordinates arrive as numbers from some deployments and as numeric
/// strings from others.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub station_number: u32,
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(deserialize_with = "lenient_f64")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[serde(deserialize_with = "lenient_f64")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl From<StationRecord> for TransitZone {
    fn from(r: StationRecord) -> Self {
        TransitZone::new(
            r.station_number,
            r.name,
            GeoPoint::new(r.latitude, r.longitude),
        )
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom)?,
    };
    if !value.is_finite() {
        return Err(serde::de::Error::custom(format!("non-finite coordinate: {}", value)));
    }
    Ok(value)
}
