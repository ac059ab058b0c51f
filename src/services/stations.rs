// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transit station catalog, downloaded once at startup.

use crate::models::{StationRecord, TransitZone};
use crate::services::backend::Backend;
use std::collections::HashMap;
use validator::Validate;

/// All transit stations known to the backend.
#[derive(Debug, Default, Clone)]
pub struct StationCatalog {
    stations: Vec<TransitZone>,
}

impl StationCatalog {
    pub fn new(stations: Vec<TransitZone>) -> Self {
        Self { stations }
    }

    /// Download the catalog.
    ///
    /// Failure is logged and yields an empty catalog; transit events are
    /// simply not produced until the next launch.
    pub async fn fetch(backend: &dyn Backend) -> Self {
        match backend.fetch_stations().await {
            Ok(rows) => {
                let catalog = Self::from_rows(rows);
                tracing::info!(count = catalog.len(), "Station catalog loaded");
                catalog
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load station catalog");
                Self::default()
            }
        }
    }

    /// Build a catalog from raw rows, skipping any that fail to parse or
    /// validate. A later duplicate station number replaces the earlier one.
    pub fn from_rows(rows: Vec<serde_json::Value>) -> Self {
        let mut stations: Vec<TransitZone> = Vec::with_capacity(rows.len());
        let mut index: HashMap<u32, usize> = HashMap::with_capacity(rows.len());

        for row in rows {
            let record: StationRecord = match serde_json::from_value(row) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unparseable station record");
                    continue;
                }
            };

            if let Err(e) = record.validate() {
                tracing::warn!(
                    station = record.station_number,
                    error = %e,
                    "Skipping invalid station record"
                );
                continue;
            }

            let zone = TransitZone::from(record);
            match index.get(&zone.station_number) {
                Some(&i) => {
                    tracing::warn!(station = zone.station_number, "Duplicate station number");
                    stations[i] = zone;
                }
                None => {
                    index.insert(zone.station_number, stations.len());
                    stations.push(zone);
                }
            }
        }

        Self { stations }
    }

    pub fn stations(&self) -> &[TransitZone] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_rows_skips_bad_records() {
        let catalog = StationCatalog::from_rows(vec![
            json!({"stationNumber": 1, "name": "Nowon", "latitude": 37.6544, "longitude": 127.0613}),
            json!({"stationNumber": 2, "name": "Broken", "latitude": 95.0, "longitude": 127.0}),
            json!({"name": "No number", "latitude": 37.6, "longitude": 127.0}),
            json!({"stationNumber": 3, "name": "Hagye", "latitude": "37.6364", "longitude": "127.0679"}),
        ]);

        let ids: Vec<u32> = catalog.stations().iter().map(|s| s.station_number).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_duplicate_station_replaced() {
        let catalog = StationCatalog::from_rows(vec![
            json!({"stationNumber": 1, "name": "Old", "latitude": 37.6, "longitude": 127.0}),
            json!({"stationNumber": 1, "name": "New", "latitude": 37.6, "longitude": 127.0}),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.stations()[0].name, "New");
    }
}
