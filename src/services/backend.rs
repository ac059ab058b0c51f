// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Companion backend client.
//!
//! The trackers only see the [`Backend`] trait; [`HttpBackend`] implements it
//! with JSON POSTs against the configured base URL. Handles:
//! - Care zone lookup (404 is a distinguished "not configured")
//! - Care move history reports
//! - Transit fence-in / fence-out events
//! - Station catalog download
//! - Location push and target location polling

use crate::error::{BackendError, Result};
use crate::models::{GeoPoint, TransitZone};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Request body for lookups keyed by phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberRequest {
    pub number: String,
}

/// Care zone coordinates for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareZoneCoordinates {
    pub home_latitude: f64,
    pub home_longitude: f64,
    pub center_latitude: f64,
    pub center_longitude: f64,
}

impl CareZoneCoordinates {
    pub fn home(&self) -> GeoPoint {
        GeoPoint::new(self.home_latitude, self.home_longitude)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_latitude, self.center_longitude)
    }
}

/// One entry of a move history report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveHistoryEntry {
    pub name: String,
    /// ISO 8601 timestamp
    pub time: String,
}

impl MoveHistoryEntry {
    pub fn new(name: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            time: format_utc_rfc3339(time),
        }
    }
}

/// Payload for a care-zone move report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveReport {
    pub number: String,
    pub history: Vec<MoveHistoryEntry>,
}

/// Payload for transit fence-in and fence-out events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FenceRequest {
    pub number: String,
    pub station_identifier: String,
    pub name: String,
}

impl FenceRequest {
    pub fn new(number: &str, station: &TransitZone) -> Self {
        Self {
            number: number.to_string(),
            station_identifier: station.station_identifier(),
            name: station.name.clone(),
        }
    }
}

/// Payload for the periodic location push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub number: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Everything the trackers need from the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Home and center coordinates for `number`.
    async fn fetch_care_zones(&self, number: &str) -> Result<CareZoneCoordinates>;

    /// Record a move between the two care zones.
    async fn report_move(&self, report: &MoveReport) -> Result<()>;

    async fn fence_in(&self, request: &FenceRequest) -> Result<()>;

    async fn fence_out(&self, request: &FenceRequest) -> Result<()>;

    /// Raw station catalog rows; records are validated by the caller.
    async fn fetch_stations(&self) -> Result<Vec<serde_json::Value>>;

    /// Push the tracked user's latest fix.
    async fn save_location(&self, update: &LocationUpdate) -> Result<()>;

    /// Most recent location the backend holds for `number`.
    async fn recent_location(&self, number: &str) -> Result<GeoPoint>;
}

/// HTTP implementation of [`Backend`].
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and ignore the (opaque) response body.
    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        self.check_response(response).await?;
        Ok(())
    }

    /// POST a JSON body and parse a JSON response.
    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let response = self.check_response(response).await?;
        parse_body(response, path).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 404 {
            return Err(BackendError::NotFound(url));
        }

        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Parse a success body, treating an empty or `null` body as not found.
async fn parse_body<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
    let text = response.text().await?;
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(BackendError::NotFound(path.to_string()));
    }
    serde_json::from_str(trimmed).map_err(|e| BackendError::Decode(format!("{}: {}", path, e)))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_care_zones(&self, number: &str) -> Result<CareZoneCoordinates> {
        let body = NumberRequest {
            number: number.to_string(),
        };
        self.post_json("/geofence/getCareGeofence", &body).await
    }

    async fn report_move(&self, report: &MoveReport) -> Result<()> {
        self.post("/geofence/saveMoveHistory", report).await
    }

    async fn fence_in(&self, request: &FenceRequest) -> Result<()> {
        self.post("/geofence/UserfenceIn", request).await
    }

    async fn fence_out(&self, request: &FenceRequest) -> Result<()> {
        self.post("/geofence/UserfenceOut", request).await
    }

    async fn fetch_stations(&self) -> Result<Vec<serde_json::Value>> {
        let path = "/station/getStationList";
        let response = self.http.get(self.url(path)).send().await?;
        let response = self.check_response(response).await?;
        parse_body(response, path).await
    }

    async fn save_location(&self, update: &LocationUpdate) -> Result<()> {
        self.post("/user/saveUserLocation", update).await
    }

    async fn recent_location(&self, number: &str) -> Result<GeoPoint> {
        let body = NumberRequest {
            number: number.to_string(),
        };
        self.post_json("/user/getRecentUserLocation", &body).await
    }
}
