// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Paypass tracker runner
//!
//! Runs one tracking session against the companion backend. A tracked user
//! feeds fixes as NDJSON on stdin (`{"latitude":..,"longitude":..}`, optional
//! RFC 3339 `timestamp`); a supporter polls the target's latest location.

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use paypass_tracker::{
    config::Config,
    models::{FenceEvent, GeoPoint, LocationFix, SessionContext, ViewerRole},
    services::{
        poll_target_locations, Backend, HttpBackend, StationCatalog, TrackingSession,
        TrackingSettings,
    },
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(api_url = %config.api_url, role = ?config.role, "Starting paypass tracker");

    let backend: Arc<dyn Backend> = Arc::new(
        HttpBackend::new(config.api_url.clone(), config.http_timeout)
            .context("Failed to create backend client")?,
    );

    let Some(session) = SessionContext::for_viewer(
        config.role,
        &config.number,
        config.target_number.as_deref(),
    ) else {
        tracing::warn!("Supporter has no target selected; nothing to track");
        return Ok(());
    };

    // Station catalog is fetched once per launch
    let stations = Arc::new(StationCatalog::fetch(backend.as_ref()).await);

    let tracking = TrackingSession::new(
        session.clone(),
        backend.clone(),
        stations,
        TrackingSettings::from(&config),
    );

    let handle = match session.viewer_role {
        ViewerRole::User => tracking.spawn(stdin_fixes()),
        ViewerRole::Supporter => tracking.spawn(poll_target_locations(
            backend.clone(),
            session.tracked_number.clone(),
            config.location_push_interval,
        )),
    };

    if let Some(mut events) = handle.subscribe() {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(FenceEvent::Entered(station)) => {
                        tracing::info!(station = %station.name, "Arrived at station");
                    }
                    Ok(FenceEvent::Exited(station)) => {
                        tracing::info!(station = %station.name, "Left station");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Fence event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    tokio::select! {
        _ = handle.finished() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping tracking session");
        }
    }

    Ok(())
}

/// One NDJSON line on stdin.
#[derive(Deserialize)]
struct FixLine {
    latitude: f64,
    longitude: f64,
    timestamp: Option<DateTime<Utc>>,
}

/// Read fixes from stdin until EOF. Malformed lines are skipped.
fn stdin_fixes() -> impl Stream<Item = LocationFix> + Send {
    let lines = BufReader::new(tokio::io::stdin()).lines();

    futures_util::stream::unfold(lines, |mut lines| async move {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match serde_json::from_str::<FixLine>(&line) {
                    Ok(fix) => {
                        let point = GeoPoint::new(fix.latitude, fix.longitude);
                        let fix = LocationFix::new(point, fix.timestamp.unwrap_or_else(Utc::now));
                        return Some((fix, lines));
                    }
                    Err(e) => tracing::warn!(error = %e, "Skipping malformed fix"),
                },
                Ok(None) => return None,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read fixes from stdin");
                    return None;
                }
            }
        }
    })
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("paypass_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
