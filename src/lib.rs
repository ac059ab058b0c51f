// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Paypass tracker: geofence and presence tracking for a caregiving companion app
//!
//! This crate turns a stream of GPS fixes into care-zone moves and transit
//! station fence-in / fence-out events, and reports them to the companion
//! backend.

pub mod config;
pub mod distance;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

pub use distance::distance;
