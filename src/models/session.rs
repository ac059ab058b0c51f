// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Who is looking at the map, and whose presence is being tracked.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Role of the person holding the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    /// The tracked person; fixes come from this device's GPS.
    User,
    /// A caregiver watching a selected target.
    Supporter,
}

impl FromStr for ViewerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(ViewerRole::User),
            "supporter" => Ok(ViewerRole::Supporter),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Explicit session context handed to every tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Phone number of the person whose zones and events are tracked.
    pub tracked_number: String,
    pub viewer_role: ViewerRole,
}

impl SessionContext {
    pub fn new(tracked_number: impl Into<String>, viewer_role: ViewerRole) -> Self {
        Self {
            tracked_number: tracked_number.into(),
            viewer_role,
        }
    }

    /// Resolve the tracked subject for a viewer.
    ///
    /// A user tracks their own number. A supporter tracks their selected
    /// target, and has nothing to track until one is selected.
    pub fn for_viewer(
        role: ViewerRole,
        own_number: &str,
        target_number: Option<&str>,
    ) -> Option<Self> {
        match role {
            ViewerRole::User => Some(Self::new(own_number, role)),
            ViewerRole::Supporter => target_number
                .filter(|n| !n.trim().is_empty())
                .map(|n| Self::new(n, role)),
        }
    }

    pub fn is_tracked_user(&self) -> bool {
        self.viewer_role == ViewerRole::User
    }
}
