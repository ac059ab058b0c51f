// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Edge-triggered geofence membership.
//!
//! Shared by the care and transit trackers. Each evaluation computes which
//! candidate zones contain the fix and diffs that against the previous
//! evaluation, so `entered` and `exited` fire once per transition.

use crate::distance::distance;
use crate::models::{Geofence, GeoPoint};
use std::collections::HashSet;

/// Zones that changed state in one evaluation.
#[derive(Debug)]
pub struct Transitions<'a, Z> {
    /// Every candidate zone that contains the fix.
    pub inside: Vec<&'a Z>,
    /// Zones that contain the fix now but did not last time.
    pub entered: Vec<&'a Z>,
    /// Zones that contained the fix last time but no longer do.
    pub exited: Vec<&'a Z>,
}

impl<Z> Transitions<'_, Z> {
    pub fn is_quiet(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// Whether `point` lies inside `zone` (boundary inclusive).
pub fn contains<Z: Geofence>(zone: &Z, point: GeoPoint) -> bool {
    distance(point, zone.center()) <= zone.radius_meters()
}

/// Previous-evaluation membership set for one kind of zone.
#[derive(Debug, Clone)]
pub struct MembershipTracker<I> {
    inside: HashSet<I>,
}

impl<I> Default for MembershipTracker<I> {
    fn default() -> Self {
        Self {
            inside: HashSet::new(),
        }
    }
}

impl<I: Clone + Eq + std::hash::Hash> MembershipTracker<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids inside as of the last evaluation.
    pub fn inside(&self) -> &HashSet<I> {
        &self.inside
    }

    pub fn is_inside(&self, id: &I) -> bool {
        self.inside.contains(id)
    }

    /// Evaluate `location` against `zones`.
    ///
    /// Returns `None` without touching state when there is no fix or no zone
    /// to test: a missing fix never means "left everything".
    ///
    /// Only candidates can exit. A zone that was inside but is missing from
    /// `zones` (scrolled out of view) is forgotten silently, and enters again
    /// from scratch once it is a candidate again.
    pub fn evaluate<'a, Z>(
        &mut self,
        location: Option<GeoPoint>,
        zones: impl IntoIterator<Item = &'a Z>,
    ) -> Option<Transitions<'a, Z>>
    where
        Z: Geofence<Id = I> + 'a,
    {
        let location = location?;
        let zones: Vec<&'a Z> = zones.into_iter().collect();
        if zones.is_empty() {
            return None;
        }

        let mut now_inside = HashSet::with_capacity(self.inside.len());
        let mut transitions = Transitions {
            inside: Vec::new(),
            entered: Vec::new(),
            exited: Vec::new(),
        };

        for zone in zones {
            let id = zone.fence_id();
            let was_inside = self.inside.contains(&id);

            if contains(zone, location) {
                if !was_inside {
                    transitions.entered.push(zone);
                }
                transitions.inside.push(zone);
                now_inside.insert(id);
            } else if was_inside {
                transitions.exited.push(zone);
            }
        }

        self.inside = now_inside;
        Some(transitions)
    }
}
