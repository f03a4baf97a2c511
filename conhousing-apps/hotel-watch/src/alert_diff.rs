//!  Conhousing Hotel Watch
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Alert Diff
//!
//! Side-effect free comparison of consecutive alert sets, plus the
//! deduplication state carried from one polling cycle to the next.

use std::collections::HashSet;

use crate::room_classifier::AlertCandidate;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertDiff {
    /// In `previous` order.
    pub removed: Vec<AlertCandidate>,
    /// In `current` order.
    pub added: Vec<AlertCandidate>,
}

impl AlertDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Rooms that disappeared and appeared between two snapshots, compared on
/// every field.
pub fn diff(previous: &[AlertCandidate], current: &[AlertCandidate]) -> AlertDiff {
    let before: HashSet<&AlertCandidate> = previous.iter().collect();
    let after: HashSet<&AlertCandidate> = current.iter().collect();

    AlertDiff {
        removed: previous
            .iter()
            .filter(|room| !after.contains(room))
            .cloned()
            .collect(),
        added: current
            .iter()
            .filter(|room| !before.contains(room))
            .cloned()
            .collect(),
    }
}

/// What to tell the user after a cycle whose alert set changed.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertReport {
    /// Distinct hotels among the current alerts.
    pub hotel_count: usize,
    pub diff: AlertDiff,
    /// Every current alert, in page order.
    pub alerts: Vec<AlertCandidate>,
}

impl AlertReport {
    pub fn preamble(&self) -> String {
        format!(
            "{} {} near the ICC:",
            self.hotel_count,
            if self.hotel_count == 1 { "hotel" } else { "hotels" }
        )
    }

    /// Distinct hotel names among the current alerts, first-seen order.
    pub fn hotel_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.alerts
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

type AlertKey = (String, String);

/// The `(hotel, room)` keys and alert list of the last reported cycle.
///
/// Passed by value from cycle to cycle; a fresh state has reported nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    keys: HashSet<AlertKey>,
    reported: Vec<AlertCandidate>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reported(&self) -> &[AlertCandidate] {
        &self.reported
    }

    /// Fold one cycle's alerts into the state.
    ///
    /// Returns `None` when the set of alerted `(hotel, room)` pairs equals the
    /// last reported one; the state is then returned unchanged.
    pub fn advance(self, current: Vec<AlertCandidate>) -> (AlertState, Option<AlertReport>) {
        let keys: HashSet<AlertKey> = current
            .iter()
            .map(|a| (a.name.clone(), a.room.clone()))
            .collect();

        if keys == self.keys {
            tracing::info!("Skipped alerts (no changes in nearby hotel list)");
            return (self, None);
        }

        let hotel_count = current
            .iter()
            .map(|a| a.name.as_str())
            .collect::<HashSet<_>>()
            .len();
        let report = AlertReport {
            hotel_count,
            diff: diff(&self.reported, &current),
            alerts: current.clone(),
        };
        tracing::info!(
            "Triggered alerts: {} added, {} removed",
            report.diff.added.len(),
            report.diff.removed.len()
        );

        (
            AlertState {
                keys,
                reported: current,
            },
            Some(report),
        )
    }
}
