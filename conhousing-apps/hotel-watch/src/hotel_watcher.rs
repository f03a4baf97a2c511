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

//! # Hotel Watcher
//!
//! The polling loop: search, extract, classify, diff, notify. One cycle runs
//! at a time and a failed cycle never stops the loop.

use conhousing_poll_cadence::{CancellationToken, PollCadence};

use crate::alert_diff::{AlertReport, AlertState};
use crate::alert_sinks::{AlertSink, deliver_all, test_report};
use crate::error::WatchError;
use crate::passkey_results_parser::extract_hotels;
use crate::passkey_session::InventorySource;
use crate::room_classifier::{Classification, NormalizedRoom, classify, results_header};
use crate::search_criteria::SearchCriteria;

/// Result of one successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Every available room, eligible for alerts or not.
    pub rooms: Vec<NormalizedRoom>,
    /// `None` when the alert set did not change.
    pub report: Option<AlertReport>,
}

pub struct HotelWatcher<S> {
    source: S,
    criteria: SearchCriteria,
    sinks: Vec<Box<dyn AlertSink>>,
    alerts: AlertState,
}

impl<S: InventorySource> HotelWatcher<S> {
    pub fn new(source: S, criteria: SearchCriteria, sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self {
            source,
            criteria,
            sinks,
            alerts: AlertState::new(),
        }
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    /// One full search-to-notification pass.
    ///
    /// The alert state only moves forward once the page was fetched and
    /// parsed; sink failures are logged and do not fail the cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, WatchError> {
        tracing::debug!("Searching...");
        let html = self.source.fetch_inventory(&self.criteria).await?;
        let hotels = extract_hotels(&html)?;
        let Classification { rooms, alerts } = classify(&hotels, &self.criteria);
        log_results(&rooms);

        let (next, report) = std::mem::take(&mut self.alerts).advance(alerts);
        self.alerts = next;
        tracing::debug!("{} alert(s) in the reported baseline", self.alerts.reported().len());

        if let Some(report) = &report {
            tracing::info!("{}", report.preamble());
            let delivered = deliver_all(&self.sinks, report).await;
            tracing::debug!("Alert delivered through {}/{} sinks", delivered, self.sinks.len());
        }

        Ok(CycleOutcome { rooms, report })
    }

    /// Poll until `stop` is cancelled or a cycle hits a non-recoverable error.
    /// An in-flight cycle always finishes.
    pub async fn run(&mut self, mut cadence: PollCadence, stop: &CancellationToken) {
        tracing::info!(
            "Polling every {:?} (plus jitter) with {} alert sink(s)",
            cadence.interval(),
            self.sinks.len()
        );
        while cadence.tick(stop).await {
            match self.run_cycle().await {
                Ok(_) => {}
                Err(e) if e.is_cycle_local() => {
                    tracing::error!("Cycle {} failed: {}", cadence.ticks(), e);
                }
                Err(e) => {
                    tracing::error!("Cycle {} failed, giving up: {}", cadence.ticks(), e);
                    break;
                }
            }
        }
        tracing::info!("Stopped polling after {} cycle(s)", cadence.ticks());
    }

    /// Run a single cycle, returning its error instead of logging it.
    pub async fn run_once(&mut self) -> Result<CycleOutcome, WatchError> {
        self.run_cycle().await
    }

    /// Push a synthetic alert through every sink without searching.
    pub async fn fire_test_alerts(&self) -> usize {
        let report = test_report();
        tracing::info!("Sending test alert through {} sink(s)", self.sinks.len());
        deliver_all(&self.sinks, &report).await
    }
}

fn log_results(rooms: &[NormalizedRoom]) {
    tracing::info!(
        "Results:   ({})",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if rooms.is_empty() {
        return;
    }
    tracing::info!("   {}", results_header());
    for room in rooms {
        tracing::info!("{}", room.table_row());
    }
}
