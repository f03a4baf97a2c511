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

//! Polling cycles against a scripted inventory source: deduplication,
//! incremental diffs and failure isolation.
//!
//! Run with:
//!     cargo test --test t_watcher_cycles

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use conhousing_hotel_watch::{
    AlertReport, AlertSink, CancellationToken, Credentials, HotelWatcher, InventorySource,
    MaxDistance, PollCadence, SearchCriteria, WatchError,
};

struct ScriptedSource {
    pages: Mutex<VecDeque<Result<String, WatchError>>>,
}

impl ScriptedSource {
    fn new(pages: Vec<Result<String, WatchError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
        }
    }
}

#[async_trait]
impl InventorySource for ScriptedSource {
    async fn fetch_inventory(&self, _criteria: &SearchCriteria) -> Result<String, WatchError> {
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(WatchError::ResultsNotFound))
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<AlertReport>>>);

impl RecordingSink {
    fn reports(&self) -> Vec<AlertReport> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn label(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, report: &AlertReport) -> Result<()> {
        self.0.lock().unwrap().push(report.clone());
        Ok(())
    }
}

/// `(hotel, distance, rate, available)` per hotel, one "King" block each.
fn page(hotels: &[(&str, f64, f64, i64)]) -> String {
    let json: Vec<_> = hotels
        .iter()
        .map(|(name, distance, rate, available)| {
            serde_json::json!({
                "name": name,
                "distanceFromEvent": distance,
                "distanceUnit": 1,
                "messageMap": null,
                "blocks": [{"name": "King", "inventory": [{"rate": rate, "available": available}]}]
            })
        })
        .collect();
    format!(
        "<html><body><script type=\"application/json\" id=\"last-search-results\">{}</script></body></html>",
        serde_json::Value::Array(json)
    )
}

fn criteria() -> SearchCriteria {
    SearchCriteria::builder(Credentials::Key {
        key: "ABCD1234-WXYZ".to_string(),
        auth: "0123abcd".to_string(),
    })
    .budget(150.0)
    .max_distance(Some(MaxDistance::Blocks(5.0)))
    .build()
    .unwrap()
}

fn watcher(
    pages: Vec<Result<String, WatchError>>,
) -> (HotelWatcher<ScriptedSource>, RecordingSink) {
    let sink = RecordingSink::default();
    let watcher = HotelWatcher::new(
        ScriptedSource::new(pages),
        criteria(),
        vec![Box::new(sink.clone())],
    );
    (watcher, sink)
}

#[tokio::test]
async fn test_scenario_close_cheap_room_alerts() {
    let (mut watcher, sink) = watcher(vec![Ok(page(&[("Westin", 2.0, 100.0, 1)]))]);
    let outcome = watcher.run_once().await.expect("cycle succeeds");

    assert_eq!(outcome.rooms.len(), 1);
    assert_eq!(outcome.rooms[0].distance, " 2.0 blocks");
    assert_eq!(outcome.rooms[0].price, 100);
    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].preamble(), "1 hotel near the ICC:");
    assert_eq!(reports[0].diff.added, outcome.rooms);
}

#[tokio::test]
async fn test_scenario_sold_out_room_is_silent() {
    let (mut watcher, sink) = watcher(vec![Ok(page(&[("Westin", 2.0, 80.0, 0)]))]);
    let outcome = watcher.run_once().await.expect("cycle succeeds");
    assert!(outcome.rooms.is_empty());
    assert!(outcome.report.is_none());
    assert!(sink.reports().is_empty());
}

#[tokio::test]
async fn test_identical_cycles_notify_once() {
    let same = page(&[("Westin", 2.0, 100.0, 1)]);
    let (mut watcher, sink) = watcher(vec![Ok(same.clone()), Ok(same)]);
    watcher.run_cycle().await.unwrap();
    let second = watcher.run_cycle().await.unwrap();
    assert!(second.report.is_none());
    assert_eq!(sink.reports().len(), 1);
}

#[tokio::test]
async fn test_new_room_is_reported_as_added_only() {
    let (mut watcher, sink) = watcher(vec![
        Ok(page(&[("Westin", 2.0, 100.0, 1)])),
        Ok(page(&[("Westin", 2.0, 100.0, 1), ("Conrad", 1.0, 140.0, 2)])),
    ]);
    watcher.run_cycle().await.unwrap();
    watcher.run_cycle().await.unwrap();

    let reports = sink.reports();
    assert_eq!(reports.len(), 2);
    let second = &reports[1];
    assert_eq!(second.diff.added.len(), 1);
    assert_eq!(second.diff.added[0].name, "Conrad");
    assert!(second.diff.removed.iter().all(|r| r.name != "Conrad"));
    assert_eq!(second.preamble(), "2 hotels near the ICC:");
}

#[tokio::test]
async fn test_failed_cycle_keeps_dedup_state() {
    let same = page(&[("Westin", 2.0, 100.0, 1)]);
    let (mut watcher, sink) = watcher(vec![
        Ok(same.clone()),
        Err(WatchError::Transport {
            step: "Search",
            reason: "503".to_string(),
        }),
        Ok("<html><body>Session expired</body></html>".to_string()),
        Ok(same),
    ]);
    watcher.run_cycle().await.unwrap();

    let err = watcher.run_cycle().await.unwrap_err();
    assert_eq!(err.to_string(), "Search failed: 503");
    let err = watcher.run_cycle().await.unwrap_err();
    assert!(matches!(err, WatchError::ResultsNotFound));

    let after = watcher.run_cycle().await.unwrap();
    assert!(after.report.is_none(), "failures must not reset the alert set");
    assert_eq!(sink.reports().len(), 1);
}

#[tokio::test]
async fn test_rooms_leaving_are_reported_as_removed() {
    let (mut watcher, sink) = watcher(vec![
        Ok(page(&[("Westin", 2.0, 100.0, 1)])),
        Ok(page(&[("Westin", 2.0, 100.0, 0)])),
    ]);
    watcher.run_cycle().await.unwrap();
    watcher.run_cycle().await.unwrap();

    let reports = sink.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].preamble(), "0 hotels near the ICC:");
    assert_eq!(reports[1].diff.removed.len(), 1);
    assert!(reports[1].diff.added.is_empty());
}

#[tokio::test]
async fn test_loop_survives_errors_until_stopped() {
    let (mut watcher, sink) = watcher(vec![
        Err(WatchError::Session("Hash missing from reservation data".to_string())),
        Ok(page(&[("Westin", 2.0, 100.0, 1)])),
    ]);
    let stop = CancellationToken::new();
    let stopper = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        stopper.cancel();
    });

    let cadence = PollCadence::every(Duration::from_millis(20)).unwrap();
    watcher.run(cadence, &stop).await;

    assert_eq!(sink.reports().len(), 1);
}

#[tokio::test]
async fn test_fire_test_alerts_reaches_every_sink() {
    let (watcher, sink) = watcher(Vec::new());
    assert_eq!(watcher.fire_test_alerts().await, 1);
    assert_eq!(sink.reports()[0].diff.added[0].name, "Test Hotel");
}
