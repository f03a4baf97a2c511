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

//! Session flows against a local fake of the Passkey booking site.
//!
//! Run with:
//!     cargo test --test t_passkey_session_flows

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use conhousing_hotel_watch::{
    Credentials, InventorySource, PasskeyClient, PasskeyEndpoints, SearchCriteria, WatchError,
    extract_hotels,
};

const LIST_PAGE: &str = r#"<html><body>
<script type="application/json" id="last-search-results">
[{"name":"Westin","distanceFromEvent":2.0,"distanceUnit":1,"messageMap":null,
  "blocks":[{"name":"King","inventory":[{"rate":100.0,"available":1}]}]}]
</script></body></html>"#;

#[derive(Clone)]
struct FakePasskey {
    hits: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<String>>>,
    find_body: Arc<String>,
    search_status: StatusCode,
    registration_status: StatusCode,
}

impl FakePasskey {
    fn new(find_body: &str) -> Self {
        Self {
            hits: Arc::default(),
            bodies: Arc::default(),
            find_body: Arc::new(find_body.to_string()),
            search_status: StatusCode::OK,
            registration_status: StatusCode::OK,
        }
    }

    fn failing_search(mut self, status: StatusCode) -> Self {
        self.search_status = status;
        self
    }

    fn failing_registration(mut self, status: StatusCode) -> Self {
        self.registration_status = status;
        self
    }

    fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn handle(
    State(fake): State<FakePasskey>,
    method: Method,
    uri: Uri,
    body: String,
) -> (StatusCode, String) {
    let path = uri.path().to_string();
    fake.hits.lock().unwrap().push(format!("{} {}", method, path));
    if !body.is_empty() {
        fake.bodies.lock().unwrap().push(body);
    }

    if path.starts_with("/reg/") {
        (fake.registration_status, "<html></html>".to_string())
    } else if path.ends_with("/reservation/find") {
        (StatusCode::OK, fake.find_body.to_string())
    } else if path.ends_with("/rooms/select") || path.ends_with("/rooms/select/search") {
        (fake.search_status, String::new())
    } else if path.ends_with("/list/hotels") {
        (StatusCode::OK, LIST_PAGE.to_string())
    } else {
        (StatusCode::OK, "<html></html>".to_string())
    }
}

async fn spawn_fake(fake: FakePasskey) -> PasskeyClient {
    let app = Router::new().fallback(handle).with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    PasskeyClient::new(PasskeyEndpoints {
        site: format!("http://{}", addr),
        event_id: 1,
        owner_id: 2,
    })
    .unwrap()
}

fn key_criteria() -> SearchCriteria {
    SearchCriteria::builder(Credentials::Key {
        key: "ABCD1234-WXYZ".to_string(),
        auth: "deadbeef".to_string(),
    })
    .build()
    .unwrap()
}

fn reservation_criteria() -> SearchCriteria {
    SearchCriteria::builder(Credentials::Reservation {
        ack_num: "777".to_string(),
        surname: "Doe".to_string(),
    })
    .build()
    .unwrap()
}

#[tokio::test]
async fn test_key_flow_registers_searches_then_lists() {
    let fake = FakePasskey::new("{}");
    let client = spawn_fake(fake.clone()).await;

    let html = client.fetch_inventory(&key_criteria()).await.unwrap();

    assert_eq!(
        fake.hits(),
        vec![
            "GET /reg/ABCD1234-WXYZ/deadbeef",
            "POST /event/1/owner/2/rooms/select",
            "GET /event/1/owner/2/list/hotels",
        ]
    );
    let form = &fake.bodies()[0];
    assert!(form.contains("blockMap.blocks%5B0%5D.checkIn=2020-07-30"), "{}", form);
    assert!(form.contains("blockMap.blocks%5B0%5D.checkOut=2020-08-02"), "{}", form);
    assert_eq!(extract_hotels(&html).unwrap()[0].name, "Westin");
}

#[tokio::test]
async fn test_reservation_hash_is_looked_up_once() {
    let fake = FakePasskey::new(r#"{"ackNum":"777","hash":"h4sh"}"#);
    let client = spawn_fake(fake.clone()).await;
    let criteria = reservation_criteria();

    client.fetch_inventory(&criteria).await.unwrap();
    client.fetch_inventory(&criteria).await.unwrap();

    assert_eq!(
        fake.hits(),
        vec![
            "GET /event/1/owner/2/home",
            "POST /event/1/owner/2/reservation/find",
            "GET /event/1/owner/2/r/777/h4sh",
            "POST /event/1/owner/2/rooms/select/search",
            "GET /event/1/owner/2/list/hotels",
            "GET /event/1/owner/2/r/777/h4sh",
            "POST /event/1/owner/2/rooms/select/search",
            "GET /event/1/owner/2/list/hotels",
        ]
    );

    let bodies = fake.bodies();
    let find: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(find, serde_json::json!({"ackNum": "777", "lastName": "Doe"}));
    let search: serde_json::Value = serde_json::from_str(&bodies[1]).unwrap();
    assert_eq!(search["blockMap"]["blocks"][0]["checkIn"], "2020-07-30");
}

#[tokio::test]
async fn test_numeric_ack_num_is_accepted() {
    let fake = FakePasskey::new(r#"{"ackNum":777,"hash":"h4sh"}"#);
    let client = spawn_fake(fake).await;
    client
        .establish_session(&reservation_criteria())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_200_search_names_the_step() {
    let fake = FakePasskey::new("{}").failing_search(StatusCode::SERVICE_UNAVAILABLE);
    let client = spawn_fake(fake.clone()).await;

    let err = client.fetch_inventory(&key_criteria()).await.unwrap_err();
    assert!(matches!(err, WatchError::Transport { step: "Search", .. }));
    assert_eq!(err.to_string(), "Search failed: 503");
    assert!(
        !fake.hits().iter().any(|h| h.ends_with("/list/hotels")),
        "no listing after a failed search"
    );
}

#[tokio::test]
async fn test_wrong_reservation_is_a_session_error() {
    let fake = FakePasskey::new(r#"{"ackNum":"999","hash":"h4sh"}"#);
    let client = spawn_fake(fake).await;

    let err = client
        .establish_session(&reservation_criteria())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Reservation not found. Are your acknowledgement number and surname correct?"
    );
}

#[tokio::test]
async fn test_missing_hash_is_retried_next_cycle() {
    let fake = FakePasskey::new(r#"{"ackNum":"777"}"#);
    let client = spawn_fake(fake.clone()).await;
    let criteria = reservation_criteria();

    for _ in 0..2 {
        let err = client.establish_session(&criteria).await.unwrap_err();
        assert!(matches!(err, WatchError::Session(ref m) if m == "Hash missing from reservation data"));
    }
    let finds = fake
        .hits()
        .iter()
        .filter(|h| h.ends_with("/reservation/find"))
        .count();
    assert_eq!(finds, 2);
}

#[tokio::test]
async fn test_failed_registration_stops_before_search() {
    let fake = FakePasskey::new("{}").failing_registration(StatusCode::FORBIDDEN);
    let client = spawn_fake(fake.clone()).await;

    let err = client.fetch_inventory(&key_criteria()).await.unwrap_err();
    assert!(matches!(err, WatchError::Transport { step: "Session request", .. }));
    assert_eq!(err.to_string(), "Session request failed: 403");
    assert_eq!(fake.hits(), vec!["GET /reg/ABCD1234-WXYZ/deadbeef"]);
}

#[tokio::test]
async fn test_unreachable_site_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = PasskeyClient::new(PasskeyEndpoints {
        site: format!("http://{}", addr),
        event_id: 1,
        owner_id: 2,
    })
    .unwrap();

    let err = client.fetch_inventory(&key_criteria()).await.unwrap_err();
    match err {
        WatchError::Transport { step, reason } => {
            assert_eq!(step, "Session request");
            assert!(!reason.is_empty());
        }
        other => panic!("expected a transport error, got {:?}", other),
    }
}
