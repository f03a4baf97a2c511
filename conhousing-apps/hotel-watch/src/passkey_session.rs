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

//! # Passkey Session Client
//!
//! Effectful (network) operations against Passkey: seeding the session
//! cookies, running the search for either credential kind, and fetching the
//! hotel list page. Every request is a named step; any failure aborts the
//! whole operation with that step's name. Retrying is the caller's job.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use wreq::redirect::Policy;
use wreq_util::Emulation;

use crate::error::WatchError;
use crate::search_criteria::{Credentials, EVENT_ID, OWNER_ID, SearchCriteria};

const PASSKEY_SITE: &str = "https://book.passkey.com";

/// URL layout of one Passkey event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasskeyEndpoints {
    pub site: String,
    pub event_id: u64,
    pub owner_id: u64,
}

impl Default for PasskeyEndpoints {
    fn default() -> Self {
        Self {
            site: PASSKEY_SITE.to_string(),
            event_id: EVENT_ID,
            owner_id: OWNER_ID,
        }
    }
}

impl PasskeyEndpoints {
    pub fn with_site(site: impl Into<String>) -> Self {
        Self {
            site: site.into().trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    fn event_base(&self) -> String {
        format!("{}/event/{}/owner/{}", self.site, self.event_id, self.owner_id)
    }

    pub fn registration(&self, key: &str, auth: &str) -> String {
        format!("{}/reg/{}/{}", self.site, key, auth)
    }

    pub fn home(&self) -> String {
        format!("{}/home", self.event_base())
    }

    pub fn reservation_find(&self) -> String {
        format!("{}/reservation/find", self.event_base())
    }

    pub fn reservation(&self, ack_num: &str, hash: &str) -> String {
        format!("{}/r/{}/{}", self.event_base(), ack_num, hash)
    }

    pub fn rooms_select(&self) -> String {
        format!("{}/rooms/select", self.event_base())
    }

    pub fn rooms_search(&self) -> String {
        format!("{}/rooms/select/search", self.event_base())
    }

    pub fn list_hotels(&self) -> String {
        format!("{}/list/hotels", self.event_base())
    }

    /// Page a user should open to book by hand.
    pub fn booking_page(&self, credentials: &Credentials) -> String {
        match credentials {
            Credentials::Key { key, auth } => self.registration(key, auth),
            Credentials::Reservation { .. } => self.home(),
        }
    }
}

/// Something that can run a search and hand back the hotel list page.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn fetch_inventory(&self, criteria: &SearchCriteria) -> Result<String, WatchError>;
}

#[derive(Debug, Deserialize)]
struct ReservationLookup {
    #[serde(rename = "ackNum", default)]
    ack_num: Value,
    #[serde(default)]
    hash: Option<String>,
}

impl ReservationLookup {
    fn matches(&self, ack_num: &str) -> bool {
        match &self.ack_num {
            Value::String(s) => s == ack_num,
            Value::Number(n) => n.to_string() == ack_num,
            _ => false,
        }
    }
}

pub struct PasskeyClient {
    client: wreq::Client,
    endpoints: PasskeyEndpoints,
    /// Reservation hash, looked up once per process and never refreshed.
    reservation_hash: OnceCell<String>,
}

impl PasskeyClient {
    pub fn new(endpoints: PasskeyEndpoints) -> anyhow::Result<Self> {
        let client = wreq::Client::builder()
            .emulation(Emulation::Safari18_5)
            .cookie_store(true)
            .redirect(Policy::default())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoints,
            reservation_hash: OnceCell::new(),
        })
    }

    pub fn endpoints(&self) -> &PasskeyEndpoints {
        &self.endpoints
    }

    async fn send(
        &self,
        step: &'static str,
        request: wreq::RequestBuilder,
    ) -> Result<wreq::Response, WatchError> {
        let response = request
            .send()
            .await
            .map_err(|e| WatchError::transport(step, e))?;
        let status = response.status();
        tracing::debug!("[{}] HTTP Status: {}", step, status.as_u16());
        if status.as_u16() != 200 {
            return Err(WatchError::transport(step, status.as_u16()));
        }
        Ok(response)
    }

    /// Seed the session cookies and run the search for `criteria`.
    pub async fn establish_session(&self, criteria: &SearchCriteria) -> Result<(), WatchError> {
        match &criteria.credentials {
            Credentials::Key { key, auth } => self.search_new(key, auth, criteria).await,
            Credentials::Reservation { ack_num, surname } => {
                self.search_existing(ack_num, surname, criteria).await
            }
        }
    }

    /// Search with a registration key, for attendees without a booking yet.
    async fn search_new(
        &self,
        key: &str,
        auth: &str,
        criteria: &SearchCriteria,
    ) -> Result<(), WatchError> {
        self.send(
            "Session request",
            self.client.get(self.endpoints.registration(key, auth)),
        )
        .await?;
        self.send(
            "Search",
            self.client
                .post(self.endpoints.rooms_select())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(criteria.search_form()),
        )
        .await?;
        Ok(())
    }

    /// Search through an existing booking's acknowledgement number.
    async fn search_existing(
        &self,
        ack_num: &str,
        surname: &str,
        criteria: &SearchCriteria,
    ) -> Result<(), WatchError> {
        let hash = self
            .reservation_hash
            .get_or_try_init(|| self.find_reservation(ack_num, surname))
            .await?;

        self.send(
            "Loading existing reservation",
            self.client.get(self.endpoints.reservation(ack_num, hash)),
        )
        .await?;
        self.send(
            "Search",
            self.client
                .post(self.endpoints.rooms_search())
                .json(&criteria.search_json()),
        )
        .await?;
        Ok(())
    }

    async fn find_reservation(&self, ack_num: &str, surname: &str) -> Result<String, WatchError> {
        self.send("Session request", self.client.get(self.endpoints.home()))
            .await?;
        let response = self
            .send(
                "Finding reservation",
                self.client
                    .post(self.endpoints.reservation_find())
                    .json(&json!({ "ackNum": ack_num, "lastName": surname })),
            )
            .await?;

        let body = response
            .text()
            .await
            .map_err(|e| WatchError::transport("Finding reservation", e))?;
        let lookup: ReservationLookup = serde_json::from_str(&body)
            .map_err(|e| WatchError::Session(format!("Failed to decode reservation: {}", e)))?;

        if !lookup.matches(ack_num) {
            return Err(WatchError::Session(
                "Reservation not found. Are your acknowledgement number and surname correct?"
                    .to_string(),
            ));
        }
        let hash = lookup
            .hash
            .ok_or_else(|| WatchError::Session("Hash missing from reservation data".to_string()))?;
        tracing::info!("Found reservation {}", ack_num);
        Ok(hash)
    }

    /// Fetch the hotel list page of the current session.
    pub async fn fetch_results(&self) -> Result<String, WatchError> {
        let response = self
            .send("List", self.client.get(self.endpoints.list_hotels()))
            .await?;
        let body = response
            .text()
            .await
            .map_err(|e| WatchError::transport("List", e))?;
        tracing::debug!("Hotel list: {} KB", body.len() / 1024);
        Ok(body)
    }
}

#[async_trait]
impl InventorySource for PasskeyClient {
    async fn fetch_inventory(&self, criteria: &SearchCriteria) -> Result<String, WatchError> {
        self.establish_session(criteria).await?;
        self.fetch_results().await
    }
}
