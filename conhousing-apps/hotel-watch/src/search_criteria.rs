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

//! # Search Criteria
//!
//! Side-effect free construction and validation of the Passkey search
//! parameters, alert thresholds and credentials. Built once at startup and
//! never mutated afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::{Value, json};

use crate::error::WatchError;

/// Passkey event id of the GenCon housing block.
pub const EVENT_ID: u64 = 50023680;
/// Passkey owner id of the GenCon housing block.
pub const OWNER_ID: u64 = 10909638;

static PASSKEY_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://book\.passkey\.com/reg/([0-9A-Z]{8}-[0-9A-Z]{4})/([0-9a-f]{1,64})$")
        .unwrap()
});
static REG_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Z]{8}-[0-9A-Z]{4}$").unwrap());

/// First night the housing block can be booked.
pub fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 7, 25).unwrap()
}

/// Last day the housing block covers.
pub fn last_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 8, 4).unwrap()
}

/// Default check-in: the first day of the convention.
pub fn start_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 7, 30).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxDistance {
    /// Maximum distance, in blocks.
    Blocks(f64),
    /// Only skywalk-connected hotels are close enough.
    Connected,
}

impl FromStr for MaxDistance {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "connected" {
            return Ok(MaxDistance::Connected);
        }
        s.trim()
            .parse::<f64>()
            .map(MaxDistance::Blocks)
            .map_err(|_| WatchError::validation("max distance", format!("invalid float value: '{}'", s)))
    }
}

impl fmt::Display for MaxDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxDistance::Blocks(b) => write!(f, "{} blocks", b),
            MaxDistance::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Registration key and auth token, for attendees without a booking.
    Key { key: String, auth: String },
    /// Acknowledgement number and surname of an existing booking.
    Reservation { ack_num: String, surname: String },
}

impl Credentials {
    /// Parse a `https://book.passkey.com/reg/<KEY>/<AUTH>` link.
    pub fn from_url(url: &str) -> Result<Self, WatchError> {
        let caps = PASSKEY_URL
            .captures(url)
            .ok_or_else(|| WatchError::validation("url", format!("invalid passkey url: '{}'", url)))?;
        Ok(Credentials::Key {
            key: caps[1].to_string(),
            auth: caps[2].to_string(),
        })
    }

    /// Interpret a `--key` pair. Registration keys look like `XXXXXXXX-XXXX`;
    /// anything else is an acknowledgement number followed by a surname.
    pub fn from_pair(first: &str, second: &str) -> Result<Self, WatchError> {
        let first = first.trim();
        let second = second.trim();
        if first.is_empty() || second.is_empty() {
            return Err(WatchError::validation("key", "both values must be non-empty"));
        }
        if REG_KEY.is_match(first) {
            Ok(Credentials::Key {
                key: first.to_string(),
                auth: second.to_string(),
            })
        } else {
            Ok(Credentials::Reservation {
                ack_num: first.to_string(),
                surname: second.to_string(),
            })
        }
    }
}

fn compile_pattern(field: &'static str, pattern: &str) -> Result<Regex, WatchError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| WatchError::validation(field, format!("invalid regex '{}': {}", pattern, e)))
}

#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub guests: u32,
    pub rooms: u32,
    pub children: u32,
    /// Highest total rate that triggers an alert.
    pub budget: f64,
    /// `None` means any blocks-away hotel is close enough.
    pub max_distance: Option<MaxDistance>,
    pub hotel_regex: Regex,
    pub room_regex: Regex,
    pub show_all: bool,
    pub credentials: Credentials,
}

impl SearchCriteria {
    pub fn builder(credentials: Credentials) -> SearchCriteriaBuilder {
        SearchCriteriaBuilder {
            credentials,
            checkin: start_day(),
            checkout: start_day() + chrono::Duration::days(3),
            guests: 1,
            rooms: 1,
            children: 0,
            budget: 99999.0,
            max_distance: None,
            hotel_pattern: ".*".to_string(),
            room_pattern: ".*".to_string(),
            show_all: false,
        }
    }

    fn block_fields(&self) -> [(&'static str, String); 6] {
        [
            ("blockId", "0".to_string()),
            ("checkIn", self.checkin.format("%Y-%m-%d").to_string()),
            ("checkOut", self.checkout.format("%Y-%m-%d").to_string()),
            ("numberOfGuests", self.guests.to_string()),
            ("numberOfRooms", self.rooms.to_string()),
            ("numberOfChildren", self.children.to_string()),
        ]
    }

    /// URL-encoded form body for the registration-key search.
    pub fn search_form(&self) -> String {
        self.block_fields()
            .iter()
            .map(|(field, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(&format!("blockMap.blocks[0].{}", field)),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Nested JSON body for the existing-reservation search.
    pub fn search_json(&self) -> Value {
        let block: serde_json::Map<String, Value> = self
            .block_fields()
            .into_iter()
            .map(|(field, value)| (field.to_string(), Value::String(value)))
            .collect();
        json!({ "blockMap": { "blocks": [block] } })
    }
}

#[derive(Clone)]
pub struct SearchCriteriaBuilder {
    credentials: Credentials,
    checkin: NaiveDate,
    checkout: NaiveDate,
    guests: u32,
    rooms: u32,
    children: u32,
    budget: f64,
    max_distance: Option<MaxDistance>,
    hotel_pattern: String,
    room_pattern: String,
    show_all: bool,
}

impl SearchCriteriaBuilder {
    pub fn checkin(mut self, date: NaiveDate) -> Self {
        self.checkin = date;
        self
    }

    pub fn checkout(mut self, date: NaiveDate) -> Self {
        self.checkout = date;
        self
    }

    pub fn guests(mut self, guests: u32) -> Self {
        self.guests = guests;
        self
    }

    pub fn rooms(mut self, rooms: u32) -> Self {
        self.rooms = rooms;
        self
    }

    pub fn children(mut self, children: u32) -> Self {
        self.children = children;
        self
    }

    pub fn budget(mut self, budget: f64) -> Self {
        self.budget = budget;
        self
    }

    pub fn max_distance(mut self, max_distance: Option<MaxDistance>) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn hotel_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.hotel_pattern = pattern.into();
        self
    }

    pub fn room_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.room_pattern = pattern.into();
        self
    }

    pub fn show_all(mut self, show_all: bool) -> Self {
        self.show_all = show_all;
        self
    }

    pub fn build(self) -> Result<SearchCriteria, WatchError> {
        let window = first_day()..=last_day();
        for (field, date) in [("checkin", self.checkin), ("checkout", self.checkout)] {
            if !window.contains(&date) {
                return Err(WatchError::validation(
                    field,
                    format!("{} is outside the Gencon housing block window", date),
                ));
            }
        }
        if self.checkout <= self.checkin {
            return Err(WatchError::validation("checkout", "checkout must be after check-in"));
        }
        if self.guests == 0 {
            return Err(WatchError::validation("guests", "at least one guest is required"));
        }
        if self.rooms == 0 {
            return Err(WatchError::validation("rooms", "at least one room is required"));
        }
        if self.budget.is_nan() {
            return Err(WatchError::validation("budget", "budget must be a number"));
        }

        Ok(SearchCriteria {
            checkin: self.checkin,
            checkout: self.checkout,
            guests: self.guests,
            rooms: self.rooms,
            children: self.children,
            budget: self.budget,
            max_distance: self.max_distance,
            hotel_regex: compile_pattern("hotel regex", &self.hotel_pattern)?,
            room_regex: compile_pattern("room regex", &self.room_pattern)?,
            show_all: self.show_all,
            credentials: self.credentials,
        })
    }
}
