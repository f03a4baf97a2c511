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

//! # Passkey Results Parser
//!
//! Side-effect free extraction of the hotel inventory that Passkey embeds
//! in the hotel list page as a JSON `<script>` element.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WatchError;

/// `id` of the script element carrying the last search results.
pub const RESULTS_SCRIPT_ID: &str = "last-search-results";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Blocks,
    Yards,
    Miles,
    Meters,
    Kilometers,
}

impl DistanceUnit {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(DistanceUnit::Blocks),
            2 => Some(DistanceUnit::Yards),
            3 => Some(DistanceUnit::Miles),
            4 => Some(DistanceUnit::Meters),
            5 => Some(DistanceUnit::Kilometers),
            _ => None,
        }
    }

    pub fn as_str_name(&self) -> &'static str {
        match self {
            DistanceUnit::Blocks => "blocks",
            DistanceUnit::Yards => "yards",
            DistanceUnit::Miles => "miles",
            DistanceUnit::Meters => "meters",
            DistanceUnit::Kilometers => "kilometers",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHotel {
    /// HTML-escaped hotel name.
    pub name: String,
    #[serde(default)]
    pub distance_from_event: f64,
    #[serde(default)]
    pub distance_unit: i64,
    /// Free-form messages; a string in practice, tolerated as any JSON value.
    #[serde(default)]
    pub message_map: Value,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

impl RawHotel {
    pub fn unit(&self) -> Option<DistanceUnit> {
        DistanceUnit::from_code(self.distance_unit)
    }

    /// Whether the hotel's messages mention `marker`.
    pub fn message_mentions(&self, marker: &str) -> bool {
        match &self.message_map {
            Value::String(s) => s.contains(marker),
            Value::Object(map) => map.iter().any(|(k, v)| {
                k == marker || v.as_str().is_some_and(|s| s.contains(marker))
            }),
            Value::Array(items) => items
                .iter()
                .any(|v| v.as_str().is_some_and(|s| s.contains(marker))),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBlock {
    /// HTML-escaped room type name.
    pub name: String,
    #[serde(default)]
    pub inventory: Vec<RawInventory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInventory {
    pub rate: f64,
    pub available: i64,
}

/// Pull the embedded hotel list out of a Passkey hotel list page.
///
/// A missing script element means the session expired, the search matched
/// nothing, or the page layout changed; it is reported as
/// [`WatchError::ResultsNotFound`] and never as an empty list.
pub fn extract_hotels(html: &str) -> Result<Vec<RawHotel>, WatchError> {
    let payload = find_results_script(html).ok_or(WatchError::ResultsNotFound)?;
    serde_json::from_str(&payload).map_err(WatchError::MalformedResults)
}

fn find_results_script(html: &str) -> Option<String> {
    let script = Selector::parse("script[id]").unwrap();
    let document = Html::parse_document(html);

    document
        .select(&script)
        .find(|el| {
            el.value()
                .attr("id")
                .is_some_and(|id| id.eq_ignore_ascii_case(RESULTS_SCRIPT_ID))
        })
        .map(|el| el.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
}
