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

//! # Room Classifier
//!
//! Side-effect free normalization of Passkey inventory into one row per
//! bookable block, and selection of the rows that should raise an alert.

use std::fmt;

use serde::Serialize;

use crate::passkey_results_parser::{DistanceUnit, RawBlock, RawHotel};
use crate::search_criteria::{MaxDistance, SearchCriteria};

/// Message marker of hotels with an indoor link to the convention center.
pub const CONNECTED_MARKER: &str = "Skywalk to ICC";
pub const SKYWALK: &str = "Skywalk";

/// One available room type at one hotel. Identity is the full tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedRoom {
    pub name: String,
    pub distance: String,
    /// Sum of every inventory rate of the block, truncated to an integer.
    pub price: i64,
    pub room: String,
}

/// A room that passed the distance, budget and name filters.
pub type AlertCandidate = NormalizedRoom;

impl NormalizedRoom {
    /// Fixed-width row of the console results table.
    pub fn table_row(&self) -> String {
        format!(
            "{:<15} ${:<9} {:<80} {}",
            self.distance, self.price, self.name, self.room
        )
    }
}

impl fmt::Display for NormalizedRoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ${} {} ({})",
            self.distance.trim(),
            self.price,
            self.name,
            self.room
        )
    }
}

/// Header matching [`NormalizedRoom::table_row`].
pub fn results_header() -> String {
    format!("{:<15} {:<10} {:<80} {}", "Distance", "Price", "Hotel", "Room")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Every available block, in page order.
    pub rooms: Vec<NormalizedRoom>,
    /// The subset of `rooms` eligible for an alert.
    pub alerts: Vec<AlertCandidate>,
}

pub fn classify(hotels: &[RawHotel], criteria: &SearchCriteria) -> Classification {
    let mut result = Classification::default();

    for hotel in hotels {
        let unit = hotel.unit();
        // Hotels miles away are only listed on request
        if unit == Some(DistanceUnit::Miles) && !criteria.show_all {
            continue;
        }
        let connected = hotel.message_mentions(CONNECTED_MARKER);
        let name = unescape(&hotel.name);
        let distance = format_distance(hotel, unit, connected);
        let close_enough = is_close_enough(hotel, unit, connected, criteria);

        for block in &hotel.blocks {
            if min_available(block) == 0 {
                continue;
            }
            let room = NormalizedRoom {
                name: name.clone(),
                distance: distance.clone(),
                price: block_price(block),
                room: unescape(&block.name),
            };

            let cheap_enough = room.price as f64 <= criteria.budget;
            let names_match =
                criteria.hotel_regex.is_match(&room.name) && criteria.room_regex.is_match(&room.room);
            if close_enough && cheap_enough && names_match {
                result.alerts.push(room.clone());
            }
            result.rooms.push(room);
        }
    }

    result
}

fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

fn format_distance(hotel: &RawHotel, unit: Option<DistanceUnit>, connected: bool) -> String {
    if connected {
        return SKYWALK.to_string();
    }
    let unit_name = unit.map_or("???", |u| u.as_str_name());
    format!("{:4.1} {}", hotel.distance_from_event, unit_name)
}

/// Yards, meters and kilometers only show up for hotels next to the venue,
/// so they always count as close.
fn is_close_enough(
    hotel: &RawHotel,
    unit: Option<DistanceUnit>,
    connected: bool,
    criteria: &SearchCriteria,
) -> bool {
    let short_unit = matches!(
        unit,
        Some(DistanceUnit::Yards | DistanceUnit::Meters | DistanceUnit::Kilometers)
    );
    let within_blocks = unit == Some(DistanceUnit::Blocks)
        && match criteria.max_distance {
            None => true,
            Some(MaxDistance::Blocks(max)) => hotel.distance_from_event <= max,
            Some(MaxDistance::Connected) => false,
        };
    let wants_connected = criteria.max_distance == Some(MaxDistance::Connected) && connected;

    short_unit || within_blocks || wants_connected || criteria.show_all
}

fn block_price(block: &RawBlock) -> i64 {
    block.inventory.iter().map(|inv| inv.rate).sum::<f64>() as i64
}

/// An empty inventory counts as sold out.
fn min_available(block: &RawBlock) -> i64 {
    block.inventory.iter().map(|inv| inv.available).min().unwrap_or(0)
}
