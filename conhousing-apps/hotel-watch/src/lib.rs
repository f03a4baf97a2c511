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

// Library for conhousing-hotel-watch
// Passkey housing block watcher with chat alerts

mod alert_diff;
mod alert_sinks;
mod chat_channel;
mod error;
mod hotel_watcher;
pub mod logging;
mod passkey_results_parser;
mod passkey_session;
mod room_classifier;
mod script_relay;
mod search_criteria;

pub use alert_diff::{AlertDiff, AlertReport, AlertState, diff};
pub use alert_sinks::{
    AlertSink, BrowserAlert, ChatAlerts, CommandAlert, EmailAlert, PopupAlert, deliver_all,
    diff_lines, email_body, report_messages, test_report,
};
pub use chat_channel::{
    ChatChannel, ConsoleChannel, MAX_MESSAGE_LEN, WebhookChannel, fenced_chunks, post_chunks,
};
pub use error::WatchError;
pub use hotel_watcher::{CycleOutcome, HotelWatcher};
pub use passkey_results_parser::{
    DistanceUnit, RESULTS_SCRIPT_ID, RawBlock, RawHotel, RawInventory, extract_hotels,
};
pub use passkey_session::{InventorySource, PasskeyClient, PasskeyEndpoints};
pub use room_classifier::{
    AlertCandidate, CONNECTED_MARKER, Classification, NormalizedRoom, classify, results_header,
};
pub use script_relay::{ScriptRelay, ScriptSpec, load_scripts, read_new_output};
pub use search_criteria::{
    Credentials, EVENT_ID, MaxDistance, OWNER_ID, SearchCriteria, SearchCriteriaBuilder, first_day,
    last_day, start_day,
};

// Re-exported so binaries and tests share the cadence types
pub use conhousing_poll_cadence::{CancellationToken, PollCadence};
