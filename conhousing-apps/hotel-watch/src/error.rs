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

//! # Errors
//!
//! Failure taxonomy shared by the session client, the results extractor and
//! the criteria builder.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    /// Network failure or non-200 response on a named request step.
    #[error("{step} failed: {reason}")]
    Transport { step: &'static str, reason: String },

    /// The reservation lookup did not yield a usable session.
    #[error("{0}")]
    Session(String),

    /// The results page did not contain the embedded search results.
    #[error("Failed to find search results")]
    ResultsNotFound,

    #[error("Failed to decode search results: {0}")]
    MalformedResults(#[source] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
}

impl WatchError {
    pub(crate) fn transport(step: &'static str, reason: impl ToString) -> Self {
        WatchError::Transport {
            step,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl ToString) -> Self {
        WatchError::Validation {
            field,
            reason: reason.to_string(),
        }
    }

    /// Cycle-local errors abort the current cycle only; the watcher keeps polling.
    pub fn is_cycle_local(&self) -> bool {
        !matches!(self, WatchError::Validation { .. })
    }
}
