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
//!
//! # Examples
//!
//! ```bash
//! SCRIPTS_CONFIG=scripts.json script-relay --webhook https://discord.com/api/webhooks/...
//! ```
//!
//! `scripts.json` lists the scripts to run:
//!
//! ```json
//! [{ "path": "./hotel-check.sh", "output_path": "hotels.log", "interval": 60 }]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use conhousing_hotel_watch::{
    CancellationToken, ChatChannel, ConsoleChannel, ScriptRelay, ScriptSpec, WebhookChannel,
    load_scripts, logging,
};

#[derive(Parser, Debug)]
#[command(name = "script-relay")]
#[command(version = "0.1.0")]
#[command(about = "Run scripts on a timer and forward their new output to chat")]
struct Args {
    #[arg(long, value_name = "FILE", env = "SCRIPTS_CONFIG", help = "JSON list of scripts")]
    config: PathBuf,
    #[arg(long, value_name = "URL", env = "CONHOUSING_WEBHOOK", help = "Chat webhook (stdout when absent)")]
    webhook: Option<String>,
    #[arg(long, value_name = "SECS", default_value = "1", help = "How long each script may run")]
    grace_secs: u64,
}

async fn relay<C: ChatChannel>(specs: Vec<ScriptSpec>, channel: C, grace: Duration) -> Result<()> {
    let stop = CancellationToken::new();
    let stop_on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop_on_signal.cancel();
        }
    });

    let mut relay = ScriptRelay::new(specs, channel, grace).await;
    relay.run(&stop).await
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let args = Args::parse();

    let specs = load_scripts(&args.config).await?;
    let grace = Duration::from_secs(args.grace_secs);
    match args.webhook {
        Some(url) => {
            let channel = WebhookChannel::new(url).context("Failed to create webhook channel")?;
            relay(specs, channel, grace).await
        }
        None => relay(specs, ConsoleChannel, grace).await,
    }
}
