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
//! ## Watch with a registration link, alert on a chat webhook
//!
//! ```bash
//! hotel-watch --url https://book.passkey.com/reg/ABCD1234-WXYZ/0123abcd \
//!     --webhook https://discord.com/api/webhooks/... --max-distance 4 --budget 1200
//! ```
//!
//! ## Existing booking, skywalk hotels only, search once
//!
//! ```bash
//! hotel-watch --key 123456789 Smith --connected --once
//! ```
//!
//! ## Check that alerts arrive
//!
//! ```bash
//! hotel-watch --key ABCD1234-WXYZ 0123abcd --cmd notify-hotels --test
//! ```

use std::time::Duration;

use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use clap::Parser;
use conhousing_hotel_watch::{
    AlertSink, BrowserAlert, CancellationToken, ChatAlerts, CommandAlert, ConsoleChannel,
    Credentials, EmailAlert, PopupAlert, HotelWatcher, MaxDistance, PasskeyClient, PasskeyEndpoints, PollCadence,
    SearchCriteria, WatchError, WebhookChannel, logging, start_day,
};

#[derive(Parser, Debug)]
#[command(name = "hotel-watch")]
#[command(version = "0.1.0")]
#[command(about = "Watch the GenCon Passkey housing block and alert on new rooms")]
#[command(group(clap::ArgGroup::new("credentials").required(true).args(["key", "url"])))]
struct Args {
    #[arg(long, default_value = "1", help = "Number of guests")]
    guests: u32,
    #[arg(long, default_value = "0", help = "Number of children")]
    children: u32,
    #[arg(long, default_value = "1", help = "Number of rooms")]
    rooms: u32,
    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "wednesday", help = "Check in")]
    checkin: Option<String>,
    #[arg(long, help = "Check in on Wednesday")]
    wednesday: bool,
    #[arg(long, value_name = "YYYY-MM-DD", help = "Check out")]
    checkout: Option<String>,
    #[arg(
        long,
        value_name = "BLOCKS",
        conflicts_with = "connected",
        help = "Max hotel distance that triggers an alert (or 'connected' to require skywalk hotels)"
    )]
    max_distance: Option<String>,
    #[arg(long, help = "Shorthand for --max-distance connected")]
    connected: bool,
    #[arg(
        long,
        value_name = "PRICE",
        default_value = "99999",
        help = "Max total rate (not counting taxes/fees) that triggers an alert"
    )]
    budget: f64,
    #[arg(long, value_name = "PATTERN", default_value = ".*", help = "Regular expression to match hotel name against")]
    hotel_regex: String,
    #[arg(long, value_name = "PATTERN", default_value = ".*", help = "Regular expression to match room against")]
    room_regex: String,
    #[arg(long, help = "Show all rooms, even if miles away")]
    show_all: bool,
    #[arg(long, value_name = "MINS", default_value = "1", conflicts_with = "once", help = "Search every MINS minute(s)")]
    delay: u64,
    #[arg(long, value_name = "FACTOR", default_value = "0.5", help = "Random extra delay, as a fraction of --delay")]
    jitter: f64,
    #[arg(long, help = "Search once and exit")]
    once: bool,
    #[arg(long, help = "Trigger every specified alert and exit")]
    test: bool,
    #[arg(
        long,
        num_args = 2,
        value_names = ["KEY", "AUTH"],
        help = "Registration key and auth token, or acknowledgement number and surname"
    )]
    key: Option<Vec<String>>,
    #[arg(long, value_name = "URL", help = "Passkey URL containing your key")]
    url: Option<String>,
    #[arg(long, help = "Show a desktop popup")]
    popup: bool,
    #[arg(long = "cmd", value_name = "CMD", help = "Run CMD with each hotel name as an argument")]
    cmds: Vec<String>,
    #[arg(long, help = "Open the Passkey website in the default browser")]
    browser: bool,
    #[arg(long, num_args = 3, value_names = ["HOST", "FROM", "TO"], help = "Send an e-mail")]
    email: Option<Vec<String>>,
    #[arg(long, value_name = "URL", env = "CONHOUSING_WEBHOOK", help = "Post alerts to a chat webhook")]
    webhook: Option<String>,
    #[arg(long, help = "Print alerts to stdout (default when no other alert is set)")]
    console: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, WatchError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| WatchError::Validation {
        field: "date",
        reason: format!("{} is not a date in the form YYYY-MM-DD", s),
    })
}

/// Turn parsed flags into validated search criteria.
fn criteria_from_args(args: &Args) -> Result<SearchCriteria, WatchError> {
    let credentials = match (&args.url, &args.key) {
        (Some(url), _) => Credentials::from_url(url)?,
        (None, Some(pair)) if pair.len() == 2 => Credentials::from_pair(&pair[0], &pair[1])?,
        _ => {
            return Err(WatchError::Validation {
                field: "key",
                reason: "one of --key KEY AUTH or --url URL is required".to_string(),
            });
        }
    };

    let checkin = if args.wednesday {
        start_day() - chrono::Duration::days(1)
    } else {
        args.checkin.as_deref().map(parse_date).transpose()?.unwrap_or_else(start_day)
    };
    let checkout = args
        .checkout
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| start_day() + chrono::Duration::days(3));
    let max_distance = if args.connected {
        Some(MaxDistance::Connected)
    } else {
        args
            .max_distance
            .as_deref()
            .map(str::parse::<MaxDistance>)
            .transpose()?
    };

    SearchCriteria::builder(credentials)
        .checkin(checkin)
        .checkout(checkout)
        .guests(args.guests)
        .children(args.children)
        .rooms(args.rooms)
        .budget(args.budget)
        .max_distance(max_distance)
        .hotel_pattern(args.hotel_regex.as_str())
        .room_pattern(args.room_regex.as_str())
        .show_all(args.show_all)
        .build()
}

fn cadence_from_args(args: &Args) -> Result<PollCadence> {
    let secs = args.delay.checked_mul(60).ok_or_else(|| WatchError::Validation {
        field: "delay",
        reason: format!("{} minutes is too long", args.delay),
    })?;
    Ok(PollCadence::every(Duration::from_secs(secs))?.with_jitter(args.jitter)?)
}

fn build_sinks(args: &Args, booking_page: String) -> Result<Vec<Box<dyn AlertSink>>> {
    let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();
    if let Some(url) = &args.webhook {
        sinks.push(Box::new(ChatAlerts::new(WebhookChannel::new(url)?, "webhook")));
    }
    for cmd in &args.cmds {
        sinks.push(Box::new(CommandAlert::new(cmd)));
    }
    if args.browser {
        sinks.push(Box::new(BrowserAlert::new(booking_page)));
    }
    if args.popup {
        sinks.push(Box::new(PopupAlert));
    }
    if let Some([host, from, to]) = args.email.as_deref() {
        sinks.push(Box::new(EmailAlert::new(host.as_str(), from, to)?));
    }
    if args.console || sinks.is_empty() {
        sinks.push(Box::new(ChatAlerts::new(ConsoleChannel, "console")));
    }
    Ok(sinks)
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let args = Args::parse();
    tracing::debug!("Parsed args: {:?}", args);

    let criteria = criteria_from_args(&args).context("Invalid arguments")?;

    println!("\n🏨 GenCon Housing Watch");
    println!("=======================");
    println!("Dates: {} to {}", criteria.checkin, criteria.checkout);
    println!(
        "Guests: {} ({} children), rooms: {}",
        criteria.guests, criteria.children, criteria.rooms
    );
    println!("Budget: ${}", criteria.budget);
    if let Some(d) = &criteria.max_distance {
        println!("Max distance: {}", d);
    }
    println!("=======================");

    let client = PasskeyClient::new(PasskeyEndpoints::default())
        .context("Failed to create Passkey client")?;
    let booking_page = client.endpoints().booking_page(&criteria.credentials);
    let sinks = build_sinks(&args, booking_page)?;
    let sink_count = sinks.len();
    let mut watcher = HotelWatcher::new(client, criteria, sinks);

    if args.test {
        let delivered = watcher.fire_test_alerts().await;
        ensure!(
            delivered == sink_count,
            "{} of {} alerts failed",
            sink_count - delivered,
            sink_count
        );
        return Ok(());
    }

    if args.once {
        watcher.run_once().await.context("Search failed")?;
        return Ok(());
    }

    let cadence = cadence_from_args(&args)?;
    let stop = CancellationToken::new();
    let stop_on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop requested, finishing the current cycle");
            stop_on_signal.cancel();
        }
    });

    watcher.run(cadence, &stop).await;
    Ok(())
}
