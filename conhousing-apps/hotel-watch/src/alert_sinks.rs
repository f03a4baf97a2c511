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

//! # Alert Sinks
//!
//! The alert mechanisms a triggered report is delivered through: chat
//! messages, a user command, the booking site in a browser, an e-mail or a
//! desktop popup.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::alert_diff::{AlertDiff, AlertReport};
use crate::chat_channel::{ChatChannel, MAX_MESSAGE_LEN, fenced_chunks, post_chunks};
use crate::room_classifier::{NormalizedRoom, SKYWALK};

#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short name used in logs.
    fn label(&self) -> &str;

    async fn deliver(&self, report: &AlertReport) -> Result<()>;
}

/// `- ` lines for removed rooms followed by `+ ` lines for added ones.
pub fn diff_lines(diff: &AlertDiff) -> Vec<String> {
    diff.removed
        .iter()
        .map(|room| format!("- {}", room))
        .chain(diff.added.iter().map(|room| format!("+ {}", room)))
        .collect()
}

/// Render a report as size-bounded chat messages.
pub fn report_messages(report: &AlertReport, max_len: usize) -> Vec<String> {
    fenced_chunks(Some(&report.preamble()), "diff", &diff_lines(&report.diff), max_len)
}

/// A report with one made-up room, used to check that alerting works.
pub fn test_report() -> AlertReport {
    let room = NormalizedRoom {
        name: "Test Hotel".to_string(),
        distance: SKYWALK.to_string(),
        price: 0,
        room: "Test Room".to_string(),
    };
    AlertReport {
        hotel_count: 1,
        diff: AlertDiff {
            removed: Vec::new(),
            added: vec![room.clone()],
        },
        alerts: vec![room],
    }
}

pub struct ChatAlerts<C> {
    channel: C,
    max_len: usize,
    label: String,
}

impl<C: ChatChannel> ChatAlerts<C> {
    pub fn new(channel: C, label: impl Into<String>) -> Self {
        Self {
            channel,
            max_len: MAX_MESSAGE_LEN,
            label: label.into(),
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

#[async_trait]
impl<C: ChatChannel> AlertSink for ChatAlerts<C> {
    fn label(&self) -> &str {
        &self.label
    }

    async fn deliver(&self, report: &AlertReport) -> Result<()> {
        post_chunks(&self.channel, &report_messages(report, self.max_len)).await
    }
}

/// Runs a command with every alerted hotel name as an argument.
pub struct CommandAlert {
    program: String,
}

impl CommandAlert {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl AlertSink for CommandAlert {
    fn label(&self) -> &str {
        "cmd"
    }

    async fn deliver(&self, report: &AlertReport) -> Result<()> {
        let status = tokio::process::Command::new(&self.program)
            .args(report.hotel_names())
            .status()
            .await
            .with_context(|| format!("Failed to run '{}'", self.program))?;
        if !status.success() {
            bail!("'{}' exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// Opens the booking site in the default browser.
pub struct BrowserAlert {
    url: String,
}

impl BrowserAlert {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl AlertSink for BrowserAlert {
    fn label(&self) -> &str {
        "browser"
    }

    async fn deliver(&self, _report: &AlertReport) -> Result<()> {
        let url = self.url.clone();
        tokio::task::spawn_blocking(move || open::that(&url))
            .await
            .context("Browser task panicked")?
            .with_context(|| format!("Failed to open {}", self.url))
    }
}

const EMAIL_SUBJECT: &str = "Gencon Hotel Search";

/// Plain-text mail body: the preamble followed by the diff lines.
pub fn email_body(report: &AlertReport) -> String {
    std::iter::once(report.preamble())
        .chain(diff_lines(&report.diff))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Mails the report through an SMTP relay on `host` (port 25, no auth).
pub struct EmailAlert {
    host: String,
    from: Mailbox,
    to: Mailbox,
}

impl EmailAlert {
    /// Addresses are checked here so a typo fails before the first search.
    pub fn new(host: impl Into<String>, from: &str, to: &str) -> Result<Self> {
        let from = from
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid sender address '{}'", from))?;
        let to = to
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid recipient address '{}'", to))?;
        Ok(Self {
            host: host.into(),
            from,
            to,
        })
    }

    fn message(&self, report: &AlertReport) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(EMAIL_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(email_body(report))
            .context("Failed to build alert e-mail")
    }
}

#[async_trait]
impl AlertSink for EmailAlert {
    fn label(&self) -> &str {
        "email"
    }

    async fn deliver(&self, report: &AlertReport) -> Result<()> {
        let message = self.message(report)?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.host.as_str()).build();
        mailer
            .send(message)
            .await
            .with_context(|| format!("Failed to send e-mail through {}", self.host))?;
        Ok(())
    }
}

fn popup_body(report: &AlertReport) -> String {
    report
        .alerts
        .iter()
        .map(|room| room.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shows a desktop notification listing every current alert.
#[derive(Debug, Default)]
pub struct PopupAlert;

#[async_trait]
impl AlertSink for PopupAlert {
    fn label(&self) -> &str {
        "popup"
    }

    async fn deliver(&self, report: &AlertReport) -> Result<()> {
        let summary = report.preamble();
        let body = popup_body(report);
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .appname("hotel-watch")
                .summary(&summary)
                .body(&body)
                .show()
                .map(|_| ())
        })
        .await
        .context("Popup task panicked")?
        .context("Failed to show popup")
    }
}

/// Deliver `report` through every sink. Failures are logged, never returned:
/// notification is best effort.
pub async fn deliver_all(sinks: &[Box<dyn AlertSink>], report: &AlertReport) -> usize {
    let mut delivered = 0;
    for sink in sinks {
        match sink.deliver(report).await {
            Ok(()) => delivered += 1,
            Err(e) => tracing::error!("Alert via {} failed: {:#}", sink.label(), e),
        }
    }
    delivered
}
