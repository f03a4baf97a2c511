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

//! # Chat Channel
//!
//! Where formatted text ends up: a Discord-compatible webhook or stdout.
//! Messages are size-bounded fenced blocks produced by [`fenced_chunks`].

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::json;

/// Discord rejects messages longer than this.
pub const MAX_MESSAGE_LEN: usize = 2000;

const FENCE: &str = "```";

#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Post one message. `text` is already within the channel's size limit.
    async fn post(&self, text: &str) -> Result<()>;
}

/// Prints every message to stdout.
#[derive(Debug, Default, Clone)]
pub struct ConsoleChannel;

#[async_trait]
impl ChatChannel for ConsoleChannel {
    async fn post(&self, text: &str) -> Result<()> {
        println!("{}", text);
        Ok(())
    }
}

/// Posts `{"content": ...}` to a chat webhook URL.
#[derive(Clone)]
pub struct WebhookChannel {
    client: wreq::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = wreq::Client::builder()
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ChatChannel for WebhookChannel {
    async fn post(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "content": text }))
            .send()
            .await
            .context("Webhook request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_preview = body.chars().take(200).collect::<String>();
            bail!("Webhook returned {}: {}", status, body_preview);
        }
        tracing::debug!("Webhook accepted {} bytes", text.len());
        Ok(())
    }
}

/// Pack `lines` into fenced code blocks of at most `max_len` bytes each.
///
/// `header` goes in front of the first block, outside the fence, or in a
/// message of its own (truncated to `max_len`) when it would leave no room
/// for a line. A new block is started whenever the next line would not fit;
/// a line that does not fit even in an empty block is truncated on a char
/// boundary.
pub fn fenced_chunks(header: Option<&str>, lang: &str, lines: &[String], max_len: usize) -> Vec<String> {
    if lines.is_empty() {
        return header
            .map(|h| vec![truncate_on_char_boundary(h, max_len).to_string()])
            .unwrap_or_default();
    }

    let open = format!("{}{}\n", FENCE, lang);
    let mut chunks = Vec::new();
    let mut current = open.clone();
    if let Some(h) = header {
        // The header shares the first block only if a line still fits after it
        if h.len() + 1 + open.len() + 1 + FENCE.len() < max_len {
            current = format!("{}\n{}", h, open);
        } else {
            chunks.push(truncate_on_char_boundary(h, max_len).to_string());
        }
    }
    let mut has_lines = false;

    for line in lines {
        let needed = current.len() + line.len() + 1 + FENCE.len();
        if needed > max_len && has_lines {
            current.push_str(FENCE);
            chunks.push(current);
            current = open.clone();
            has_lines = false;
        }
        let room = max_len.saturating_sub(current.len() + 1 + FENCE.len());
        current.push_str(truncate_on_char_boundary(line, room));
        current.push('\n');
        has_lines = true;
    }

    current.push_str(FENCE);
    chunks.push(current);
    chunks
}

fn truncate_on_char_boundary(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Send every chunk in order, stopping at the first failure.
pub async fn post_chunks(channel: &dyn ChatChannel, chunks: &[String]) -> Result<()> {
    for (i, chunk) in chunks.iter().enumerate() {
        channel
            .post(chunk)
            .await
            .with_context(|| format!("Failed to post message {}/{}", i + 1, chunks.len()))?;
    }
    Ok(())
}
