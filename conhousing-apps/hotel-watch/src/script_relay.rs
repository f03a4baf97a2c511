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

//! # Script Relay
//!
//! Runs local scripts on their own intervals and forwards whatever they
//! appended to their output files to a chat channel.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use conhousing_poll_cadence::{CancellationToken, PollCadence};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::Instant;

use crate::chat_channel::{ChatChannel, MAX_MESSAGE_LEN, fenced_chunks, post_chunks};

/// How often due scripts are checked for.
const SCHEDULER_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScriptSpec {
    /// Executable to launch.
    pub path: PathBuf,
    /// File the script appends its findings to.
    pub output_path: PathBuf,
    /// Seconds between two runs.
    pub interval: u64,
}

pub async fn load_scripts(config: &Path) -> Result<Vec<ScriptSpec>> {
    let data = tokio::fs::read_to_string(config)
        .await
        .with_context(|| format!("Failed to read scripts config {}", config.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse scripts config {}", config.display()))
}

/// New text appended to `path` since byte `offset`, and the file's size.
///
/// A file smaller than `offset` was truncated or rotated and is re-read from
/// the start.
pub async fn read_new_output(path: &Path, offset: u64) -> Result<(u64, Option<String>)> {
    let size = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let start = if size < offset { 0 } else { offset };
    if size == start {
        return Ok((size, None));
    }

    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.seek(SeekFrom::Start(start)).await?;
    let mut bytes = Vec::with_capacity((size - start) as usize);
    file.read_to_end(&mut bytes).await?;
    Ok((start + bytes.len() as u64, Some(String::from_utf8_lossy(&bytes).into_owned())))
}

#[derive(Debug)]
struct TrackedScript {
    spec: ScriptSpec,
    last_size: u64,
    next_run: Instant,
}

pub struct ScriptRelay<C> {
    scripts: Vec<TrackedScript>,
    channel: C,
    grace: Duration,
}

impl<C: ChatChannel> ScriptRelay<C> {
    /// Start tracking `specs`. Output already present is not forwarded.
    pub async fn new(specs: Vec<ScriptSpec>, channel: C, grace: Duration) -> Self {
        let now = Instant::now();
        let mut scripts = Vec::with_capacity(specs.len());
        for spec in specs {
            let last_size = match tokio::fs::metadata(&spec.output_path).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    tracing::warn!("{}: {}, starting from empty", spec.output_path.display(), e);
                    0
                }
            };
            scripts.push(TrackedScript {
                spec,
                last_size,
                next_run: now,
            });
        }
        Self {
            scripts,
            channel,
            grace,
        }
    }

    /// Run every script whose next run is due. Returns how many messages
    /// were posted.
    pub async fn run_due(&mut self) -> usize {
        let mut posted = 0;
        for script in &mut self.scripts {
            if Instant::now() < script.next_run {
                continue;
            }
            match relay_script(script, &self.channel, self.grace).await {
                Ok(n) => posted += n,
                Err(e) => tracing::error!("{}: {:#}", script.spec.path.display(), e),
            }
            script.next_run = Instant::now() + Duration::from_secs(script.spec.interval);
        }
        posted
    }

    pub async fn run(&mut self, stop: &CancellationToken) -> Result<()> {
        let mut cadence = PollCadence::every(SCHEDULER_TICK)?;
        tracing::info!("Relaying output of {} script(s)", self.scripts.len());
        while cadence.tick(stop).await {
            self.run_due().await;
        }
        Ok(())
    }
}

async fn relay_script(script: &mut TrackedScript, channel: &dyn ChatChannel, grace: Duration) -> Result<usize> {
    run_for(&script.spec.path, grace).await?;

    let (size, text) = read_new_output(&script.spec.output_path, script.last_size).await?;
    let Some(text) = text else {
        return Ok(0);
    };
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let chunks = fenced_chunks(None, "", &lines, MAX_MESSAGE_LEN);
    post_chunks(channel, &chunks).await?;
    script.last_size = size;
    tracing::info!(
        "{}: forwarded {} new line(s)",
        script.spec.output_path.display(),
        lines.len()
    );
    Ok(chunks.len())
}

/// Launch `program`, give it `grace` to do its work, then stop it.
async fn run_for(program: &Path, grace: Duration) -> Result<()> {
    let mut child = tokio::process::Command::new(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to launch {}", program.display()))?;

    tokio::time::sleep(grace).await;
    if child.try_wait()?.is_none() {
        child.start_kill()?;
    }
    child.wait().await?;
    Ok(())
}
