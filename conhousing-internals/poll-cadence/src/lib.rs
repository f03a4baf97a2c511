//! Conhousing Poll Cadence
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! conhousing-internals/poll-cadence
//! A fixed-interval ticker with random jitter for polling external services
//! without a detectable periodic traffic pattern.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time;

pub use tokio_util::sync::CancellationToken;

/// Custom error for cadence configuration
#[derive(Debug, Error, PartialEq)]
pub enum PollCadenceError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("jitter factor must be within 0.0..=1.0, got {0}")]
    InvalidJitter(f64),
}

/// Schedules polling cycles: the first tick fires immediately, every later
/// tick waits `interval` plus a random extra delay of up to
/// `interval * jitter_factor`.
///
/// # Examples
///
/// ```ignore
/// let mut cadence = PollCadence::every(Duration::from_secs(60))?.with_jitter(0.5)?;
/// while cadence.tick(&stop).await {
///     poll_once().await;
/// }
/// ```
#[derive(Clone, Debug)]
pub struct PollCadence {
    interval: Duration,
    jitter_factor: f64,
    ticks: u64,
}

impl PollCadence {
    /// Create a cadence with no jitter
    pub fn every(interval: Duration) -> Result<Self, PollCadenceError> {
        if interval.is_zero() {
            return Err(PollCadenceError::ZeroInterval);
        }
        Ok(Self {
            interval,
            jitter_factor: 0.0,
            ticks: 0,
        })
    }

    /// Set the jitter factor, a fraction of the interval
    pub fn with_jitter(mut self, jitter_factor: f64) -> Result<Self, PollCadenceError> {
        if !(0.0..=1.0).contains(&jitter_factor) {
            return Err(PollCadenceError::InvalidJitter(jitter_factor));
        }
        self.jitter_factor = jitter_factor;
        Ok(self)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of ticks handed out so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Delay to wait before the next tick
    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.ticks == 0 {
            Duration::ZERO
        } else {
            self.apply_jitter(self.interval)
        };
        self.ticks += 1;
        delay
    }

    /// Wait for the next tick.
    ///
    /// Returns `false` if `stop` was cancelled before or during the wait.
    pub async fn tick(&mut self, stop: &CancellationToken) -> bool {
        if stop.is_cancelled() {
            return false;
        }
        let delay = self.next_delay();
        if delay.is_zero() {
            return true;
        }
        tokio::select! {
            _ = stop.cancelled() => false,
            _ = time::sleep(delay) => true,
        }
    }

    /// Apply jitter to the delay
    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor == 0.0 {
            return delay;
        }

        let jitter_ms = (delay.as_millis() as f64 * self.jitter_factor) as u64;
        let rand_jitter = rand::thread_rng().gen_range(0..=jitter_ms);

        Duration::from_millis(delay.as_millis() as u64 + rand_jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_is_rejected() {
        assert_eq!(
            PollCadence::every(Duration::ZERO).unwrap_err(),
            PollCadenceError::ZeroInterval
        );
    }

    #[test]
    fn jitter_outside_unit_range_is_rejected() {
        let cadence = PollCadence::every(Duration::from_secs(1)).unwrap();
        assert!(cadence.clone().with_jitter(1.5).is_err());
        assert!(cadence.with_jitter(-0.1).is_err());
    }

    #[test]
    fn first_tick_is_immediate_then_jittered() {
        let mut cadence = PollCadence::every(Duration::from_millis(1000))
            .unwrap()
            .with_jitter(0.5)
            .unwrap();
        assert_eq!(cadence.next_delay(), Duration::ZERO);
        for _ in 0..50 {
            let d = cadence.next_delay();
            assert!(d >= Duration::from_millis(1000), "{:?} below interval", d);
            assert!(d <= Duration::from_millis(1500), "{:?} above jitter bound", d);
        }
        assert_eq!(cadence.ticks(), 51);
    }

    #[test]
    fn no_jitter_means_exact_interval() {
        let mut cadence = PollCadence::every(Duration::from_millis(250)).unwrap();
        cadence.next_delay();
        assert_eq!(cadence.next_delay(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn cancelled_stop_prevents_ticks() {
        let stop = CancellationToken::new();
        stop.cancel();
        let mut cadence = PollCadence::every(Duration::from_secs(3600)).unwrap();
        assert!(!cadence.tick(&stop).await);
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_wait() {
        let stop = CancellationToken::new();
        let mut cadence = PollCadence::every(Duration::from_secs(3600)).unwrap();
        assert!(cadence.tick(&stop).await);

        let canceller = stop.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        assert!(!cadence.tick(&stop).await);
    }
}
