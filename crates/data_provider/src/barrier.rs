//! Frame barrier
//!
//! Blocks until the simulator's snapshot frame reaches an expected value,
//! polling with exponential backoff under a deadline.

use std::time::Duration;

use contracts::BarrierConfig;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::client::SimulatorClient;
use crate::error::{ProviderError, Result};

/// Bounded wait on the simulator frame counter
#[derive(Debug, Clone)]
pub struct FrameBarrier {
    timeout: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl FrameBarrier {
    pub fn new(config: &BarrierConfig) -> Self {
        Self {
            timeout: config.timeout(),
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }

    /// Wait until the snapshot frame reaches `expected`.
    ///
    /// Returns the time spent waiting. Fails with `FrameMismatch` if the frame
    /// moves past `expected`, `FrameBarrierTimeout` if it never gets there.
    #[instrument(name = "frame_barrier_wait", skip(self, client))]
    pub async fn wait<C: SimulatorClient>(&self, client: &C, expected: u64) -> Result<Duration> {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let mut backoff = self.initial_backoff;
        let mut polls = 0u32;

        loop {
            let frame = client.snapshot_frame().await?;
            polls += 1;

            if frame == expected {
                let waited = start.elapsed();
                debug!(frame, polls, waited_us = waited.as_micros() as u64, "frame barrier reached");
                return Ok(waited);
            }
            if frame > expected {
                warn!(expected, actual = frame, "frame barrier overshoot");
                return Err(ProviderError::FrameMismatch {
                    expected,
                    actual: frame,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ProviderError::FrameBarrierTimeout {
                    expected,
                    last_seen: frame,
                    waited_ms: start.elapsed().as_millis() as u64,
                });
            }

            tokio::time::sleep(backoff.min(deadline - now)).await;
            backoff = (backoff * 2).min(self.max_backoff);
        }
    }
}
