//! Caller-side retry of transient failures.
//!
//! Sources never retry on their own; whoever drives a collection decides
//! whether a failure is worth another attempt.

use crate::collection::{IncrementalCollection, LoadOutcome};
use crate::source::ContentSource;
use sbconfig::Config;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Exponential backoff, capped.
///
/// `delay_for(n)` never decreases as `n` grows and never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: u32,
    /// Total attempts, the first one included
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(5),
            multiplier: 2,
            max_attempts: 3,
        }
    }
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            initial,
            max: max.max(initial),
            multiplier: 2,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Reads `sources.retry.*` from the settings store
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            Duration::from_millis(config.get_retry_initial_delay_ms()? as u64),
            Duration::from_millis(config.get_retry_max_delay_ms()? as u64),
            config.get_retry_max_attempts()? as u32,
        ))
    }

    /// Delay to wait after the failed attempt number `attempt` (0 based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

/// Loads one page, retrying transient failures with `backoff`.
///
/// Non transient failures, cancellation and exhaustion are returned
/// immediately. `cancel` interrupts the wait between attempts.
pub async fn load_with_retry<S>(
    collection: &IncrementalCollection<S>,
    count_hint: u32,
    backoff: &Backoff,
    cancel: &CancellationToken,
) -> LoadOutcome
where
    S: ContentSource + ?Sized + 'static,
{
    let mut attempt = 0;
    loop {
        let outcome = collection.load_more(count_hint).await;
        match &outcome {
            LoadOutcome::Failed(failure)
                if failure.kind.is_transient() && attempt + 1 < backoff.max_attempts =>
            {
                let delay = backoff.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure, retrying: {}",
                    failure.description
                );
                tokio::select! {
                    _ = cancel.cancelled() => return LoadOutcome::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
            _ => {
                debug!(attempts = attempt + 1, "load finished");
                return outcome;
            }
        }
    }
}
