//! Exponential-backoff delivery of one encoded snapshot.
//!
//! Attempt `i` (1-based) is preceded by a sleep of `initial_delay * 2^(i-2)`
//! for `i >= 2`. There is no cap and no jitter, and nothing sleeps after the
//! last attempt. `max_retries = 0` means no attempt is made at all.

use crate::features::delivery::DeliveryOutcome;
use crate::shared::config::CollectorConfig;
use crate::shared::traits::DeliveryClient;
use async_trait::async_trait;
use log::{error, info, warn};
use std::time::Duration;

/// Source of backoff sleeps. Swappable so retry timing can be observed.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How an attempt sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered { status: u16 },
    Rejected { status: u16 },
    Exhausted,
    NotAttempted,
}

/// What happened during one attempt sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempts: u32,
    pub sleeps: Vec<Duration>,
    pub result: DeliveryResult,
}

pub struct RetryController {
    max_retries: u32,
    initial_delay: Duration,
}

impl RetryController {
    pub fn new(config: &CollectorConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: config.initial_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on time spent sleeping in one sequence, excluding the
    /// attempts themselves: `initial_delay * (2^(max_retries-1) - 1)`.
    pub fn worst_case_backoff(&self) -> Duration {
        (1..self.max_retries).fold(Duration::ZERO, |total, attempt| {
            total.saturating_add(backoff_delay(self.initial_delay, attempt))
        })
    }

    /// Drive attempts until success, a fatal answer, or the budget runs out.
    pub async fn deliver<C, S>(&self, client: &C, sleeper: &S, payload: &[u8]) -> DeliveryReport
    where
        C: DeliveryClient + ?Sized,
        S: Sleeper + ?Sized,
    {
        let mut report = DeliveryReport {
            attempts: 0,
            sleeps: Vec::new(),
            result: DeliveryResult::NotAttempted,
        };

        if self.max_retries == 0 {
            warn!("max_retries is 0, metrics were not sent");
            return report;
        }

        let mut delay = self.initial_delay;
        loop {
            report.attempts += 1;
            let attempt = report.attempts;

            match client.deliver(payload).await {
                DeliveryOutcome::Success { status } => {
                    info!(
                        "Metrics posted successfully (status {}, attempt {}/{})",
                        status, attempt, self.max_retries
                    );
                    report.result = DeliveryResult::Delivered { status };
                    return report;
                }
                DeliveryOutcome::FatalClientError { status, body } => {
                    error!(
                        "Fatal error {}: {} (attempt {}/{}, not retrying)",
                        status, body, attempt, self.max_retries
                    );
                    report.result = DeliveryResult::Rejected { status };
                    return report;
                }
                DeliveryOutcome::RetryableServerError(cause) => {
                    warn!("Attempt {}/{} failed: {}", attempt, self.max_retries, cause);
                    if attempt >= self.max_retries {
                        error!(
                            "Failed to post metrics: all {} attempts exhausted",
                            self.max_retries
                        );
                        report.result = DeliveryResult::Exhausted;
                        return report;
                    }
                }
            }

            sleeper.sleep(delay).await;
            report.sleeps.push(delay);
            delay = delay.saturating_mul(2);
        }
    }
}

/// Sleep before attempt `retry + 1`, for `retry >= 1`.
pub fn backoff_delay(initial: Duration, retry: u32) -> Duration {
    let factor = 2u32.checked_pow(retry.saturating_sub(1)).unwrap_or(u32::MAX);
    initial.saturating_mul(factor)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of outcomes and counts calls.
    pub struct ScriptedClient {
        script: Mutex<VecDeque<DeliveryOutcome>>,
        payloads: Mutex<Vec<Vec<u8>>>,
    }

    impl ScriptedClient {
        pub fn new(outcomes: Vec<DeliveryOutcome>) -> Self {
            Self {
                script: Mutex::new(outcomes.into()),
                payloads: Mutex::new(Vec::new()),
            }
        }

        /// Every call fails at the transport level.
        pub fn unreachable() -> Self {
            Self::new(Vec::new())
        }

        pub fn calls(&self) -> usize {
            self.payloads.lock().unwrap().len()
        }

        pub fn payloads(&self) -> Vec<Vec<u8>> {
            self.payloads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliveryClient for ScriptedClient {
        async fn deliver(&self, payload: &[u8]) -> DeliveryOutcome {
            self.payloads.lock().unwrap().push(payload.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| DeliveryOutcome::from_transport("connection refused"))
        }
    }

    /// Records requested sleeps without waiting.
    #[derive(Default)]
    pub struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn slept(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }
}
