use crate::features::scheduling::retry::{DeliveryReport, DeliveryResult, RetryController, Sleeper};
use crate::features::system_metrics::MetricsSnapshot;
use crate::shared::context::AgentContext;
use crate::shared::logging::panic_message;
use crate::shared::traits::{AsyncDataCollector, DeliveryClient};
use futures::FutureExt;
use log::{debug, error};
use std::panic::AssertUnwindSafe;

/// How one collect-then-deliver cycle ended. The scheduler only needs to know
/// that it ended; the detail is for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Delivered { attempts: u32 },
    Rejected { status: u16, attempts: u32 },
    Exhausted { attempts: u32 },
    NotAttempted,
    CollectionFailed(String),
    EncodingFailed(String),
    Faulted(String),
}

impl From<DeliveryReport> for CycleOutcome {
    fn from(report: DeliveryReport) -> Self {
        match report.result {
            DeliveryResult::Delivered { .. } => CycleOutcome::Delivered {
                attempts: report.attempts,
            },
            DeliveryResult::Rejected { status } => CycleOutcome::Rejected {
                status,
                attempts: report.attempts,
            },
            DeliveryResult::Exhausted => CycleOutcome::Exhausted { attempts: report.attempts },
            DeliveryResult::NotAttempted => CycleOutcome::NotAttempted,
        }
    }
}

/// Runs one cycle at a time. Any panic inside a cycle is caught here and
/// turned into `CycleOutcome::Faulted`; it never reaches the scheduler.
pub struct CycleRunner<P, C, S> {
    provider: P,
    client: C,
    sleeper: S,
    retry: RetryController,
}

impl<P, C, S> CycleRunner<P, C, S>
where
    P: AsyncDataCollector<MetricsSnapshot> + Send,
    C: DeliveryClient,
    S: Sleeper,
{
    pub fn new(ctx: &AgentContext, provider: P, client: C, sleeper: S) -> Self {
        Self {
            provider,
            client,
            sleeper,
            retry: RetryController::new(&ctx.config().collector),
        }
    }

    pub fn retry(&self) -> &RetryController {
        &self.retry
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = match AssertUnwindSafe(self.execute()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Cycle aborted by internal fault: {}", message);
                CycleOutcome::Faulted(message)
            }
        };
        debug!("Cycle finished: {:?}", outcome);
        outcome
    }

    async fn execute(&mut self) -> CycleOutcome {
        let snapshot = match self.provider.collect().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to collect metrics: {}", e);
                return CycleOutcome::CollectionFailed(e.to_string());
            }
        };

        // Encoded once; every attempt of this cycle sends these bytes.
        let payload = match snapshot.encode() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                return CycleOutcome::EncodingFailed(e.to_string());
            }
        };
        drop(snapshot);

        self.retry
            .deliver(&self.client, &self.sleeper, &payload)
            .await
            .into()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::features::system_metrics::fixtures;
    use crate::shared::error::CollectionError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub enum Step {
        Snapshot,
        Fail(&'static str),
        Panic(&'static str),
    }

    /// Provider that follows a script, then keeps returning snapshots.
    pub struct ScriptedProvider {
        steps: VecDeque<Step>,
        pub calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        pub fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl AsyncDataCollector<MetricsSnapshot> for ScriptedProvider {
        async fn collect(&mut self) -> Result<MetricsSnapshot, CollectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.steps.pop_front().unwrap_or(Step::Snapshot) {
                Step::Snapshot => Ok(fixtures::snapshot()),
                Step::Fail(reason) => Err(CollectionError::SystemApi(reason.to_string())),
                Step::Panic(reason) => panic!("{}", reason),
            }
        }

        async fn validate(&self) -> Result<(), CollectionError> {
            Ok(())
        }
    }
}
