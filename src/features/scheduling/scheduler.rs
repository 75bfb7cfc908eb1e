use crate::features::scheduling::cycle::CycleRunner;
use crate::features::scheduling::retry::Sleeper;
use crate::features::system_metrics::MetricsSnapshot;
use crate::shared::context::AgentContext;
use crate::shared::traits::{AsyncDataCollector, DeliveryClient};
use log::info;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Owns the main loop: one cycle per tick, until shutdown is requested.
///
/// Shutdown is only observed between cycles. A request that arrives while a
/// cycle is running, including during a backoff sleep, takes effect once that
/// cycle returns, so shutdown can lag by up to one full attempt sequence.
pub struct Scheduler<P, C, S> {
    interval: Duration,
    endpoint: String,
    runner: CycleRunner<P, C, S>,
}

impl<P, C, S> Scheduler<P, C, S>
where
    P: AsyncDataCollector<MetricsSnapshot> + Send,
    C: DeliveryClient,
    S: Sleeper,
{
    pub fn new(ctx: &AgentContext, runner: CycleRunner<P, C, S>) -> Self {
        let config = ctx.config();
        Self {
            interval: config.collector.interval,
            endpoint: config.shamva.endpoint.to_string(),
            runner,
        }
    }

    /// Run until `shutdown` resolves. Returns the number of cycles started.
    ///
    /// The first cycle fires one interval after start. If a cycle overruns
    /// the interval, one tick fires right away and the rest stay aligned.
    pub async fn run<F>(mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting metrics collection every {} to {} (max_retries {}, backoff up to {})",
            humantime::format_duration(self.interval),
            self.endpoint,
            self.runner.retry().max_retries(),
            humantime::format_duration(self.runner.retry().worst_case_backoff()),
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    cycles += 1;
                    self.runner.run_cycle().await;
                }
            }
        }

        info!("Metrics collection stopped after {} cycles", cycles);
        cycles
    }
}
