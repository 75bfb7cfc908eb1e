mod cycle;
mod retry;
mod scheduler;
mod shutdown;

pub use cycle::{CycleOutcome, CycleRunner};
pub use retry::{
    backoff_delay, DeliveryReport, DeliveryResult, RetryController, Sleeper, TokioSleeper,
};
pub use scheduler::Scheduler;
pub use shutdown::TerminationSignals;
