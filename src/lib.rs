pub mod features;
pub mod shared;

// Re-export commonly used items from features
pub use features::system_metrics::{
    SystemMetricsCollector,
    MetricsSnapshot,
    PowerStatus,
};
pub use features::delivery::{
    HttpDeliveryClient,
    DeliveryOutcome,
    RetryCause,
};
pub use features::scheduling::{
    CycleOutcome,
    CycleRunner,
    DeliveryReport,
    DeliveryResult,
    RetryController,
    Scheduler,
    Sleeper,
    TerminationSignals,
    TokioSleeper,
};

// Re-export shared functionality
pub use shared::config::AgentConfig;
pub use shared::context::AgentContext;
pub use shared::traits::{
    AsyncDataCollector,
    DeliveryClient,
    Validatable,
};
pub use shared::error::{
    AgentError,
    CollectionError,
    ConfigError,
    DeliveryError,
};
