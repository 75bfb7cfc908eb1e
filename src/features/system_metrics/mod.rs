mod collector;
mod models;

pub use collector::SystemMetricsCollector;
pub use models::{
    MetricsSnapshot,
    PowerStatus,
    CpuInformation,
    MemoryInformation,
    DiskInformation,
    NetworkInformation,
    ProcessSummary,
    PowerInformation,
};

#[cfg(test)]
pub(crate) use models::fixtures;
