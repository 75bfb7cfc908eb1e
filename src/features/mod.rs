pub mod delivery;
pub mod scheduling;
pub mod system_metrics;
