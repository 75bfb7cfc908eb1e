use async_trait::async_trait;
use crate::features::delivery::DeliveryOutcome;
use crate::shared::error::CollectionError;

/// Produces one value per call. The metrics provider of the agent.
#[async_trait]
pub trait AsyncDataCollector<T: Send> {
    async fn collect(&mut self) -> Result<T, CollectionError>;
    async fn validate(&self) -> Result<(), CollectionError>;
}

/// Performs exactly one delivery attempt of an already encoded payload.
///
/// Implementations never retry internally; retrying is the caller's job.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn deliver(&self, payload: &[u8]) -> DeliveryOutcome;
}

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
