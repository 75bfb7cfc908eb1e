mod client;
mod models;

pub use client::HttpDeliveryClient;
pub use models::{DeliveryOutcome, RetryCause};
