use crate::shared::config::AgentConfig;
use crate::shared::error::DeliveryError;
use reqwest::{redirect, Client};
use std::sync::Arc;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("shamva-collector/", env!("CARGO_PKG_VERSION"));

/// Everything the pipeline shares, built once at startup and handed to each
/// component's constructor.
///
/// The HTTP client owns the connection pool and is reused by every cycle.
/// Redirects are not followed: a 3xx answer is classified, not chased.
#[derive(Clone)]
pub struct AgentContext {
    config: Arc<AgentConfig>,
    http: Client,
}

impl AgentContext {
    pub fn new(config: AgentConfig) -> Result<Self, DeliveryError> {
        let http = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.shamva.timeout)
            .redirect(redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DeliveryError::Client(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn http(&self) -> &Client {
        &self.http
    }
}
