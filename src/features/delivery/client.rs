use crate::features::delivery::models::DeliveryOutcome;
use crate::shared::config::bearer_header;
use crate::shared::context::AgentContext;
use crate::shared::error::DeliveryError;
use crate::shared::traits::DeliveryClient;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

/// Posts encoded snapshots to the shamva public metrics endpoint.
pub struct HttpDeliveryClient {
    client: Client,
    endpoint: Url,
    authorization: HeaderValue,
    timeout: Duration,
}

impl HttpDeliveryClient {
    pub fn new(ctx: &AgentContext) -> Result<Self, DeliveryError> {
        let shamva = &ctx.config().shamva;
        let authorization = bearer_header(&shamva.agent_token)
            .map_err(|e| DeliveryError::Client(format!("invalid agent token: {}", e)))?;

        Ok(Self {
            client: ctx.http().clone(),
            endpoint: shamva.endpoint.clone(),
            authorization,
            timeout: shamva.timeout,
        })
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn deliver(&self, payload: &[u8]) -> DeliveryOutcome {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, self.authorization.clone())
            .timeout(self.timeout)
            .body(payload.to_vec())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_builder() => return DeliveryOutcome::unsendable(error_chain(&e)),
            Err(e) => return DeliveryOutcome::from_transport(error_chain(&e)),
        };

        let status = response.status().as_u16();
        // The body is read in full before classifying; a broken body is a
        // transport failure even when the status line arrived.
        match response.text().await {
            Ok(body) => {
                debug!("POST {} -> {} ({} bytes)", self.endpoint, status, body.len());
                DeliveryOutcome::from_status(status, body)
            }
            Err(e) => DeliveryOutcome::from_transport(format!(
                "failed to read response body (status {}): {}",
                status,
                error_chain(&e)
            )),
        }
    }
}

/// `Display` of an error followed by each of its sources.
fn error_chain(error: &dyn StdError) -> String {
    let mut detail = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !detail.contains(&cause_text) {
            detail.push_str(": ");
            detail.push_str(&cause_text);
        }
        source = cause.source();
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::io;

    #[derive(Debug)]
    struct Wrapped(&'static str, io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.1)
        }
    }

    #[test]
    fn error_chain_appends_every_cause() {
        let inner = io::Error::new(io::ErrorKind::ConnectionRefused, "Connection refused");
        let error = Wrapped("error sending request", inner);

        assert_eq!(error_chain(&error), "error sending request: Connection refused");
    }

    #[test]
    fn error_chain_skips_causes_already_in_the_message() {
        let inner = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        let error = Wrapped("operation timed out", inner);

        assert_eq!(error_chain(&error), "operation timed out");
    }
}
