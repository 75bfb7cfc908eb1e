use std::fmt;

/// Why an attempt is worth repeating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryCause {
    /// No response was received: connection refused, timeout, DNS, body read.
    Transport(String),
    /// The collector answered with a 5xx status.
    Server { status: u16, body: String },
}

/// Classified result of one delivery attempt.
///
/// Classification only looks at whether a response arrived and at its
/// status code. Attempt numbers and earlier outcomes play no part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success { status: u16 },
    RetryableServerError(RetryCause),
    FatalClientError { status: u16, body: String },
}

impl DeliveryOutcome {
    /// 2xx is success, 5xx and above is retryable, anything else
    /// (1xx, 3xx, 4xx) is fatal for the cycle.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            200..=299 => DeliveryOutcome::Success { status },
            500..=u16::MAX => DeliveryOutcome::RetryableServerError(RetryCause::Server {
                status,
                body: body.into(),
            }),
            _ => DeliveryOutcome::FatalClientError {
                status,
                body: body.into(),
            },
        }
    }

    pub fn from_transport(error: impl fmt::Display) -> Self {
        DeliveryOutcome::RetryableServerError(RetryCause::Transport(error.to_string()))
    }

    /// The request could not be built, so nothing reached the network.
    /// Repeating it would fail the same way. Status 0 marks "never sent".
    pub fn unsendable(error: impl fmt::Display) -> Self {
        DeliveryOutcome::FatalClientError {
            status: 0,
            body: error.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryOutcome::Success { status }
            | DeliveryOutcome::FatalClientError { status, .. }
            | DeliveryOutcome::RetryableServerError(RetryCause::Server { status, .. }) => {
                Some(*status)
            }
            DeliveryOutcome::RetryableServerError(RetryCause::Transport(_)) => None,
        }
    }
}

impl fmt::Display for RetryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryCause::Transport(detail) => write!(f, "transport error: {}", detail),
            RetryCause::Server { status, body } => write!(f, "server error {}: {}", status, body),
        }
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Success { status } => write!(f, "accepted with status {}", status),
            DeliveryOutcome::RetryableServerError(cause) => write!(f, "{}", cause),
            DeliveryOutcome::FatalClientError { status, body } => {
                write!(f, "rejected with status {}: {}", status, body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_codes() {
        for status in [200, 201, 202, 204, 299] {
            assert!(
                matches!(DeliveryOutcome::from_status(status, ""), DeliveryOutcome::Success { .. }),
                "{}",
                status
            );
        }
        for status in [500, 502, 503, 504, 599, 600] {
            assert!(
                matches!(
                    DeliveryOutcome::from_status(status, ""),
                    DeliveryOutcome::RetryableServerError(RetryCause::Server { .. })
                ),
                "{}",
                status
            );
        }
        for status in [100, 101, 301, 302, 304, 400, 401, 403, 404, 422, 429, 499] {
            assert!(
                matches!(
                    DeliveryOutcome::from_status(status, ""),
                    DeliveryOutcome::FatalClientError { .. }
                ),
                "{}",
                status
            );
        }
    }

    #[test]
    fn transport_failure_is_retryable_without_status() {
        let outcome = DeliveryOutcome::from_transport("connection refused");
        assert!(matches!(
            outcome,
            DeliveryOutcome::RetryableServerError(RetryCause::Transport(_))
        ));
        assert_eq!(outcome.status(), None);
        assert_eq!(outcome.to_string(), "transport error: connection refused");
    }

    #[test]
    fn unsendable_request_is_fatal() {
        let outcome = DeliveryOutcome::unsendable("builder error: invalid header value");
        assert_eq!(
            outcome,
            DeliveryOutcome::FatalClientError {
                status: 0,
                body: String::from("builder error: invalid header value"),
            }
        );
    }

    #[test]
    fn keeps_response_body_for_logging() {
        let outcome = DeliveryOutcome::from_status(401, "invalid agent token");
        assert_eq!(
            outcome,
            DeliveryOutcome::FatalClientError {
                status: 401,
                body: String::from("invalid agent token"),
            }
        );
        assert_eq!(outcome.status(), Some(401));
        assert_eq!(outcome.to_string(), "rejected with status 401: invalid agent token");

        let outcome = DeliveryOutcome::from_status(503, "overloaded");
        assert_eq!(outcome.to_string(), "server error 503: overloaded");
    }
}
