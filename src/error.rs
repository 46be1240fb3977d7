//! Error types for query construction, dispatch and iteration.
//!
//! Construction-time errors ([`QueryError`]) are raised synchronously,
//! before any network call is made. Transport-level failures are retried
//! internally and only surface as [`DispatchError::Fatal`] once the retry
//! budget is spent.

use thiserror::Error;

/// Errors raised while building or parsing a query, before dispatch.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid query expression: {0}")]
    InvalidExpression(String),

    #[error("malformed complex query: {0}")]
    MalformedQuery(String),

    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate { input: String },
}

/// A single failed exchange with the service.
///
/// Internal to the dispatcher; callers only ever see the final
/// [`DispatchError`] after retries are exhausted.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response body: {message}")]
    Decode { message: String },

    /// An `"error"` field in an otherwise well-formed response body.
    #[error("service error: {message}")]
    Service { message: String },
}

impl TransportError {
    /// Whether the dispatcher should re-attempt the same request.
    ///
    /// Network failures, undecodable bodies, rate-limit signals and
    /// server-side (5xx) statuses are retryable; other statuses and
    /// explicit service rejections are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network { .. } | TransportError::Decode { .. } => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Service { message } => {
                let msg = message.to_ascii_lowercase();
                msg.contains("rate limit") || msg.contains("too many requests")
            }
        }
    }
}

/// Errors surfaced to the caller by the request dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The retry budget was exhausted, or the service rejected the
    /// request with a non-retryable error. `attempts` counts every
    /// exchange made, including the first.
    #[error("request failed after {attempts} attempt(s): {message}")]
    Fatal { attempts: u32, message: String },

    /// The exchange succeeded but the response body did not have the
    /// expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl DispatchError {
    pub(crate) fn fatal(attempts: u32, last: &TransportError) -> Self {
        DispatchError::Fatal {
            attempts,
            message: last.to_string(),
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(TransportError::Network {
            message: "timeout".into()
        }
        .is_retryable());
        assert!(TransportError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(TransportError::Status {
            status: 429,
            body: String::new()
        }
        .is_retryable());
        assert!(!TransportError::Status {
            status: 400,
            body: String::new()
        }
        .is_retryable());
        assert!(TransportError::Service {
            message: "rate limit exceeded".into()
        }
        .is_retryable());
        assert!(!TransportError::Service {
            message: "invalid api key".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_fatal_carries_attempts() {
        let err = DispatchError::fatal(
            3,
            &TransportError::Network {
                message: "connection reset".into(),
            },
        );
        match err {
            DispatchError::Fatal { attempts, .. } => assert_eq!(attempts, 3),
            _ => panic!("expected Fatal"),
        }
    }
}
