//! Error types for the crmsync client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur when executing a remote operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Every attempt failed at the transport level
    #[error("remote service unreachable after {attempts} attempt(s): {last_error}")]
    Unreachable {
        /// Number of attempts made
        attempts: u32,
        /// Description of the final failure
        last_error: String,
    },

    /// Every attempt failed and the final one timed out
    #[error("remote service timed out after {attempts} attempt(s) ({timeout:?} per attempt)")]
    Timeout {
        /// Number of attempts made
        attempts: u32,
        /// Per-attempt timeout in effect
        timeout: Duration,
    },

    /// The service answered but reported an error
    #[error("remote application error: {0}")]
    ApplicationError(String),

    /// The service answered with something other than the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The client could not be constructed
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}

impl RemoteError {
    /// Check if this error came from the transport (retried before surfacing)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Timeout { .. })
    }
}

/// A single failed attempt at the transport level
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The attempt exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// Connection refused, reset, DNS failure and similar
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with a 5xx status
    #[error("server error (status {status}): {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(
            RemoteError::Unreachable {
                attempts: 3,
                last_error: "refused".to_string()
            }
            .is_transient()
        );
        assert!(
            RemoteError::Timeout {
                attempts: 3,
                timeout: Duration::from_secs(5)
            }
            .is_transient()
        );
        assert!(!RemoteError::ApplicationError("nope".to_string()).is_transient());
        assert!(!RemoteError::MalformedResponse("nope".to_string()).is_transient());
    }

    #[test]
    fn test_display_mentions_attempts() {
        let err = RemoteError::Unreachable {
            attempts: 3,
            last_error: "connection failed: refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "remote service unreachable after 3 attempt(s): connection failed: refused"
        );
    }
}
