//! Backend protocol errors.

use thiserror::Error;

/// Failure while talking to an open manager connection.
#[derive(Debug, Error)]
pub enum GmpError {
    /// Socket I/O failed.
    #[error("manager I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The manager closed the connection mid-response.
    #[error("manager closed the connection")]
    Closed,
    /// The connection was torn down by its cancellation token.
    #[error("manager connection cancelled")]
    Cancelled,
    /// The response is not well-formed XML.
    #[error("malformed manager response: {0}")]
    Xml(String),
    /// The manager answered with a non-2xx status.
    #[error("manager returned status {status}: {text}")]
    Status {
        /// Status attribute.
        status: String,
        /// Status text attribute.
        text: String,
    },
}

/// Outcome of opening and authenticating a manager connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The manager is not reachable.
    #[error("manager is down: {0}")]
    Down(String),
    /// The manager rejected the replayed credentials.
    #[error("manager rejected the credentials")]
    AuthFailed,
    /// The manager answered, but not in a way we understand.
    #[error("manager protocol error: {0}")]
    Protocol(String),
}
