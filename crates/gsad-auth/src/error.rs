//! Typed outcomes for validation and session lookups.
//!
//! None of these are exceptional: each lookup failure maps to a distinct
//! re-authentication message shown to the browser.

use thiserror::Error;

/// Outcome of validating a named value against the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No rule or alias is registered under this name.
    #[error("no validation rule named '{0}'")]
    UnknownName(String),
    /// The value did not match the rule's pattern.
    #[error("value for '{0}' does not match its rule")]
    NoMatch(String),
    /// The value is not valid UTF-8.
    #[error("value for '{0}' is not valid UTF-8")]
    InvalidUtf8(String),
    /// A rule was registered with a pattern that does not compile.
    #[error("invalid pattern for rule '{name}': {reason}")]
    InvalidPattern {
        /// Rule name.
        name: String,
        /// Compiler message.
        reason: String,
    },
}

/// Why a token/cookie/address triple did not resolve to a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The token is malformed.
    #[error("bad token")]
    BadToken,
    /// The token is unknown or the session idled past its timeout.
    #[error("session expired")]
    ExpiredToken,
    /// The cookie is absent or does not belong to the token's session.
    #[error("cookie missing or bad")]
    BadMissingCookie,
    /// No token was presented.
    #[error("token missing or bad")]
    BadMissingToken,
    /// The request came from a different client address than the login.
    #[error("client address changed")]
    IpAddressMismatch,
    /// The manager rejected the configured guest credentials.
    #[error("guest login rejected")]
    GuestLoginFailed,
    /// Guest login could not be completed (manager unreachable or protocol error).
    #[error("guest login error")]
    GuestLoginError,
}

/// Failure of a session mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No live session holds this token.
    #[error("session not found")]
    NotFound,
}
