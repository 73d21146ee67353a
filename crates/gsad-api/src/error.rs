//! Dispatch-level failures and the single place they become HTTP responses.

use http::StatusCode;
use thiserror::Error;

use gsad_auth::{LookupError, SessionError};
use gsad_gmp::{ConnectError, GmpError};

use crate::pages;
use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};

/// Everything dispatch can fail with.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The token/cookie/address did not resolve to a session.
    #[error("session lookup failed: {0}")]
    Lookup(#[from] LookupError),
    /// `cmd` is missing or not on the allow-list.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// The URL is not one the daemon will look at.
    #[error("invalid URL")]
    InvalidUrl,
    /// A URL, header, or parameter name is not valid UTF-8.
    #[error("malformed UTF-8 in {0}")]
    MalformedUtf8(String),
    /// A required parameter is missing or failed validation.
    #[error("invalid parameter '{0}'")]
    InvalidParameter(String),
    /// The manager could not be reached.
    #[error("manager is down: {0}")]
    BackendDown(String),
    /// The manager rejected the session's cached credentials.
    #[error("manager rejected the session credentials")]
    BackendAuthFailed,
    /// Talking to the manager failed partway.
    #[error("manager error: {0}")]
    Backend(String),
    /// The client went away and the command was cancelled.
    #[error("request cancelled")]
    Cancelled,
    #[error("not found")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ConnectError> for DispatchError {
    fn from(e: ConnectError) -> Self {
        match e {
            ConnectError::Down(reason) => Self::BackendDown(reason),
            ConnectError::AuthFailed => Self::BackendAuthFailed,
            ConnectError::Protocol(reason) => Self::Backend(reason),
        }
    }
}

impl From<GmpError> for DispatchError {
    fn from(e: GmpError) -> Self {
        match e {
            GmpError::Cancelled => Self::Cancelled,
            GmpError::Io(e) => Self::BackendDown(e.to_string()),
            GmpError::Closed => Self::BackendDown("connection closed".to_string()),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// The session vanished between lookup and mutation.
impl From<SessionError> for DispatchError {
    fn from(_: SessionError) -> Self {
        Self::Lookup(LookupError::ExpiredToken)
    }
}

const LOGIN_AGAIN_EXPIRED: &str = "Session has expired.  Please login again.";
const LOGIN_AGAIN_COOKIE: &str = "Cookie missing or bad.  Please login again.";
const LOGIN_AGAIN_TOKEN: &str = "Token missing or bad.  Please login again.";
const LOGIN_AGAIN_ADDRESS: &str = "Session machine changed.  Please login again.";
const GUEST_REJECTED: &str = "Invalid guest credentials.  Please login as a regular user.";
const GUEST_UNAVAILABLE: &str = "Guest login failed.  The manager service is not reachable.";
const BACKEND_REAUTH: &str = "Authentication with the manager failed.  Please login again.";

impl DispatchError {
    /// HTTP status for this failure.
    pub fn status(&self, on_logout: bool) -> StatusCode {
        match self {
            Self::Lookup(LookupError::ExpiredToken) if on_logout => StatusCode::BAD_REQUEST,
            Self::Lookup(LookupError::BadToken) => StatusCode::BAD_REQUEST,
            Self::Lookup(LookupError::GuestLoginError) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Lookup(_) => StatusCode::UNAUTHORIZED,
            Self::UnknownCommand(_)
            | Self::InvalidUrl
            | Self::MalformedUtf8(_)
            | Self::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            Self::BackendDown(_) | Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            Self::BackendAuthFailed => StatusCode::UNAUTHORIZED,
            Self::Backend(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Converts the failure into the page the browser sees.
    pub fn into_response(self, req: &GsadRequest) -> HttpResponse {
        let on_logout = req.path().starts_with("/logout");
        let status = self.status(on_logout);
        let caller = req.caller();

        let login_again =
            |message: &str| pages::login_page(req, status, Some(message), Some(&caller));

        match &self {
            Self::Lookup(LookupError::BadToken) => pages::error_page(
                req,
                status,
                "Internal error",
                "An internal error occurred while checking the token.",
            ),
            Self::Lookup(LookupError::ExpiredToken) => login_again(LOGIN_AGAIN_EXPIRED),
            Self::Lookup(LookupError::BadMissingCookie) => login_again(LOGIN_AGAIN_COOKIE),
            Self::Lookup(LookupError::BadMissingToken) => login_again(LOGIN_AGAIN_TOKEN),
            Self::Lookup(LookupError::IpAddressMismatch) => login_again(LOGIN_AGAIN_ADDRESS),
            Self::Lookup(LookupError::GuestLoginFailed) => login_again(GUEST_REJECTED),
            Self::Lookup(LookupError::GuestLoginError) => login_again(GUEST_UNAVAILABLE),
            Self::BackendAuthFailed => login_again(BACKEND_REAUTH),
            Self::UnknownCommand(cmd) => {
                tracing::debug!(cmd = %cmd, "Rejected unknown command");
                pages::error_page(
                    req,
                    status,
                    "Internal error",
                    "An internal error occurred: unknown command.",
                )
            }
            Self::InvalidUrl => pages::error_page(
                req,
                status,
                "Invalid request",
                "The requested URL is invalid.",
            ),
            Self::MalformedUtf8(field) => pages::error_page(
                req,
                status,
                "Invalid request",
                &format!("The {field} is not valid UTF-8."),
            ),
            Self::InvalidParameter(name) => pages::error_page(
                req,
                status,
                "Invalid request",
                &format!("The parameter '{name}' is missing or invalid."),
            ),
            Self::BackendDown(reason) => {
                tracing::warn!(reason = %reason, "Manager unavailable");
                pages::error_page(
                    req,
                    status,
                    "Service unavailable",
                    "The manager service is down.  Please try again later.",
                )
            }
            Self::Backend(reason) => {
                tracing::error!(reason = %reason, "Manager communication failed");
                pages::error_page(
                    req,
                    status,
                    "Internal error",
                    "An internal error occurred while talking to the manager.",
                )
            }
            Self::Cancelled => response::text(status, "Request cancelled"),
            Self::NotFound => pages::error_page(
                req,
                status,
                "Not found",
                "The requested page does not exist.",
            ),
            Self::MethodNotAllowed => response::text(status, "Method not allowed"),
            Self::PayloadTooLarge => response::text(status, "Request body too large"),
            Self::Internal(reason) => {
                tracing::error!(reason = %reason, "Internal dispatch error");
                pages::error_page(req, status, "Internal error", "An internal error occurred.")
            }
        }
    }
}
