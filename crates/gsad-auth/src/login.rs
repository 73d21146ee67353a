//! Authentication seam between the session table and the manager.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// What the manager tells us about a freshly authenticated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSummary {
    /// Account role.
    pub role: String,
    /// Account timezone.
    pub timezone: String,
    /// Severity class preference.
    pub severity: String,
    /// Opaque capability list.
    pub capabilities: String,
    /// Interface language, empty for the browser default.
    pub language: String,
    /// Password policy warning.
    pub pw_warning: Option<String>,
    /// Dashboard chart preferences.
    pub chart_prefs: BTreeMap<String, String>,
    /// Page auto-refresh interval.
    pub autorefresh: String,
}

impl Default for LoginSummary {
    fn default() -> Self {
        Self {
            role: "User".to_string(),
            timezone: "UTC".to_string(),
            severity: "nist".to_string(),
            capabilities: String::new(),
            language: String::new(),
            pw_warning: None,
            chart_prefs: BTreeMap::new(),
            autorefresh: "0".to_string(),
        }
    }
}

/// Why an authentication attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The manager rejected the credentials.
    #[error("authentication rejected")]
    Rejected,
    /// The manager could not be reached.
    #[error("manager unavailable: {0}")]
    Unavailable(String),
    /// The manager answered with something unexpected.
    #[error("manager protocol error: {0}")]
    Protocol(String),
}

/// Authenticates an account against the manager.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Checks `username`/`password` and reports the account's settings.
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<LoginSummary, AuthError>;
}
