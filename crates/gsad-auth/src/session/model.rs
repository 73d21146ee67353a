//! Session record and creation input.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};

use crate::credentials::SessionSecret;
use crate::login::LoginSummary;

/// A logged-in browser session.
///
/// Values handed out by [`SessionStore`](super::SessionStore) are snapshots:
/// editing one changes nothing in the table. Mutations go through the
/// store's setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Primary key, sent as the `token` parameter.
    pub token: String,
    /// Bound cookie value (`GSAD_SID`).
    pub cookie: String,
    /// Manager account name.
    pub username: String,
    /// Cached manager password, replayed on every backend connection.
    pub secret: SessionSecret,
    /// Role reported by the manager at login.
    pub role: String,
    /// Opaque capability list reported by the manager.
    pub capabilities: String,
    /// User timezone.
    pub timezone: String,
    /// Severity class preference.
    pub severity: String,
    /// Interface language, empty for "use the browser's".
    pub language: String,
    /// Password policy warning shown after login.
    pub pw_warning: Option<String>,
    /// Address the session was created from.
    pub client_address: IpAddr,
    /// Last successful lookup.
    pub last_activity: DateTime<Utc>,
    /// Dashboard chart preferences keyed by preference id.
    pub chart_prefs: BTreeMap<String, String>,
    /// Page auto-refresh interval in seconds, `"0"` for off.
    pub autorefresh: String,
    /// Whether dashboard charts are displayed.
    pub charts_visible: bool,
    /// Session belongs to the configured guest account.
    pub is_guest: bool,
}

impl Session {
    /// Whether the session idled for longer than `timeout` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_activity > timeout
    }
}

/// Everything needed to create a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Manager account name.
    pub username: String,
    /// Password to cache for backend re-authentication.
    pub password: String,
    /// User timezone.
    pub timezone: String,
    /// Role reported by the manager.
    pub role: String,
    /// Opaque capability list.
    pub capabilities: String,
    /// Interface language.
    pub language: String,
    /// Password policy warning.
    pub pw_warning: Option<String>,
    /// Severity class preference.
    pub severity: String,
    /// Dashboard chart preferences.
    pub chart_prefs: BTreeMap<String, String>,
    /// Page auto-refresh interval.
    pub autorefresh: String,
    /// Login address.
    pub client_address: IpAddr,
}

impl NewSession {
    /// Combines a manager login summary with the request's credentials.
    pub fn from_login(
        username: &str,
        password: &str,
        summary: LoginSummary,
        client_address: IpAddr,
    ) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            timezone: summary.timezone,
            role: summary.role,
            capabilities: summary.capabilities,
            language: summary.language,
            pw_warning: summary.pw_warning,
            severity: summary.severity,
            chart_prefs: summary.chart_prefs,
            autorefresh: summary.autorefresh,
            client_address,
        }
    }
}
