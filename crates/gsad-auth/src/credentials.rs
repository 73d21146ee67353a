//! Per-request credentials and the cached manager secret.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::session::Session;

/// The secret replayed to the manager on each backend connection.
///
/// Currently the account password. Callers only see it through
/// [`ReauthSource`], so a manager-issued credential can replace it without
/// touching the session table.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSecret(String);

impl SessionSecret {
    /// Wraps a password.
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// The raw secret, for the backend connector only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether `candidate` equals the stored secret.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(***)")
    }
}

/// Something that can re-authenticate against the manager.
pub trait ReauthSource: Send + Sync {
    /// Manager account name.
    fn username(&self) -> &str;
    /// Secret to present.
    fn secret(&self) -> &SessionSecret;
}

impl ReauthSource for Session {
    fn username(&self) -> &str {
        &self.username
    }

    fn secret(&self) -> &SessionSecret {
        &self.secret
    }
}

/// Immutable view of a session for the duration of one request.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Session token.
    pub token: String,
    /// Session cookie.
    pub cookie: String,
    /// Manager account name.
    pub username: String,
    secret: SessionSecret,
    /// Account role.
    pub role: String,
    /// Opaque capability list.
    pub capabilities: String,
    /// User timezone.
    pub timezone: String,
    /// Severity class preference.
    pub severity: String,
    /// Negotiated interface language.
    pub language: String,
    /// Password policy warning.
    pub pw_warning: Option<String>,
    /// Dashboard chart preferences.
    pub chart_prefs: BTreeMap<String, String>,
    /// Page auto-refresh interval.
    pub autorefresh: String,
    /// Whether dashboard charts are displayed.
    pub charts_visible: bool,
    /// Guest session.
    pub is_guest: bool,
    /// Address of the requesting client.
    pub client_address: IpAddr,
    /// The URL that was requested, for redirects back after re-login.
    pub caller: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl Credentials {
    /// Derives credentials from a session snapshot.
    pub fn from_session(
        session: &Session,
        language: String,
        caller: String,
        request_time: DateTime<Utc>,
    ) -> Self {
        Self {
            token: session.token.clone(),
            cookie: session.cookie.clone(),
            username: session.username.clone(),
            secret: session.secret.clone(),
            role: session.role.clone(),
            capabilities: session.capabilities.clone(),
            timezone: session.timezone.clone(),
            severity: session.severity.clone(),
            language,
            pw_warning: session.pw_warning.clone(),
            chart_prefs: session.chart_prefs.clone(),
            autorefresh: session.autorefresh.clone(),
            charts_visible: session.charts_visible,
            is_guest: session.is_guest,
            client_address: session.client_address,
            caller,
            request_time,
        }
    }
}

impl ReauthSource for Credentials {
    fn username(&self) -> &str {
        &self.username
    }

    fn secret(&self) -> &SessionSecret {
        &self.secret
    }
}

/// Plain username/secret pair, used for logins before a session exists.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    /// Account name.
    pub username: String,
    /// Presented secret.
    pub secret: SessionSecret,
}

impl LoginAttempt {
    /// Creates a login attempt.
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            secret: SessionSecret::new(password),
        }
    }
}

impl ReauthSource for LoginAttempt {
    fn username(&self) -> &str {
        &self.username
    }

    fn secret(&self) -> &SessionSecret {
        &self.secret
    }
}
