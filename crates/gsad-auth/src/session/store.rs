//! Thread-safe session table.
//!
//! One mutex guards the whole table and every operation holds it for its
//! full duration. The guard is scoped, so every return path releases it.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use gsad_core::config::SessionConfig;

use crate::credentials::SessionSecret;
use crate::error::{LookupError, SessionError};
use crate::login::{AuthError, Authenticator};

use super::clock::{Clock, SystemClock};
use super::model::{NewSession, Session};

/// Reserved token value that requests an automatic guest login.
pub const GUEST_TOKEN: &str = "guest";

/// Token of the guest session issued for a presented cookie, if any.
type GuestSlot = tokio::sync::Mutex<Option<String>>;

#[derive(Debug, Clone)]
struct GuestAccount {
    username: String,
    password: String,
}

/// Owns every live [`Session`].
#[derive(Debug)]
pub struct SessionStore {
    /// Sessions keyed by token.
    sessions: Mutex<HashMap<String, Session>>,
    /// Idle timeout.
    timeout: Duration,
    /// Configured guest account, if any.
    guest: Option<GuestAccount>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Guest logins in progress or done, keyed by the cookie the browser
    /// presented. Concurrent requests with one cookie share one login.
    pending_guests: Mutex<HashMap<String, Arc<GuestSlot>>>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new(config: &SessionConfig, clock: Arc<dyn Clock>) -> Self {
        let guest = match (&config.guest_username, &config.guest_password) {
            (Some(username), Some(password)) => Some(GuestAccount {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout: Duration::try_seconds(config.timeout_seconds())
                .unwrap_or_else(Duration::max_value),
            guest,
            clock,
            pending_guests: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an empty store on the system clock.
    pub fn with_system_clock(config: &SessionConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Idle timeout applied to every session.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The store's notion of "now".
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Number of sessions currently held, expired or not.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Whether an entry exists for `token`, without touching it.
    pub fn contains(&self, token: &str) -> bool {
        self.sessions.lock().contains_key(token)
    }

    /// Number of entries held for `username`.
    pub fn count_for_user(&self, username: &str) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|s| s.username == username)
            .count()
    }

    /// Inserts a new session with fresh token and cookie.
    ///
    /// Expired sessions of the same user are pruned on the way.
    pub fn create(&self, new: NewSession) -> Session {
        let now = self.clock.now();
        let is_guest = self
            .guest
            .as_ref()
            .is_some_and(|g| g.username == new.username);

        let mut sessions = self.sessions.lock();

        sessions.retain(|_, s| !(s.username == new.username && s.is_expired(now, self.timeout)));

        let session = Session {
            token: Uuid::new_v4().to_string(),
            cookie: Uuid::new_v4().to_string(),
            username: new.username,
            secret: SessionSecret::new(new.password),
            role: new.role,
            capabilities: new.capabilities,
            timezone: new.timezone,
            severity: new.severity,
            language: new.language,
            pw_warning: new.pw_warning,
            client_address: new.client_address,
            last_activity: now,
            chart_prefs: new.chart_prefs,
            autorefresh: new.autorefresh,
            charts_visible: true,
            is_guest,
        };

        sessions.insert(session.token.clone(), session.clone());
        info!(
            username = %session.username,
            token = &session.token[..8],
            guest = session.is_guest,
            sessions = sessions.len(),
            "Session created"
        );

        session
    }

    /// Resolves a token for a request.
    pub fn find(
        &self,
        cookie: Option<&str>,
        token: Option<&str>,
        address: IpAddr,
    ) -> Result<Session, LookupError> {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(LookupError::BadMissingToken),
        };
        if Uuid::parse_str(token).is_err() {
            return Err(LookupError::BadToken);
        }

        let now = self.clock.now();
        let mut sessions = self.sessions.lock();

        let expired = match sessions.get(token) {
            Some(session) => session.is_expired(now, self.timeout),
            None => return Err(LookupError::ExpiredToken),
        };
        if expired {
            if let Some(session) = sessions.remove(token) {
                info!(username = %session.username, "Session expired");
            }
            return Err(LookupError::ExpiredToken);
        }

        let session = sessions
            .get_mut(token)
            .ok_or(LookupError::ExpiredToken)?;
        if cookie != Some(session.cookie.as_str()) {
            debug!(username = %session.username, "Session cookie mismatch");
            return Err(LookupError::BadMissingCookie);
        }
        if session.client_address != address {
            warn!(
                username = %session.username,
                expected = %session.client_address,
                actual = %address,
                "Session used from a different address"
            );
            return Err(LookupError::IpAddressMismatch);
        }

        session.last_activity = now;
        Ok(session.clone())
    }

    /// Like [`find`](Self::find), but the reserved [`GUEST_TOKEN`] logs in
    /// the configured guest account when the cookie has no guest session yet.
    ///
    /// A new guest session always gets a fresh cookie. The presented one is
    /// only used to group concurrent requests from the same browser.
    pub async fn find_or_login_guest(
        &self,
        cookie: Option<&str>,
        token: Option<&str>,
        address: IpAddr,
        authenticator: &dyn Authenticator,
    ) -> Result<Session, LookupError> {
        if token != Some(GUEST_TOKEN) {
            return self.find(cookie, token, address);
        }
        let Some(guest) = &self.guest else {
            return Err(LookupError::BadToken);
        };

        if let Some(session) = self.touch_guest_by_cookie(cookie, address) {
            return Ok(session);
        }
        let Some(cookie) = cookie.filter(|c| !c.is_empty()) else {
            return self.login_guest(guest, address, authenticator).await;
        };

        let slot = self.guest_slot(cookie);
        let mut issued = slot.lock().await;
        if let Some(session) = issued
            .as_deref()
            .and_then(|token| self.touch_guest_by_token(token, address))
        {
            return Ok(session);
        }

        let session = self.login_guest(guest, address, authenticator).await?;
        *issued = Some(session.token.clone());
        Ok(session)
    }

    async fn login_guest(
        &self,
        guest: &GuestAccount,
        address: IpAddr,
        authenticator: &dyn Authenticator,
    ) -> Result<Session, LookupError> {
        let summary = authenticator
            .authenticate(&guest.username, &guest.password)
            .await
            .map_err(|e| match e {
                AuthError::Rejected => {
                    warn!(username = %guest.username, "Guest credentials rejected");
                    LookupError::GuestLoginFailed
                }
                AuthError::Unavailable(reason) | AuthError::Protocol(reason) => {
                    warn!(username = %guest.username, reason = %reason, "Guest login failed");
                    LookupError::GuestLoginError
                }
            })?;

        let new = NewSession::from_login(&guest.username, &guest.password, summary, address);
        Ok(self.create(new))
    }

    /// Slot for `cookie`, dropping slots nobody waits on whose session is gone.
    fn guest_slot(&self, cookie: &str) -> Arc<GuestSlot> {
        let mut pending = self.pending_guests.lock();
        {
            let sessions = self.sessions.lock();
            pending.retain(|_, slot| {
                Arc::strong_count(slot) > 1
                    || slot
                        .try_lock()
                        .is_ok_and(|issued| issued.as_ref().is_some_and(|t| sessions.contains_key(t)))
            });
        }
        Arc::clone(pending.entry(cookie.to_string()).or_default())
    }

    /// Sets the timezone of the session holding `token`.
    pub fn set_timezone(&self, token: &str, timezone: &str) -> Result<(), SessionError> {
        self.update(token, |s| s.timezone = timezone.to_string())
    }

    /// Replaces the cached password and clears the password warning.
    pub fn set_password(&self, token: &str, password: &str) -> Result<(), SessionError> {
        self.update(token, |s| {
            s.secret = SessionSecret::new(password);
            s.pw_warning = None;
        })
    }

    /// Sets the severity class.
    pub fn set_severity(&self, token: &str, severity: &str) -> Result<(), SessionError> {
        self.update(token, |s| s.severity = severity.to_string())
    }

    /// Sets the interface language.
    pub fn set_language(&self, token: &str, language: &str) -> Result<(), SessionError> {
        self.update(token, |s| s.language = language.to_string())
    }

    /// Sets one chart preference.
    pub fn set_chart_pref(&self, token: &str, id: &str, value: &str) -> Result<(), SessionError> {
        self.update(token, |s| {
            s.chart_prefs.insert(id.to_string(), value.to_string());
        })
    }

    /// Sets the auto-refresh interval.
    pub fn set_autorefresh(&self, token: &str, autorefresh: &str) -> Result<(), SessionError> {
        self.update(token, |s| s.autorefresh = autorefresh.to_string())
    }

    /// Shows or hides dashboard charts.
    pub fn set_charts_visible(&self, token: &str, visible: bool) -> Result<(), SessionError> {
        self.update(token, |s| s.charts_visible = visible)
    }

    /// Removes the session holding `token`.
    pub fn remove(&self, token: &str) -> bool {
        let removed = self.sessions.lock().remove(token);
        if let Some(session) = &removed {
            info!(username = %session.username, "Session removed");
        }
        removed.is_some()
    }

    /// Removes the live entry a snapshot was taken from.
    ///
    /// Nothing is removed if the token has since been reissued to a
    /// different cookie.
    pub fn remove_session(&self, session: &Session) -> bool {
        let mut sessions = self.sessions.lock();
        let matches = sessions
            .get(&session.token)
            .is_some_and(|live| live.cookie == session.cookie);
        if matches {
            sessions.remove(&session.token);
            info!(username = %session.username, "Session removed");
        }
        matches
    }

    /// Removes every session of `username` except the one holding `keep_token`.
    ///
    /// Returns the number of sessions removed.
    pub fn logout_all_other_sessions(&self, username: &str, keep_token: &str) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|token, s| s.username != username || token == keep_token);
        let removed = before - sessions.len();
        if removed > 0 {
            info!(username = %username, removed, "Logged out other sessions");
        }
        removed
    }

    fn update(&self, token: &str, f: impl FnOnce(&mut Session)) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(token).ok_or(SessionError::NotFound)?;
        f(session);
        Ok(())
    }

    /// Returns the live guest session bound to `cookie`, refreshing it.
    ///
    /// Expired guest sessions for the cookie are dropped.
    fn touch_guest_by_cookie(&self, cookie: Option<&str>, address: IpAddr) -> Option<Session> {
        let cookie = cookie?;
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();

        sessions.retain(|_, s| !(s.is_guest && s.cookie == cookie && s.is_expired(now, self.timeout)));

        let session = sessions
            .values_mut()
            .find(|s| s.is_guest && s.cookie == cookie && s.client_address == address)?;
        session.last_activity = now;
        Some(session.clone())
    }

    /// Returns the live guest session holding `token`, refreshing it.
    fn touch_guest_by_token(&self, token: &str, address: IpAddr) -> Option<Session> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(token).filter(|s| {
            s.is_guest && s.client_address == address && !s.is_expired(now, self.timeout)
        })?;
        session.last_activity = now;
        Some(session.clone())
    }
}
