//! Session table configuration.

use serde::{Deserialize, Serialize};

/// Largest accepted idle timeout, ten years.
pub const MAX_TIMEOUT_MINUTES: u64 = 10 * 366 * 24 * 60;

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle minutes after which a session expires.
    pub timeout_minutes: u64,
    /// Account used for automatic guest logins. Disabled when `None`.
    pub guest_username: Option<String>,
    /// Password of the guest account.
    pub guest_password: Option<String>,
    /// Seconds between client liveness checks on GET requests.
    /// `0` disables the watcher.
    pub client_watch_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 15,
            guest_username: None,
            guest_password: None,
            client_watch_interval_seconds: 1,
        }
    }
}

impl SessionConfig {
    /// Session timeout in seconds.
    ///
    /// Saturates at `i64::MAX` for values that never passed validation.
    pub fn timeout_seconds(&self) -> i64 {
        i64::try_from(self.timeout_minutes)
            .unwrap_or(i64::MAX)
            .saturating_mul(60)
    }

    /// Whether guest auto-login is configured.
    pub fn guest_enabled(&self) -> bool {
        self.guest_username.is_some() && self.guest_password.is_some()
    }
}
