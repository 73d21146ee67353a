//! Manager daemon connection configuration.

use serde::{Deserialize, Serialize};

/// Where and how to reach the manager daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// `unix:/path/to/socket` or `host:port`.
    pub address: String,
    /// Connect timeout in seconds.
    pub connect_timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "unix:/run/gvmd/gvmd.sock".to_string(),
            connect_timeout_seconds: 10,
        }
    }
}
