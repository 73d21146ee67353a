//! Security response header configuration.

use serde::{Deserialize, Serialize};

/// Values attached to every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// `X-Frame-Options` value.
    pub frame_options: String,
    /// `Content-Security-Policy` value.
    pub content_security_policy: String,
    /// `Strict-Transport-Security` max-age in seconds. Only sent over TLS.
    pub hsts_max_age: Option<u64>,
    /// `Access-Control-Allow-Origin` value. Enables the CORS headers when set.
    pub allow_origin: Option<String>,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            frame_options: "SAMEORIGIN".to_string(),
            content_security_policy: "default-src 'self' 'unsafe-inline'; \
                                      img-src 'self' blob:; \
                                      frame-ancestors 'self'"
                .to_string(),
            hsts_max_age: None,
            allow_origin: None,
        }
    }
}
