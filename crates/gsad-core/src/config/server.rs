//! Listener and TLS configuration.

use serde::{Deserialize, Serialize};

/// HTTP(S) listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Optional plain-HTTP port that only redirects to the HTTPS listener.
    pub redirect_port: Option<u16>,
    /// Maximum accepted POST body size in bytes.
    pub max_body_bytes: usize,
    /// Directory holding static assets (login page, scripts, images).
    pub static_dir: String,
    /// Always mark the session cookie `secure`, even without TLS
    /// (for deployments behind a TLS-terminating proxy).
    pub secure_cookie: bool,
    /// TLS configuration.
    pub tls: TlsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9392,
            redirect_port: None,
            max_body_bytes: 10 * 1024 * 1024,
            static_dir: "/usr/share/gvm/gsad/web".to_string(),
            secure_cookie: false,
            tls: TlsConfig::default(),
        }
    }
}

/// TLS termination configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Whether TLS is enabled.
    pub enabled: bool,
    /// Path to the PEM certificate chain.
    pub cert_path: String,
    /// Path to the PEM private key.
    pub key_path: String,
}
