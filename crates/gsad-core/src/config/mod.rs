//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from an
//! optional TOML file overlaid with `GSAD__`-prefixed environment variables.
//! Every field has a default, so an empty source set yields a runnable
//! configuration.

pub mod backend;
pub mod headers;
pub mod logging;
pub mod server;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::backend::BackendConfig;
pub use self::headers::HeadersConfig;
pub use self::logging::LoggingConfig;
pub use self::server::{ServerConfig, TlsConfig};
pub use self::session::{MAX_TIMEOUT_MINUTES, SessionConfig};

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Session table settings.
    pub session: SessionConfig,
    /// Security response headers.
    pub headers: HeadersConfig,
    /// Manager daemon connection settings.
    pub backend: BackendConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file plus the environment.
    ///
    /// When `path` is `Some`, the file must exist.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("GSAD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot start a server.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.server.tls.enabled
            && (self.server.tls.cert_path.is_empty() || self.server.tls.key_path.is_empty())
        {
            return Err(AppError::configuration(
                "TLS is enabled but cert_path or key_path is empty",
            ));
        }
        if self.session.timeout_minutes == 0 {
            return Err(AppError::configuration(
                "session.timeout_minutes must be at least 1",
            ));
        }
        if self.session.timeout_minutes > MAX_TIMEOUT_MINUTES {
            return Err(AppError::configuration(format!(
                "session.timeout_minutes must be at most {MAX_TIMEOUT_MINUTES}"
            )));
        }
        if self.session.guest_username.is_some() != self.session.guest_password.is_some() {
            return Err(AppError::configuration(
                "guest_username and guest_password must be set together",
            ));
        }
        if self.backend.address.trim().is_empty() {
            return Err(AppError::configuration("backend.address is empty"));
        }
        Ok(())
    }
}
