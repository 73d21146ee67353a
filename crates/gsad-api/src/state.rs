//! State shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use gsad_auth::{Authenticator, SessionStore, Validator, default_validator};
use gsad_core::config::AppConfig;
use gsad_core::error::AppError;
use gsad_gmp::{BackendConnector, GmpConnector};

use crate::executor::CommandExecutor;

/// Application state. All fields are `Arc`-wrapped for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionStore>,
    /// Read-only after startup.
    pub validator: Arc<Validator>,
    pub authenticator: Arc<dyn Authenticator>,
    pub executor: CommandExecutor,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        sessions: Arc<SessionStore>,
        validator: Validator,
        connector: Arc<dyn BackendConnector>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        let executor = CommandExecutor::new(
            connector,
            Duration::from_secs(config.session.client_watch_interval_seconds),
        );
        Self {
            config: Arc::new(config),
            sessions,
            validator: Arc::new(validator),
            authenticator,
            executor,
        }
    }

    /// Production wiring: system clock, default rules, real manager.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let validator = default_validator()
            .map_err(|e| AppError::internal(format!("Failed to build validator: {e}")))?;
        let connector = Arc::new(GmpConnector::from_config(&config.backend)?);
        let sessions = Arc::new(SessionStore::with_system_clock(&config.session));

        tracing::info!(backend = %connector.address(), "Manager connector configured");

        Ok(Self::new(
            config,
            sessions,
            validator,
            connector.clone(),
            connector,
        ))
    }
}
