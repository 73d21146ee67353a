//! Per-request backend connections.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use gsad_auth::{AuthError, Authenticator, LoginSummary, ReauthSource};
use gsad_core::config::BackendConfig;
use gsad_core::error::AppError;

use crate::address::BackendAddress;
use crate::connection::GmpConnection;
use crate::error::{ConnectError, GmpError};

/// An authenticated connection, valid for one HTTP request.
#[async_trait]
pub trait BackendSession: Send {
    /// Sends one command and returns the raw response document.
    async fn execute(&mut self, command: &str) -> Result<String, GmpError>;

    /// Token that aborts this connection when cancelled.
    fn closer(&self) -> CancellationToken;
}

/// Opens authenticated connections on behalf of a session.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Connects and replays `who`'s credentials.
    async fn connect(&self, who: &dyn ReauthSource)
    -> Result<Box<dyn BackendSession>, ConnectError>;
}

#[async_trait]
impl BackendSession for GmpConnection {
    async fn execute(&mut self, command: &str) -> Result<String, GmpError> {
        GmpConnection::execute(self, command).await
    }

    fn closer(&self) -> CancellationToken {
        GmpConnection::closer(self)
    }
}

/// Connector for a real manager socket.
#[derive(Debug, Clone)]
pub struct GmpConnector {
    address: BackendAddress,
    timeout: Duration,
}

impl GmpConnector {
    pub fn new(address: BackendAddress, timeout: Duration) -> Self {
        Self { address, timeout }
    }

    /// Builds a connector from the `backend` configuration section.
    pub fn from_config(config: &BackendConfig) -> Result<Self, AppError> {
        let address = config.address.parse::<BackendAddress>()?;
        Ok(Self::new(
            address,
            Duration::from_secs(config.connect_timeout_seconds),
        ))
    }

    pub fn address(&self) -> &BackendAddress {
        &self.address
    }

    async fn open(&self) -> Result<GmpConnection, ConnectError> {
        GmpConnection::open(&self.address, self.timeout).await
    }
}

#[async_trait]
impl BackendConnector for GmpConnector {
    async fn connect(
        &self,
        who: &dyn ReauthSource,
    ) -> Result<Box<dyn BackendSession>, ConnectError> {
        let mut conn = self.open().await?;
        match conn.authenticate(who.username(), who.secret().expose()).await {
            Ok(_) => Ok(Box::new(conn)),
            Err(AuthError::Rejected) => {
                tracing::warn!(username = %who.username(), "Manager rejected cached credentials");
                Err(ConnectError::AuthFailed)
            }
            Err(AuthError::Unavailable(reason)) => Err(ConnectError::Down(reason)),
            Err(AuthError::Protocol(reason)) => Err(ConnectError::Protocol(reason)),
        }
    }
}

#[async_trait]
impl Authenticator for GmpConnector {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginSummary, AuthError> {
        let mut conn = self
            .open()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let mut summary = conn.authenticate(username, password).await?;
        match conn.capabilities().await {
            Ok(capabilities) => summary.capabilities = capabilities,
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "Failed to read capabilities");
            }
        }
        conn.shutdown().await;

        tracing::info!(username = %username, role = %summary.role, "Manager authentication succeeded");
        Ok(summary)
    }
}
