//! Runs manager commands on behalf of a request.

use std::sync::Arc;
use std::time::Duration;

use gsad_auth::Credentials;
use gsad_gmp::{BackendConnector, GmpError};

use crate::error::DispatchError;
use crate::watcher::{ClientWatcher, PeerProbe};

/// Outcome of a command batch that may have stopped early.
#[derive(Debug)]
pub struct Batch {
    /// Responses of the commands that completed, in order.
    pub responses: Vec<String>,
    /// Why the batch stopped before its last command.
    pub failure: Option<DispatchError>,
}

impl Batch {
    /// All responses, or the failure if the batch stopped early.
    pub fn into_result(self) -> Result<Vec<String>, DispatchError> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.responses),
        }
    }
}

/// Opens one authenticated manager connection per request and sends the
/// request's commands over it.
#[derive(Clone)]
pub struct CommandExecutor {
    connector: Arc<dyn BackendConnector>,
    watch_interval: Duration,
}

impl CommandExecutor {
    pub fn new(connector: Arc<dyn BackendConnector>, watch_interval: Duration) -> Self {
        Self {
            connector,
            watch_interval,
        }
    }

    /// Sends `commands` in order and returns their raw responses.
    ///
    /// With a `peer` and a non-zero watch interval, a [`ClientWatcher`]
    /// runs for the duration and cancels the connection if the client
    /// leaves. Only GET handlers pass a peer.
    pub async fn run(
        &self,
        credentials: &Credentials,
        peer: Option<Arc<PeerProbe>>,
        commands: &[String],
    ) -> Result<Vec<String>, DispatchError> {
        self.run_partial(credentials, peer, commands)
            .await?
            .into_result()
    }

    /// Like [`run`](Self::run), but keeps the responses received before a
    /// command failed.
    ///
    /// Only a failure to connect is returned as `Err`.
    pub async fn run_partial(
        &self,
        credentials: &Credentials,
        peer: Option<Arc<PeerProbe>>,
        commands: &[String],
    ) -> Result<Batch, DispatchError> {
        let mut conn = self.connector.connect(credentials).await?;

        let watcher = match peer {
            Some(peer) if !self.watch_interval.is_zero() => {
                Some(ClientWatcher::start(peer, self.watch_interval, conn.closer()))
            }
            _ => None,
        };

        let mut responses = Vec::with_capacity(commands.len());
        let mut failure: Option<GmpError> = None;
        for command in commands {
            match conn.execute(command).await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        match watcher {
            Some(watcher) => watcher.finish(conn).await,
            None => drop(conn),
        }

        if let Some(e) = &failure {
            tracing::warn!(
                username = %credentials.username,
                completed = responses.len(),
                error = %e,
                "Manager command failed"
            );
        }
        Ok(Batch {
            responses,
            failure: failure.map(DispatchError::from),
        })
    }

    /// Runs a single command.
    pub async fn run_one(
        &self,
        credentials: &Credentials,
        peer: Option<Arc<PeerProbe>>,
        command: String,
    ) -> Result<String, DispatchError> {
        let mut responses = self.run(credentials, peer, &[command]).await?;
        responses
            .pop()
            .ok_or_else(|| DispatchError::Internal("manager returned no response".to_string()))
    }
}
