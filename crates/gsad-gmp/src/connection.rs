//! One authenticated conversation with the manager.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use gsad_auth::{AuthError, LoginSummary};

use crate::address::BackendAddress;
use crate::error::{ConnectError, GmpError};
use crate::stream::BackendStream;
use crate::xml::{self, Element};

const READ_CHUNK: usize = 8 * 1024;

/// An open manager connection.
///
/// Cancelling [`closer`](Self::closer) aborts whatever send or read is in
/// flight; the connection is unusable afterwards.
#[derive(Debug)]
pub struct GmpConnection {
    stream: BackendStream,
    closer: CancellationToken,
    buf: Vec<u8>,
}

impl GmpConnection {
    /// Opens a connection without authenticating.
    pub async fn open(address: &BackendAddress, timeout: Duration) -> Result<Self, ConnectError> {
        let stream = BackendStream::connect(address, timeout).await?;
        tracing::debug!(backend = %address, "Manager connection opened");
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: BackendStream) -> Self {
        Self {
            stream,
            closer: CancellationToken::new(),
            buf: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Token that tears this connection down when cancelled.
    pub fn closer(&self) -> CancellationToken {
        self.closer.clone()
    }

    /// Writes one command.
    pub async fn send(&mut self, command: &str) -> Result<(), GmpError> {
        if self.closer.is_cancelled() {
            return Err(GmpError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.closer.cancelled() => Err(GmpError::Cancelled),
            result = self.stream.write_all(command.as_bytes()) => Ok(result?),
        }
    }

    /// Reads until one complete XML document has arrived.
    pub async fn read_response(&mut self) -> Result<String, GmpError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(end) = xml::document_complete(&self.buf) {
                let rest = self.buf.split_off(end);
                let document = std::mem::replace(&mut self.buf, rest);
                return String::from_utf8(document)
                    .map_err(|_| GmpError::Xml("response is not valid UTF-8".to_string()));
            }

            let read = tokio::select! {
                biased;
                _ = self.closer.cancelled() => return Err(GmpError::Cancelled),
                read = self.stream.read(&mut chunk) => read?,
            };
            if read == 0 {
                return Err(GmpError::Closed);
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Sends `command` and returns the raw response document.
    pub async fn execute(&mut self, command: &str) -> Result<String, GmpError> {
        self.send(command).await?;
        self.read_response().await
    }

    /// Authenticates and reads the account's login summary.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginSummary, AuthError> {
        let command = format!(
            "<authenticate><credentials><username>{}</username><password>{}</password></credentials></authenticate>",
            xml::escape(username),
            xml::escape(password)
        );
        let raw = self.execute(&command).await.map_err(unavailable)?;
        let response = Element::parse(&raw).map_err(|e| AuthError::Protocol(e.to_string()))?;

        match response.attr("status") {
            Some(status) if status.starts_with('2') => {}
            Some("400") => return Err(AuthError::Rejected),
            other => {
                return Err(AuthError::Protocol(format!(
                    "unexpected authenticate status {}",
                    other.unwrap_or("<none>")
                )));
            }
        }

        let mut summary = LoginSummary::default();
        if let Some(role) = response.child_text("role").filter(|r| !r.is_empty()) {
            summary.role = role.to_string();
        }
        if let Some(tz) = response.child_text("timezone").filter(|t| !t.is_empty()) {
            summary.timezone = tz.to_string();
        }
        if let Some(severity) = response.child_text("severity").filter(|s| !s.is_empty()) {
            summary.severity = severity.to_string();
        }
        summary.pw_warning = response
            .child_text("password_warning")
            .filter(|w| !w.is_empty())
            .map(str::to_string);

        Ok(summary)
    }

    /// Lists the commands the account may run, one name per line.
    pub async fn capabilities(&mut self) -> Result<String, GmpError> {
        let raw = self.execute(r#"<help format="text" type="brief"/>"#).await?;
        let response = Element::parse(&raw)?;
        response.check_status()?;

        let names: Vec<&str> = response
            .text
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        Ok(names.join("\n"))
    }

    /// Closes the write half.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "Manager connection shutdown failed");
        }
    }
}

fn unavailable(e: GmpError) -> AuthError {
    AuthError::Unavailable(e.to_string())
}
