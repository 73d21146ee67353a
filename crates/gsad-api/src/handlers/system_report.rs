//! System report images.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;

use gsad_gmp::Element;
use gsad_gmp::xml::escape;

use crate::dispatch::{Handler, Next};
use crate::error::DispatchError;
use crate::executor::CommandExecutor;
use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};

use super::{credentials, respond};

const DEFAULT_DURATION: &str = "86400";

/// `/system_report/<name>/report.png`
pub struct SystemReport {
    executor: CommandExecutor,
}

impl SystemReport {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    fn report_name(path: &str) -> Option<&str> {
        let name = path
            .strip_prefix("/system_report/")?
            .strip_suffix("/report.png")?;
        (!name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-'))
        .then_some(name)
    }

    fn command(req: &GsadRequest, name: &str) -> String {
        let duration = req.params.non_empty("duration").unwrap_or(DEFAULT_DURATION);
        let mut command = format!(
            "<get_system_reports name=\"{}\" duration=\"{}\"",
            escape(name),
            escape(duration)
        );
        if let Some(slave) = req.params.non_empty("slave_id") {
            command.push_str(&format!(" slave_id=\"{}\"", escape(slave)));
        }
        command.push_str("/>");
        command
    }

    /// Decodes the first report image from the manager's response.
    fn decode(raw: &str) -> Result<Vec<u8>, DispatchError> {
        let root = Element::parse(raw)?;
        root.check_status()?;
        let encoded = root
            .child("system_report")
            .and_then(|r| r.child("report"))
            .map(|r| r.text.trim())
            .filter(|t| !t.is_empty())
            .ok_or(DispatchError::NotFound)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| DispatchError::Backend(format!("invalid report image: {e}")))
    }

    async fn run(&self, req: &GsadRequest) -> Result<HttpResponse, DispatchError> {
        let credentials = credentials(req)?;
        let name = Self::report_name(req.path()).ok_or(DispatchError::NotFound)?;

        let raw = self
            .executor
            .run_one(&credentials, req.peer.clone(), Self::command(req, name))
            .await?;
        let image = Self::decode(&raw)?;
        Ok(response::build(StatusCode::OK, "image/png", image))
    }
}

#[async_trait]
impl Handler for SystemReport {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        let result = self.run(req).await;
        respond(req, result)
    }
}
