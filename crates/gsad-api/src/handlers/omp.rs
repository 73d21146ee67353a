//! `/omp` command handlers.

use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};

use gsad_auth::{Credentials, SessionStore};

use crate::commands;
use crate::dispatch::{Handler, Next};
use crate::error::DispatchError;
use crate::executor::CommandExecutor;
use crate::render;
use crate::request::GsadRequest;
use crate::response::HttpResponse;

use super::{credentials, respond, settings};

/// Allow-listed GET commands.
pub struct OmpGet {
    executor: CommandExecutor,
}

impl OmpGet {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    async fn run(&self, req: &GsadRequest) -> Result<HttpResponse, DispatchError> {
        let credentials = credentials(req)?;
        let spec = commands::resolve(&req.params, &Method::GET)?;
        let command = spec.build(&req.params)?;

        let response = self
            .executor
            .run_one(&credentials, req.peer.clone(), command)
            .await?;

        Ok(render::respond(
            req,
            StatusCode::OK,
            &render::session_envelope(&credentials, &response),
        ))
    }
}

#[async_trait]
impl Handler for OmpGet {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        let result = self.run(req).await;
        respond(req, result)
    }
}

/// POST commands: settings, then the generic allow-list.
pub struct OmpPost {
    sessions: Arc<SessionStore>,
    executor: CommandExecutor,
}

impl OmpPost {
    pub fn new(sessions: Arc<SessionStore>, executor: CommandExecutor) -> Self {
        Self { sessions, executor }
    }

    async fn run(&self, req: &GsadRequest) -> Result<HttpResponse, DispatchError> {
        let credentials = credentials(req)?;
        match req.params.value("cmd") {
            Some("save_my_settings") => {
                settings::save_my_settings(&self.sessions, &self.executor, req, &credentials).await
            }
            Some("save_chart_preference") => {
                settings::save_chart_preference(&self.sessions, &self.executor, req, &credentials)
                    .await
            }
            _ => self.generic(req, &credentials).await,
        }
    }

    async fn generic(
        &self,
        req: &GsadRequest,
        credentials: &Credentials,
    ) -> Result<HttpResponse, DispatchError> {
        let spec = commands::resolve(&req.params, &Method::POST)?;
        let mut batch = vec![spec.build(&req.params)?];
        if let Some(next) = next_command(req)? {
            batch.push(next);
        }

        let responses = self.executor.run(credentials, None, &batch).await?;
        tracing::info!(username = %credentials.username, cmd = %spec.name, "Command executed");

        let mut body = String::from("<action_result>");
        render::push_element(&mut body, "action", spec.name);
        if let Some(first) = responses.first() {
            body.push_str(first);
        }
        body.push_str("</action_result>");
        for next in responses.iter().skip(1) {
            body.push_str(next);
        }

        Ok(render::respond(
            req,
            StatusCode::OK,
            &render::session_envelope(credentials, &body),
        ))
    }
}

/// The GET command named by `next`, built from the same parameters.
pub(crate) fn next_command(req: &GsadRequest) -> Result<Option<String>, DispatchError> {
    let Some(next) = req.params.non_empty("next") else {
        return Ok(None);
    };
    let spec = commands::lookup(next, &Method::GET)
        .ok_or_else(|| DispatchError::UnknownCommand(next.to_string()))?;
    spec.build(&req.params).map(Some)
}

#[async_trait]
impl Handler for OmpPost {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        let result = self.run(req).await;
        respond(req, result)
    }
}
