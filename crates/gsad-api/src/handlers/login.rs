//! Login form and login command.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use http::header::SET_COOKIE;
use tracing::{info, warn};

use gsad_auth::{AuthError, Authenticator, NewSession, SessionStore};

use crate::dispatch::{Handler, Next};
use crate::pages;
use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};

/// Where a browser goes after logging in without a usable `text` target.
pub const DEFAULT_TARGET: &str = "/omp?cmd=get_tasks";

pub const LOGIN_PAGE_URL: &str = "/login/login.html";

/// Same-origin redirect target from the login form, or the default.
pub fn redirect_target(text: Option<&str>) -> String {
    match text {
        Some(t)
            if t.starts_with('/')
                && !t.starts_with("//")
                && !t.starts_with("/\\")
                && !t.starts_with("/logout") =>
        {
            t.to_string()
        }
        _ => DEFAULT_TARGET.to_string(),
    }
}

fn with_token(target: &str, token: &str) -> String {
    let separator = if target.contains('?') { '&' } else { '?' };
    format!("{target}{separator}token={token}")
}

/// `/` sends browsers to the login form.
pub struct RootRedirect;

#[async_trait]
impl Handler for RootRedirect {
    async fn handle(&self, _req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        response::redirect(StatusCode::SEE_OTHER, LOGIN_PAGE_URL)
    }
}

/// The login form.
pub struct LoginPage;

#[async_trait]
impl Handler for LoginPage {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        let url = req.params.non_empty("text").map(str::to_string);
        pages::login_page(req, StatusCode::OK, None, url.as_deref())
    }
}

/// Handles `cmd=login` POSTs before any session lookup; passes everything
/// else on.
pub struct Login {
    sessions: Arc<SessionStore>,
    authenticator: Arc<dyn Authenticator>,
    timeout_minutes: u64,
    secure_cookie: bool,
}

impl Login {
    pub fn new(
        sessions: Arc<SessionStore>,
        authenticator: Arc<dyn Authenticator>,
        timeout_minutes: u64,
        secure_cookie: bool,
    ) -> Self {
        Self {
            sessions,
            authenticator,
            timeout_minutes,
            secure_cookie,
        }
    }

    async fn login(&self, req: &GsadRequest) -> HttpResponse {
        let target = redirect_target(req.params.value("text"));
        let failed = |status: StatusCode, message: &str| {
            pages::login_page(req, status, Some(message), Some(&target))
        };

        let (Some(username), Some(password)) = (
            req.params.non_empty("login"),
            req.params.non_empty("password"),
        ) else {
            return failed(StatusCode::UNAUTHORIZED, "Login failed.");
        };

        match self.authenticator.authenticate(username, password).await {
            Ok(summary) => {
                let session = self.sessions.create(NewSession::from_login(
                    username,
                    password,
                    summary,
                    req.client_addr,
                ));
                info!(username = %username, client = %req.client_addr, "User logged in");

                let mut response =
                    response::redirect(StatusCode::SEE_OTHER, &with_token(&target, &session.token));
                response::append_header(
                    &mut response,
                    SET_COOKIE,
                    &response::session_cookie(
                        &session.cookie,
                        self.sessions.now(),
                        self.timeout_minutes,
                        self.secure_cookie || req.is_tls,
                    ),
                );
                response
            }
            Err(AuthError::Rejected) => {
                warn!(username = %username, client = %req.client_addr, "Login rejected");
                failed(StatusCode::UNAUTHORIZED, "Login failed.")
            }
            Err(AuthError::Unavailable(reason)) => {
                warn!(username = %username, reason = %reason, "Login failed, manager unavailable");
                failed(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Login failed.  The manager service is down.",
                )
            }
            Err(AuthError::Protocol(reason)) => {
                warn!(username = %username, reason = %reason, "Login failed, protocol error");
                failed(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Login failed.  Error during authentication.",
                )
            }
        }
    }
}

#[async_trait]
impl Handler for Login {
    async fn handle(&self, req: &mut GsadRequest, next: Next<'_>) -> HttpResponse {
        if req.params.value("cmd") != Some("login") {
            return next.run(req).await;
        }
        self.login(req).await
    }
}
