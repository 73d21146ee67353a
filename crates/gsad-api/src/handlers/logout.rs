//! Logout.

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use http::header::SET_COOKIE;

use gsad_auth::{Session, SessionStore};

use crate::dispatch::{Handler, Next};
use crate::error::DispatchError;
use crate::pages;
use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};

/// Ends the session found upstream and clears the cookie.
pub struct Logout {
    sessions: Arc<SessionStore>,
    secure_cookie: bool,
}

impl Logout {
    pub fn new(sessions: Arc<SessionStore>, secure_cookie: bool) -> Self {
        Self {
            sessions,
            secure_cookie,
        }
    }
}

#[async_trait]
impl Handler for Logout {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        let Some(session) = req.extensions.get::<Session>() else {
            return DispatchError::Internal("logout without a session".to_string())
                .into_response(req);
        };

        if self.sessions.remove_session(session) {
            tracing::info!(username = %session.username, "User logged out");
        }

        let mut response =
            pages::login_page(req, StatusCode::OK, Some("Successfully logged out."), None);
        response::append_header(
            &mut response,
            SET_COOKIE,
            &response::cleared_session_cookie(self.secure_cookie || req.is_tls),
        );
        response
    }
}
