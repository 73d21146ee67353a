//! Session lookup and per-request credentials.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::{ACCEPT_LANGUAGE, SET_COOKIE};

use gsad_auth::{Authenticator, Credentials, LookupError, Session, SessionStore};

use crate::error::DispatchError;
use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};

use super::{Handler, Next};

const DEFAULT_LANGUAGE: &str = "en";

/// Resolves the request's token and cookie to a [`Session`].
///
/// On success the session snapshot is stored in the request extensions and
/// the response carries a refreshed session cookie. Any failure answers
/// with the matching re-login page.
pub struct SessionLookup {
    sessions: Arc<SessionStore>,
    authenticator: Arc<dyn Authenticator>,
    timeout_minutes: u64,
    secure_cookie: bool,
}

impl SessionLookup {
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

    async fn lookup(&self, req: &GsadRequest) -> Result<Session, LookupError> {
        let token = match req.params.get("token") {
            Some(param) if !param.is_valid() => return Err(LookupError::BadToken),
            Some(param) => param.text.as_deref(),
            None => None,
        };
        self.sessions
            .find_or_login_guest(
                req.session_cookie(),
                token,
                req.client_addr,
                self.authenticator.as_ref(),
            )
            .await
    }
}

#[async_trait]
impl Handler for SessionLookup {
    async fn handle(&self, req: &mut GsadRequest, next: Next<'_>) -> HttpResponse {
        let session = match self.lookup(req).await {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!(path = %req.path(), client = %req.client_addr, reason = %e, "Session lookup failed");
                let clear = matches!(e, LookupError::BadMissingCookie);
                let mut response = DispatchError::Lookup(e).into_response(req);
                if clear {
                    response::append_header(
                        &mut response,
                        SET_COOKIE,
                        &response::cleared_session_cookie(self.secure_cookie || req.is_tls),
                    );
                }
                return response;
            }
        };

        let cookie = response::session_cookie(
            &session.cookie,
            self.sessions.now(),
            self.timeout_minutes,
            self.secure_cookie || req.is_tls,
        );
        req.extensions.insert(session);

        let mut response = next.run(req).await;
        if !response.headers().contains_key(SET_COOKIE) {
            response::append_header(&mut response, SET_COOKIE, &cookie);
        }
        response
    }
}

/// Derives [`Credentials`] from the session found upstream.
pub struct BuildCredentials;

#[async_trait]
impl Handler for BuildCredentials {
    async fn handle(&self, req: &mut GsadRequest, next: Next<'_>) -> HttpResponse {
        let Some(session) = req.extensions.get::<Session>() else {
            return DispatchError::Internal("credentials requested without a session".to_string())
                .into_response(req);
        };

        let language = if session.language.is_empty() {
            negotiate_language(req)
        } else {
            session.language.clone()
        };
        let credentials = Credentials::from_session(session, language, req.caller(), req.received_at);
        req.extensions.insert(credentials);

        next.run(req).await
    }
}

/// First language from `Accept-Language`, as `xx` or `xx_YY`.
pub fn negotiate_language(req: &GsadRequest) -> String {
    req.headers
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|tag| tag.split(';').next().unwrap_or_default().trim())
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .map(|tag| match tag.split_once('-') {
            Some((lang, region)) => format!("{}_{}", lang.to_lowercase(), region.to_uppercase()),
            None => tag.to_lowercase(),
        })
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}
