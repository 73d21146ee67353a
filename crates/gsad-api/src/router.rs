//! Assembles the dispatch chain.

use gsad_core::error::AppError;

use crate::dispatch::{
    AccessLog, ApplySecurityHeaders, BuildCredentials, Chain, MethodRouter, Reject,
    SessionLookup, UrlRouter, Utf8Guard,
};
use crate::error::DispatchError;
use crate::handlers::{
    Help, Login, LoginPage, Logout, OmpGet, OmpPost, RootRedirect, StaticFiles, SystemReport,
};
use crate::response::SecurityHeaders;
use crate::state::AppState;

/// Builds the full chain:
///
/// ```text
/// AccessLog → security headers → UTF-8 guard → method router
///   GET  /                          redirect to the login form
///        /login, /login/login.html  login form
///        /logout                    session → logout
///        /omp                       session → credentials → command
///        /system_report/<n>/report.png
///                                   session → credentials → report image
///        /help/<page>.html          session → credentials → help page
///        anything else              static files
///   POST /omp                       login | session → credentials → command
///        /logout                    session → logout
/// ```
pub fn build_router(state: &AppState) -> Result<Chain, AppError> {
    let config = &state.config;
    let timeout = config.session.timeout_minutes;
    let secure = config.server.secure_cookie;

    let lookup = || {
        SessionLookup::new(
            state.sessions.clone(),
            state.authenticator.clone(),
            timeout,
            secure,
        )
    };
    let authenticated = || Chain::new().then(lookup()).then(BuildCredentials);

    let get = UrlRouter::new(Chain::new().then(StaticFiles::new(&config.server.static_dir)))
        .route("^/$", Chain::new().then(RootRedirect))
        .and_then(|r| r.route("^/login(/login\\.html)?/?$", Chain::new().then(LoginPage)))
        .and_then(|r| {
            r.route(
                "^/logout/?$",
                Chain::new()
                    .then(lookup())
                    .then(Logout::new(state.sessions.clone(), secure)),
            )
        })
        .and_then(|r| {
            r.route(
                "^/omp$",
                authenticated().then(OmpGet::new(state.executor.clone())),
            )
        })
        .and_then(|r| {
            r.route(
                "^/system_report/[-_a-zA-Z0-9]+/report\\.png$",
                authenticated().then(SystemReport::new(state.executor.clone())),
            )
        })
        .and_then(|r| r.route("^/help/[-_a-z0-9]+\\.html$", authenticated().then(Help)))
        .map_err(route_error)?;

    let post = UrlRouter::new(Chain::new().then(Reject(|| DispatchError::NotFound)))
        .route(
            "^/omp$",
            Chain::new()
                .then(Login::new(
                    state.sessions.clone(),
                    state.authenticator.clone(),
                    timeout,
                    secure,
                ))
                .then(lookup())
                .then(BuildCredentials)
                .then(OmpPost::new(state.sessions.clone(), state.executor.clone())),
        )
        .and_then(|r| {
            r.route(
                "^/logout/?$",
                Chain::new()
                    .then(lookup())
                    .then(Logout::new(state.sessions.clone(), secure)),
            )
        })
        .map_err(route_error)?;

    Ok(Chain::new()
        .then(AccessLog)
        .then(ApplySecurityHeaders::new(SecurityHeaders::from_config(
            &config.headers,
        )))
        .then(Utf8Guard)
        .then(MethodRouter::new(get, post)))
}

fn route_error(e: regex::Error) -> AppError {
    AppError::internal(format!("Invalid route pattern: {e}"))
}
