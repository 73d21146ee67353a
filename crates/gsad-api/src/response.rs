//! Response construction, session cookie formatting, and security headers.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL,
    CONTENT_SECURITY_POLICY, CONTENT_TYPE, EXPIRES, HeaderName, HeaderValue, LOCATION, PRAGMA,
    STRICT_TRANSPORT_SECURITY, X_FRAME_OPTIONS,
};
use http::{Response, StatusCode};
use http_body_util::Full;

use gsad_core::config::HeadersConfig;

use crate::request::SESSION_COOKIE;

/// Every response the chain produces.
pub type HttpResponse = Response<Full<Bytes>>;

/// Response with a body and content type.
pub fn build(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> HttpResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    set_header(&mut response, CONTENT_TYPE, content_type);
    response
}

pub fn text(status: StatusCode, body: &str) -> HttpResponse {
    build(status, "text/plain; charset=utf-8", body.to_string())
}

/// Empty-bodied redirect.
pub fn redirect(status: StatusCode, location: &str) -> HttpResponse {
    let mut response = build(status, "text/plain; charset=utf-8", Bytes::new());
    set_header(&mut response, LOCATION, location);
    response
}

/// Sets a header, dropping values that are not valid header text.
pub fn set_header(response: &mut HttpResponse, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "Dropping invalid header value"),
    }
}

/// Appends a header without replacing earlier values.
pub fn append_header(response: &mut HttpResponse, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().append(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "Dropping invalid header value"),
    }
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// `Set-Cookie` value for a live session.
pub fn session_cookie(
    cookie: &str,
    now: DateTime<Utc>,
    timeout_minutes: u64,
    secure: bool,
) -> String {
    let seconds = timeout_minutes.saturating_mul(60);
    let expires = i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    format!(
        "{SESSION_COOKIE}={cookie}; expires={}; max-age={}; path=/; {}HTTPonly",
        http_date(expires),
        seconds.saturating_add(30),
        if secure { "secure; " } else { "" }
    )
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn cleared_session_cookie(secure: bool) -> String {
    format!(
        "{SESSION_COOKIE}=0; expires=Thu, 01 Jan 1970 00:00:00 GMT; max-age=0; path=/; {}HTTPonly",
        if secure { "secure; " } else { "" }
    )
}

/// Process-wide security headers, pre-parsed from configuration.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    frame_options: Option<HeaderValue>,
    content_security_policy: Option<HeaderValue>,
    hsts: Option<HeaderValue>,
    allow_origin: Option<HeaderValue>,
}

impl SecurityHeaders {
    pub fn from_config(config: &HeadersConfig) -> Self {
        let parse = |value: &str| {
            if value.is_empty() {
                return None;
            }
            HeaderValue::from_str(value)
                .inspect_err(|_| tracing::warn!(value = %value, "Ignoring invalid header value"))
                .ok()
        };
        Self {
            frame_options: parse(&config.frame_options),
            content_security_policy: parse(&config.content_security_policy),
            hsts: config
                .hsts_max_age
                .and_then(|age| parse(&format!("max-age={age}"))),
            allow_origin: config.allow_origin.as_deref().and_then(parse),
        }
    }

    /// Adds the configured headers, plus no-cache headers unless the
    /// handler already chose a cache policy.
    pub fn apply(&self, response: &mut HttpResponse, is_tls: bool) {
        let headers = response.headers_mut();
        if let Some(v) = &self.frame_options {
            headers.insert(X_FRAME_OPTIONS, v.clone());
        }
        if let Some(v) = &self.content_security_policy {
            headers.insert(CONTENT_SECURITY_POLICY, v.clone());
        }
        if is_tls {
            if let Some(v) = &self.hsts {
                headers.insert(STRICT_TRANSPORT_SECURITY, v.clone());
            }
        }
        if let Some(v) = &self.allow_origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, v.clone());
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if !headers.contains_key(CACHE_CONTROL) {
            headers.insert(EXPIRES, HeaderValue::from_static("-1"));
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        }
    }
}
