//! Turning envelope documents into response bodies.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde_json::{Map, Value};

use gsad_auth::Credentials;
use gsad_gmp::xml::escape;
use gsad_gmp::{Element, GmpError};

use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Converts an XML document into a response body.
pub trait Renderer: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn render(&self, document: &str) -> Result<Bytes, GmpError>;
}

/// Passes the document through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlRenderer;

impl Renderer for XmlRenderer {
    fn content_type(&self) -> &'static str {
        "application/xml; charset=utf-8"
    }

    fn render(&self, document: &str) -> Result<Bytes, GmpError> {
        Ok(Bytes::from(document.to_string()))
    }
}

/// Re-encodes the document as JSON.
///
/// Attributes become `_name` keys, repeated child elements become arrays,
/// and text beside children lands under `__text`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn render(&self, document: &str) -> Result<Bytes, GmpError> {
        let root = Element::parse(document)?;
        let mut wrapper = Map::new();
        wrapper.insert(root.name.clone(), element_to_json(&root));
        serde_json::to_vec(&Value::Object(wrapper))
            .map(Bytes::from)
            .map_err(|e| GmpError::Xml(e.to_string()))
    }
}

pub fn element_to_json(element: &Element) -> Value {
    let mut map = Map::new();
    for (key, value) in &element.attributes {
        map.insert(format!("_{key}"), Value::String(value.clone()));
    }
    for child in &element.children {
        let value = element_to_json(child);
        match map.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(child.name.clone(), value);
            }
        }
    }

    if map.is_empty() {
        return Value::String(element.text.clone());
    }
    if !element.text.is_empty() {
        map.insert("__text".to_string(), Value::String(element.text.clone()));
    }
    Value::Object(map)
}

/// The renderer the request asked for.
pub fn renderer_for(req: &GsadRequest) -> &'static dyn Renderer {
    if req.wants_json() {
        &JsonRenderer
    } else {
        &XmlRenderer
    }
}

/// Renders `document` and wraps it in a response.
pub fn respond(req: &GsadRequest, status: StatusCode, document: &str) -> HttpResponse {
    let renderer = renderer_for(req);
    match renderer.render(document) {
        Ok(body) => response::build(status, renderer.content_type(), body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render response");
            response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

/// Envelope for pages shown without a session.
pub fn anonymous_envelope(now: DateTime<Utc>, body: &str) -> String {
    format!(
        "<envelope><version>{VERSION}</version><time>{}</time>{body}</envelope>",
        now.to_rfc2822()
    )
}

/// Envelope around a command response for a logged-in user.
pub fn session_envelope(credentials: &Credentials, body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 512);
    out.push_str("<envelope>");
    out.push_str(&format!("<version>{VERSION}</version>"));
    push_element(&mut out, "token", &credentials.token);
    push_element(&mut out, "caller", &credentials.caller);
    push_element(&mut out, "time", &credentials.request_time.to_rfc2822());
    push_element(&mut out, "timezone", &credentials.timezone);
    push_element(&mut out, "login", &credentials.username);
    push_element(&mut out, "role", &credentials.role);
    push_element(&mut out, "severity", &credentials.severity);
    push_element(&mut out, "i18n", &credentials.language);
    push_element(&mut out, "client_address", &credentials.client_address.to_string());
    push_element(&mut out, "autorefresh", &credentials.autorefresh);
    push_element(
        &mut out,
        "charts",
        if credentials.charts_visible { "1" } else { "0" },
    );
    push_element(
        &mut out,
        "guest",
        if credentials.is_guest { "1" } else { "0" },
    );
    if let Some(warning) = &credentials.pw_warning {
        push_element(&mut out, "password_warning", warning);
    }
    out.push_str(body);
    out.push_str("</envelope>");
    out
}

/// Appends `<name>escaped value</name>`.
pub fn push_element(out: &mut String, name: &str, value: &str) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    out.push_str(&escape(value));
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}
