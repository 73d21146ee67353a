//! The request as the dispatch chain sees it.

use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{CONTENT_TYPE, COOKIE};
use http::{Extensions, HeaderMap, Method, Uri};
use percent_encoding::percent_decode;

use gsad_auth::{ValidationError, Validator};

use crate::watcher::PeerProbe;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "GSAD_SID";

/// One decoded request parameter.
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name, lossily decoded.
    pub name: String,
    /// Raw decoded bytes.
    pub value: Vec<u8>,
    /// Normalized value, present only when validation passed.
    pub text: Option<String>,
    /// Why validation failed.
    pub error: Option<ValidationError>,
}

impl Param {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Query and form parameters in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: Vec<Param>,
}

impl Params {
    /// Decodes `application/x-www-form-urlencoded` pairs and validates each
    /// by name.
    pub fn parse(sources: &[&[u8]], validator: &Validator) -> Self {
        let mut entries = Vec::new();
        for source in sources {
            for pair in source.split(|b| *b == b'&').filter(|p| !p.is_empty()) {
                let (name, value) = match pair.iter().position(|b| *b == b'=') {
                    Some(i) => (&pair[..i], &pair[i + 1..]),
                    None => (pair, &[][..]),
                };
                entries.push(Self::validated(decode(name), decode(value), validator));
            }
        }
        Self { entries }
    }

    fn validated(name: Vec<u8>, value: Vec<u8>, validator: &Validator) -> Param {
        let (name, name_ok) = match String::from_utf8(name) {
            Ok(name) => (name, true),
            Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), false),
        };
        if !name_ok {
            return Param {
                error: Some(ValidationError::InvalidUtf8(name.clone())),
                name,
                value,
                text: None,
            };
        }

        let outcome = match validator.rule_name_for(&name) {
            Some(rule) => validator.normalize(rule, &value),
            None => Err(ValidationError::UnknownName(name.clone())),
        };
        let (text, error) = match outcome {
            Ok(text) => (Some(text), None),
            Err(e) => (None, Some(e)),
        };
        Param {
            name,
            value,
            text,
            error,
        }
    }

    /// First parameter named `name`, valid or not.
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.entries.iter().find(|p| p.name == name)
    }

    /// Normalized value of the first valid parameter named `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|p| p.text.as_deref())
    }

    /// Non-empty valid value.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.value(name).filter(|v| !v.is_empty())
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.entries.iter()
    }

    pub fn invalid(&self) -> impl Iterator<Item = &Param> {
        self.entries.iter().filter(|p| !p.is_valid())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|b| if *b == b'+' { b' ' } else { *b })
        .collect();
    percent_decode(&spaced).collect()
}

/// A fully buffered request plus everything the chain attaches to it.
#[derive(Debug)]
pub struct GsadRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Address of the connecting client.
    pub client_addr: IpAddr,
    /// Whether the connection is TLS.
    pub is_tls: bool,
    pub received_at: DateTime<Utc>,
    pub params: Params,
    /// Auxiliary data added by chain nodes (session, credentials).
    pub extensions: Extensions,
    /// Liveness probe on the client socket, when the listener provides one.
    pub peer: Option<Arc<PeerProbe>>,
}

impl GsadRequest {
    /// Buffers an HTTP request and validates its parameters.
    ///
    /// The form body is only decoded for urlencoded POSTs.
    pub fn new(
        request: http::Request<Bytes>,
        client_addr: IpAddr,
        is_tls: bool,
        received_at: DateTime<Utc>,
        validator: &Validator,
    ) -> Self {
        let (parts, body) = request.into_parts();

        let query = parts.uri.query().unwrap_or_default().as_bytes();
        let is_form = parts.method == Method::POST
            && parts
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        let params = if is_form {
            Params::parse(&[query, &body[..]], validator)
        } else {
            Params::parse(&[query], validator)
        };

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            client_addr,
            is_tls,
            received_at,
            params,
            extensions: parts.extensions,
            peer: None,
        }
    }

    /// Attaches a liveness probe on the client socket.
    pub fn with_peer(mut self, peer: Arc<PeerProbe>) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Value of the session cookie, if the browser sent one.
    pub fn session_cookie(&self) -> Option<&str> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim())
    }

    /// The requested URL without its `token` parameter, for redirects back
    /// after a fresh login.
    pub fn caller(&self) -> String {
        let path = self.uri.path();
        let query: Vec<&str> = self
            .uri
            .query()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty() && !pair.starts_with("token="))
            .collect();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{}", query.join("&"))
        }
    }

    /// Whether the client asked for JSON output.
    pub fn wants_json(&self) -> bool {
        self.params.value("format") == Some("json")
    }
}
