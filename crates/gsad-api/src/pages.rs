//! Pages the daemon produces on its own: login and error pages.

use http::StatusCode;

use crate::render::{self, push_element};
use crate::request::GsadRequest;
use crate::response::HttpResponse;

const DEFAULT_BACK_URL: &str = "/omp?cmd=get_tasks";

/// Login form, optionally with a message.
///
/// `url` is where the browser goes after logging in.
pub fn login_page(
    req: &GsadRequest,
    status: StatusCode,
    message: Option<&str>,
    url: Option<&str>,
) -> HttpResponse {
    let mut body = String::from("<login_page>");
    if let Some(message) = message {
        push_element(&mut body, "message", message);
    }
    if let Some(url) = url {
        push_element(&mut body, "url", url);
    }
    body.push_str("</login_page>");
    render::respond(req, status, &render::anonymous_envelope(req.received_at, &body))
}

/// Generic error page.
pub fn error_page(req: &GsadRequest, status: StatusCode, title: &str, message: &str) -> HttpResponse {
    let mut body = String::from("<gsad_response>");
    push_element(&mut body, "title", title);
    push_element(&mut body, "message", message);
    push_element(&mut body, "backurl", DEFAULT_BACK_URL);
    body.push_str("</gsad_response>");
    render::respond(req, status, &render::anonymous_envelope(req.received_at, &body))
}
