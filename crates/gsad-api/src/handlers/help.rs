//! Help pages.

use async_trait::async_trait;
use http::StatusCode;

use crate::dispatch::{Handler, Next};
use crate::error::DispatchError;
use crate::render::{self, push_element};
use crate::request::GsadRequest;
use crate::response::HttpResponse;

use super::{credentials, respond};

/// `/help/<page>.html`, rendered for the logged-in user.
pub struct Help;

impl Help {
    fn page(path: &str) -> Option<&str> {
        let page = path.strip_prefix("/help/")?.strip_suffix(".html")?;
        (!page.is_empty()
            && page
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-'))
        .then_some(page)
    }

    fn run(req: &GsadRequest) -> Result<HttpResponse, DispatchError> {
        let credentials = credentials(req)?;
        let page = Self::page(req.path()).ok_or(DispatchError::NotFound)?;

        let mut body = String::from("<help>");
        push_element(&mut body, "page", page);
        body.push_str("</help>");
        Ok(render::respond(
            req,
            StatusCode::OK,
            &render::session_envelope(&credentials, &body),
        ))
    }
}

#[async_trait]
impl Handler for Help {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        let result = Self::run(req);
        respond(req, result)
    }
}
