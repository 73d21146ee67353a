//! Rejects malformed URLs, headers, and parameter names before anything
//! else looks at them.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;

use gsad_auth::ValidationError;

use crate::error::DispatchError;
use crate::request::GsadRequest;
use crate::response::HttpResponse;

use super::{Handler, Next};

pub struct Utf8Guard;

impl Utf8Guard {
    fn check(req: &GsadRequest) -> Result<(), DispatchError> {
        let path = req.uri.path();
        if path.starts_with("//") {
            return Err(DispatchError::InvalidUrl);
        }
        if percent_decode_str(path).decode_utf8().is_err() {
            return Err(DispatchError::MalformedUtf8("URL".to_string()));
        }

        for (name, value) in &req.headers {
            if std::str::from_utf8(value.as_bytes()).is_err() {
                return Err(DispatchError::MalformedUtf8(format!("header '{name}'")));
            }
        }

        for param in req.params.iter() {
            if let Some(ValidationError::InvalidUtf8(_)) = &param.error {
                return Err(DispatchError::MalformedUtf8(format!(
                    "parameter '{}'",
                    param.name
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for Utf8Guard {
    async fn handle(&self, req: &mut GsadRequest, next: Next<'_>) -> HttpResponse {
        match Self::check(req) {
            Ok(()) => next.run(req).await,
            Err(e) => {
                tracing::debug!(path = %req.path(), error = %e, "Rejected malformed request");
                e.into_response(req)
            }
        }
    }
}
