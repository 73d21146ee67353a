//! Static assets from the configured web root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use http::StatusCode;
use http::header::CACHE_CONTROL;
use percent_encoding::percent_decode_str;

use crate::dispatch::{Handler, Next};
use crate::error::DispatchError;
use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};

pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a URL path below the root, refusing anything that could climb
    /// out of it.
    pub fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let decoded = percent_decode_str(url_path).decode_utf8().ok()?;
        let relative = Path::new(decoded.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return None;
        }
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl Handler for StaticFiles {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        let Some(path) = self.resolve(req.path()) else {
            return DispatchError::NotFound.into_response(req);
        };

        match tokio::fs::read(&path).await {
            Ok(contents) => {
                let mime = mime_guess::from_path(&path).first_or_octet_stream();
                let mut response = response::build(StatusCode::OK, mime.as_ref(), contents);
                response::set_header(&mut response, CACHE_CONTROL, "max-age=3600, public");
                response
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Static file not served");
                DispatchError::NotFound.into_response(req)
            }
        }
    }
}
