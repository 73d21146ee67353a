//! Per-request access logging.

use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use crate::request::GsadRequest;
use crate::response::HttpResponse;

use super::{Handler, Next};

/// Logs method, path, status, and duration.
pub struct AccessLog;

#[async_trait]
impl Handler for AccessLog {
    async fn handle(&self, req: &mut GsadRequest, next: Next<'_>) -> HttpResponse {
        let method = req.method.clone();
        let path = req.path().to_string();
        let start = Instant::now();

        let response = next.run(req).await;

        info!(
            method = %method,
            path = %path,
            client = %req.client_addr,
            status = %response.status().as_u16(),
            duration_ms = %start.elapsed().as_millis(),
            "HTTP request"
        );

        response
    }
}
