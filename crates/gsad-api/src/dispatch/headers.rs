//! Attaches the process-wide security headers to every response.

use async_trait::async_trait;

use crate::request::GsadRequest;
use crate::response::{HttpResponse, SecurityHeaders};

use super::{Handler, Next};

pub struct ApplySecurityHeaders {
    headers: SecurityHeaders,
}

impl ApplySecurityHeaders {
    pub fn new(headers: SecurityHeaders) -> Self {
        Self { headers }
    }
}

#[async_trait]
impl Handler for ApplySecurityHeaders {
    async fn handle(&self, req: &mut GsadRequest, next: Next<'_>) -> HttpResponse {
        let mut response = next.run(req).await;
        self.headers.apply(&mut response, req.is_tls);
        response
    }
}
