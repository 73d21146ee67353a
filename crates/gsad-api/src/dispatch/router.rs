//! Composite handlers that pick a child chain.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use http::header::ALLOW;
use regex::Regex;

use crate::error::DispatchError;
use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};

use super::{Chain, Handler, Next};

/// Splits GET and POST into separate subtrees.
pub struct MethodRouter {
    get: Arc<dyn Handler>,
    post: Arc<dyn Handler>,
}

impl MethodRouter {
    pub fn new(get: impl Handler + 'static, post: impl Handler + 'static) -> Self {
        Self {
            get: Arc::new(get),
            post: Arc::new(post),
        }
    }
}

#[async_trait]
impl Handler for MethodRouter {
    async fn handle(&self, req: &mut GsadRequest, next: Next<'_>) -> HttpResponse {
        let subtree = match req.method {
            Method::GET => &self.get,
            Method::POST => &self.post,
            _ => {
                let mut response = DispatchError::MethodNotAllowed.into_response(req);
                response::set_header(&mut response, ALLOW, "GET, POST");
                return response;
            }
        };
        subtree.handle(req, next).await
    }
}

/// First-match-wins routing on the request path.
pub struct UrlRouter {
    routes: Vec<(Regex, Chain)>,
    fallback: Chain,
}

impl UrlRouter {
    /// A router whose unmatched requests go to `fallback`.
    pub fn new(fallback: Chain) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    /// Adds a route. Patterns are anchored by the caller.
    pub fn route(mut self, pattern: &str, chain: Chain) -> Result<Self, regex::Error> {
        self.routes.push((Regex::new(pattern)?, chain));
        Ok(self)
    }

    fn select(&self, path: &str) -> &Chain {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.is_match(path))
            .map(|(_, chain)| chain)
            .unwrap_or(&self.fallback)
    }
}

#[async_trait]
impl Handler for UrlRouter {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        let chain = self.select(req.path());
        chain.run(req).await
    }
}
