//! Chain-of-responsibility request dispatch.
//!
//! A [`Chain`] is an ordered list of [`Handler`]s. Each handler either
//! answers the request itself or calls [`Next::run`] to hand it to the rest
//! of the chain, optionally after attaching data to
//! [`GsadRequest::extensions`]. Routers are handlers that own child chains
//! and pick one of them.

pub mod access_log;
pub mod guard;
pub mod headers;
pub mod router;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;

pub use access_log::AccessLog;
pub use guard::Utf8Guard;
pub use headers::ApplySecurityHeaders;
pub use router::{MethodRouter, UrlRouter};
pub use session::{BuildCredentials, SessionLookup};

use crate::error::DispatchError;
use crate::request::GsadRequest;
use crate::response::HttpResponse;

/// One node of the chain.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: &mut GsadRequest, next: Next<'_>) -> HttpResponse;
}

/// The part of the chain after the current handler.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    rest: &'a [Arc<dyn Handler>],
}

impl<'a> Next<'a> {
    /// Runs the remaining handlers. Falling off the end is a 404.
    pub async fn run(self, req: &mut GsadRequest) -> HttpResponse {
        match self.rest.split_first() {
            Some((first, rest)) => first.handle(req, Next { rest }).await,
            None => DispatchError::NotFound.into_response(req),
        }
    }

    /// Whether nothing follows.
    pub fn is_end(&self) -> bool {
        self.rest.is_empty()
    }
}

/// An ordered list of handlers.
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler.
    pub fn then(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Appends an already shared handler.
    pub fn then_shared(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the request through the chain from the top.
    pub async fn run(&self, req: &mut GsadRequest) -> HttpResponse {
        Next {
            rest: &self.handlers,
        }
        .run(req)
        .await
    }
}

/// A nested chain is terminal: it answers on its own.
#[async_trait]
impl Handler for Chain {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        self.run(req).await
    }
}

/// Terminal handler that always answers with a fixed failure.
pub struct Reject(pub fn() -> DispatchError);

#[async_trait]
impl Handler for Reject {
    async fn handle(&self, req: &mut GsadRequest, _next: Next<'_>) -> HttpResponse {
        (self.0)().into_response(req)
    }
}
