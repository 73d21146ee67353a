//! # gsad-api
//!
//! The browser-facing side of the daemon, built directly on `hyper`.
//!
//! Requests flow through a [`dispatch::Chain`] of handlers: access logging,
//! security headers, the UTF-8 guard, the method router, and per-URL
//! sub-chains that look up the session, derive credentials and finally run
//! a terminal handler. See [`router::build_router`] for the layout.

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod commands;
pub mod handlers;
pub mod pages;
pub mod render;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod state;
pub mod tls;
pub mod watcher;

pub use dispatch::{Chain, Handler, Next};
pub use error::DispatchError;
pub use request::{GsadRequest, Param, Params};
pub use response::HttpResponse;
pub use router::build_router;
pub use server::GsadServer;
pub use state::AppState;
