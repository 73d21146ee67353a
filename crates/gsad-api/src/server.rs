//! Listener lifecycle: accept loop, TLS handshake, hyper connection, and
//! the optional HTTP→HTTPS redirect listener.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http::header::HOST;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;

use gsad_core::error::AppError;

use crate::dispatch::Chain;
use crate::request::GsadRequest;
use crate::response::{self, HttpResponse};
use crate::router::build_router;
use crate::state::AppState;
use crate::tls::{ClientStream, setup_tls};
use crate::watcher::PeerProbe;

/// The browser-facing server.
pub struct GsadServer {
    state: AppState,
    chain: Arc<Chain>,
    tls: Option<TlsAcceptor>,
}

impl GsadServer {
    /// Builds the dispatch chain and loads TLS material.
    pub fn new(state: AppState) -> Result<Self, AppError> {
        let chain = Arc::new(build_router(&state)?);
        let tls = setup_tls(&state.config.server.tls)?;
        Ok(Self { state, chain, tls })
    }

    /// Serves until `cancel` flips to `true`.
    pub async fn start(&self, mut cancel: watch::Receiver<bool>) -> Result<(), AppError> {
        let server = &self.state.config.server;
        let addr = format!("{}:{}", server.host, server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

        tracing::info!(
            address = %addr,
            tls = self.tls.is_some(),
            "GSA daemon listening"
        );

        if let Some(port) = server.redirect_port {
            let redirect_addr = format!("{}:{}", server.host, port);
            let redirect = TcpListener::bind(&redirect_addr).await.map_err(|e| {
                AppError::internal(format!("Failed to bind redirect listener {redirect_addr}: {e}"))
            })?;
            tracing::info!(address = %redirect_addr, "Redirecting HTTP to HTTPS");
            tokio::spawn(serve_redirect(redirect, server.port, cancel.clone()));
        }

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let state = self.state.clone();
                            let chain = Arc::clone(&self.chain);
                            let tls = self.tls.clone();
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_connection(state, chain, tls, stream, peer_addr).await {
                                    tracing::warn!(client = %peer_addr, error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Accept error");
                        }
                    }
                }
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        tracing::info!("GSA daemon shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle_connection(
        state: AppState,
        chain: Arc<Chain>,
        tls: Option<TlsAcceptor>,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<(), AppError> {
        // The watcher peeks at a clone of the raw socket.
        let std_stream = stream.into_std()?;
        let probe = PeerProbe::new(&std_stream)
            .inspect_err(|e| tracing::debug!(error = %e, "No liveness probe for connection"))
            .ok()
            .map(Arc::new);
        let stream = TcpStream::from_std(std_stream)?;

        let (io, is_tls) = match tls {
            Some(acceptor) => match acceptor.accept(stream).await {
                Ok(tls_stream) => (ClientStream::Tls(Box::new(tls_stream)), true),
                Err(e) => {
                    tracing::warn!(client = %peer_addr, error = %e, "TLS handshake failed");
                    return Ok(());
                }
            },
            None => (ClientStream::Tcp(stream), false),
        };
        let client_addr = peer_addr.ip().to_canonical();

        let service = service_fn(move |req: Request<Incoming>| {
            let state = state.clone();
            let chain = Arc::clone(&chain);
            let probe = probe.clone();
            async move {
                let received_at = state.sessions.now();
                let (parts, body) = req.into_parts();

                let body = match Limited::new(body, state.config.server.max_body_bytes)
                    .collect()
                    .await
                {
                    Ok(collected) => collected.to_bytes(),
                    Err(e) => return Ok::<_, Infallible>(body_error(e)),
                };

                let mut req = GsadRequest::new(
                    Request::from_parts(parts, body),
                    client_addr,
                    is_tls,
                    received_at,
                    &state.validator,
                );
                if let Some(probe) = probe {
                    req = req.with_peer(probe);
                }

                Ok::<_, Infallible>(chain.run(&mut req).await)
            }
        });

        if let Err(e) = http1::Builder::new()
            .serve_connection(TokioIo::new(io), service)
            .await
        {
            tracing::debug!(client = %peer_addr, error = %e, "HTTP connection ended with error");
        }

        Ok(())
    }
}

fn body_error(e: Box<dyn std::error::Error + Send + Sync>) -> HttpResponse {
    if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
        response::text(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else {
        tracing::debug!(error = %e, "Failed to read request body");
        response::text(StatusCode::BAD_REQUEST, "Failed to read request body")
    }
}

/// Host part of a `Host` header, without the port.
fn host_without_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}

/// `Location` for the HTTPS equivalent of a plain-HTTP request.
pub fn https_location(host: Option<&str>, https_port: u16, path_and_query: &str) -> String {
    let host = host_without_port(host.unwrap_or("localhost"));
    if https_port == 443 {
        format!("https://{host}{path_and_query}")
    } else {
        format!("https://{host}:{https_port}{path_and_query}")
    }
}

/// Answers every plain-HTTP request with a redirect to HTTPS.
async fn serve_redirect(listener: TcpListener, https_port: u16, mut cancel: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                let Ok((stream, _)) = result else { continue };
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| async move {
                        let host = req.headers().get(HOST).and_then(|v| v.to_str().ok());
                        let path = req.uri().path_and_query().map_or("/", |p| p.as_str());
                        let location = https_location(host, https_port, path);
                        Ok::<_, Infallible>(response::redirect(StatusCode::MOVED_PERMANENTLY, &location))
                    });
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        tracing::debug!(error = %e, "Redirect connection ended with error");
                    }
                });
            }
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    break;
                }
            }
        }
    }
}
