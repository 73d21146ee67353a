//! TLS termination for the browser listener.

use std::fs::File;
use std::io::BufReader;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;

use gsad_core::config::TlsConfig;
use gsad_core::error::AppError;

/// Builds the acceptor when TLS is enabled.
pub fn setup_tls(config: &TlsConfig) -> Result<Option<TlsAcceptor>, AppError> {
    if !config.enabled {
        return Ok(None);
    }
    tracing::info!(cert = %config.cert_path, "TLS enabled, loading certificate and key");
    let certs = load_certs(&config.cert_path)?;
    let key = load_key(&config.key_path)?;
    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| AppError::tls(format!("Invalid certificate or key: {e}")))?;
    Ok(Some(TlsAcceptor::from(Arc::new(server_config))))
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::tls(format!("Failed to open certificate file '{path}': {e}")))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::tls(format!("Failed to parse certificates in '{path}': {e}")))?;
    if certs.is_empty() {
        return Err(AppError::tls(format!("No certificates found in '{path}'")));
    }
    Ok(certs)
}

fn load_key(path: &str) -> Result<PrivateKeyDer<'static>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::tls(format!("Failed to open private key file '{path}': {e}")))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| AppError::tls(format!("Failed to parse private key in '{path}': {e}")))?
        .ok_or_else(|| AppError::tls(format!("No private key found in '{path}'")))
}

/// A browser connection, plain or TLS.
pub enum ClientStream {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ClientStream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        match self.get_mut() {
            ClientStream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), std::io::Error>> {
        match self.get_mut() {
            ClientStream::Tcp(s) => Pin::new(s).poll_flush(cx),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        match self.get_mut() {
            ClientStream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            ClientStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
