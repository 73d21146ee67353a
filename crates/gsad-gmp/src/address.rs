//! Parsing of the configured manager address.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use gsad_core::error::AppError;

/// Where the manager listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendAddress {
    /// Unix-domain socket path.
    Unix(PathBuf),
    /// TCP host and port.
    Tcp {
        /// Host name or address.
        host: String,
        /// Port.
        port: u16,
    },
}

impl FromStr for BackendAddress {
    type Err = AppError;

    /// Accepts `unix:/path`, an absolute path, or `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix:") {
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if s.starts_with('/') {
            return Ok(Self::Unix(PathBuf::from(s)));
        }

        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AppError::configuration(format!("Backend address '{s}' has no port")))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| AppError::configuration(format!("Invalid backend port in '{s}'")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(AppError::configuration(format!(
                "Backend address '{s}' has no host"
            )));
        }

        Ok(Self::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp { host, port } => write!(f, "{host}:{port}"),
        }
    }
}
