//! Command-line flags.
//!
//! Every flag is optional and, when given, overrides the value loaded from
//! the configuration file and the `GSAD__*` environment.

use clap::Parser;

use gsad_core::config::AppConfig;

/// Greenbone Security Assistant daemon
#[derive(Debug, Parser)]
#[command(name = "gsad", version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Address to listen on
    #[arg(long)]
    pub listen: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Plain-HTTP port that redirects to the HTTPS listener
    #[arg(long)]
    pub redirect_port: Option<u16>,

    /// Serve plain HTTP instead of HTTPS
    #[arg(long)]
    pub http_only: bool,

    /// PEM certificate chain for HTTPS
    #[arg(long)]
    pub ssl_certificate: Option<String>,

    /// PEM private key for HTTPS
    #[arg(long)]
    pub ssl_private_key: Option<String>,

    /// Always mark the session cookie secure
    #[arg(long)]
    pub secure_cookie: bool,

    /// Directory with the static web assets
    #[arg(long)]
    pub static_dir: Option<String>,

    /// Manager address: `unix:/path/to/socket` or `host:port`
    #[arg(long)]
    pub mlisten: Option<String>,

    /// Minutes of inactivity before a session expires
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Account used for automatic guest logins
    #[arg(long, requires = "guest_password")]
    pub guest_username: Option<String>,

    /// Password of the guest account
    #[arg(long, requires = "guest_username")]
    pub guest_password: Option<String>,

    /// Seconds between client liveness checks, 0 to disable
    #[arg(long)]
    pub client_watch_interval: Option<u64>,

    /// `Strict-Transport-Security` max-age in seconds
    #[arg(long)]
    pub http_sts_max_age: Option<u64>,

    /// `X-Frame-Options` value
    #[arg(long)]
    pub http_frame_opts: Option<String>,

    /// `Content-Security-Policy` value
    #[arg(long)]
    pub http_csp: Option<String>,

    /// `Access-Control-Allow-Origin` value, enables CORS headers
    #[arg(long)]
    pub http_cors: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (pretty or json)
    #[arg(long)]
    pub log_format: Option<String>,
}

impl Cli {
    /// Writes every given flag into `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        let server = &mut config.server;
        if let Some(host) = &self.listen {
            server.host = host.clone();
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if self.redirect_port.is_some() {
            server.redirect_port = self.redirect_port;
        }
        if let Some(dir) = &self.static_dir {
            server.static_dir = dir.clone();
        }
        if self.secure_cookie {
            server.secure_cookie = true;
        }
        if let Some(cert) = &self.ssl_certificate {
            server.tls.cert_path = cert.clone();
            server.tls.enabled = true;
        }
        if let Some(key) = &self.ssl_private_key {
            server.tls.key_path = key.clone();
            server.tls.enabled = true;
        }
        if self.http_only {
            server.tls.enabled = false;
        }

        let session = &mut config.session;
        if let Some(minutes) = self.timeout {
            session.timeout_minutes = minutes;
        }
        if self.guest_username.is_some() {
            session.guest_username = self.guest_username.clone();
            session.guest_password = self.guest_password.clone();
        }
        if let Some(seconds) = self.client_watch_interval {
            session.client_watch_interval_seconds = seconds;
        }

        let headers = &mut config.headers;
        if self.http_sts_max_age.is_some() {
            headers.hsts_max_age = self.http_sts_max_age;
        }
        if let Some(value) = &self.http_frame_opts {
            headers.frame_options = value.clone();
        }
        if let Some(value) = &self.http_csp {
            headers.content_security_policy = value.clone();
        }
        if self.http_cors.is_some() {
            headers.allow_origin = self.http_cors.clone();
        }

        if let Some(address) = &self.mlisten {
            config.backend.address = address.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
    }
}
