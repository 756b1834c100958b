//! Server configuration with validation.
//!
//! Loaded once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener, TLS and CORS settings
    pub security: ServerSecurityConfig,
    /// Authentication settings (used when `security.use_auth` is set)
    pub auth: AuthConfig,
    /// Name the internal HTTP→RPC dial verifies the certificate against
    pub tls_server_name: String,
    /// Connect timeout for the internal HTTP→RPC dial
    #[serde(with = "humantime_serde")]
    pub dial_timeout: Duration,
    /// Serve `grpc.reflection.v1` next to the admin service
    pub grpc_server_reflection: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            security: ServerSecurityConfig::default(),
            auth: AuthConfig::default(),
            tls_server_name: "localhost".to_string(),
            dial_timeout: Duration::from_secs(5),
            grpc_server_reflection: false,
        }
    }
}

impl ServerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grpc = self.security.grpc_addr()?;
        let http = self.security.http_addr()?;

        if !self.security.secure && grpc == http && grpc.port != 0 {
            return Err(ConfigError::DuplicateAddress(grpc.to_string()));
        }

        if self.security.secure {
            if self.security.certificate_file.is_none() {
                return Err(ConfigError::MissingTlsFile("certificate_file"));
            }
            if self.security.key_file.is_none() {
                return Err(ConfigError::MissingTlsFile("key_file"));
            }
            if self.tls_server_name.is_empty() {
                return Err(ConfigError::Invalid(
                    "tls_server_name cannot be empty in secure mode".into(),
                ));
            }
        }

        if self.dial_timeout.is_zero() {
            return Err(ConfigError::Invalid("dial_timeout cannot be 0".into()));
        }

        if self.security.use_auth && self.auth.cookie_name.is_empty() {
            return Err(ConfigError::Invalid("auth.cookie_name cannot be empty".into()));
        }

        Ok(())
    }
}

/// Listener and transport security settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSecurityConfig {
    /// Serve RPC and HTTP on one TLS port
    pub secure: bool,
    /// Install the authentication interceptors
    pub use_auth: bool,
    /// Wrap the HTTP mux in CORS
    pub allow_cors: bool,
    /// Allowed origins (`*` mirrors the request origin)
    pub allowed_origins: Vec<String>,
    /// Extra allowed request headers, merged with `Content-Type`
    pub allowed_headers: Vec<String>,
    /// PEM certificate chain (secure mode)
    pub certificate_file: Option<PathBuf>,
    /// PEM private key (secure mode)
    pub key_file: Option<PathBuf>,
    /// RPC listener address (insecure mode)
    pub grpc_host_address: String,
    /// HTTP listener address (the only listener in secure mode)
    pub http_host_address: String,
}

impl Default for ServerSecurityConfig {
    fn default() -> Self {
        Self {
            secure: false,
            use_auth: false,
            allow_cors: false,
            allowed_origins: Vec::new(),
            allowed_headers: Vec::new(),
            certificate_file: None,
            key_file: None,
            grpc_host_address: "0.0.0.0:8089".to_string(),
            http_host_address: "0.0.0.0:8088".to_string(),
        }
    }
}

impl ServerSecurityConfig {
    /// Get RPC listener address
    pub fn grpc_addr(&self) -> Result<ListenAddr, ConfigError> {
        ListenAddr::parse(&self.grpc_host_address)
    }

    /// Get HTTP listener address
    pub fn http_addr(&self) -> Result<ListenAddr, ConfigError> {
        ListenAddr::parse(&self.http_host_address)
    }
}

/// Listener address as configured: `host:port`, `[v6]:port` or `:port`.
///
/// Host names are resolved when the listener binds. An empty host means all
/// interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddr {
    pub host: String,
    pub port: u16,
}

impl ListenAddr {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidAddress(raw.to_string());

        let (host, port) = raw.trim().rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        let host = match host.strip_prefix('[') {
            Some(rest) => rest.strip_suffix(']').ok_or_else(invalid)?,
            None if host.contains(':') => return Err(invalid()),
            None => host,
        };
        if host.chars().any(|c| c.is_whitespace() || c == '/' || c == '[' || c == ']') {
            return Err(invalid());
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Resolve to the first socket address the host maps to.
    pub async fn resolve(&self) -> std::io::Result<SocketAddr> {
        if self.host.is_empty() {
            return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port));
        }
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} did not resolve to any address", self.host),
                )
            })
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Address a local client should dial to reach a listener bound on `addr`.
/// Wildcard binds are reached through loopback.
pub fn dialable(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Header copied into `authorization` when the latter is absent
    pub custom_authorization_header: Option<String>,
    /// Skip verification for calls tagged as HTTP-originated
    pub disable_for_http: bool,
    /// Skip verification for native RPC calls
    pub disable_for_grpc: bool,
    /// Cookie carrying the access token for browser clients
    pub cookie_name: String,
    /// Issuer advertised by the authorization-server metadata endpoint
    pub authorization_server_url: String,
    /// Enables `/me` when set
    pub user_info_url: Option<String>,
    /// Where `/callback` sends the browser after a successful login
    pub redirect_url: String,
    /// Shared secret for the bundled token context
    pub shared_secret: Option<String>,
    /// Lifetime of issued session cookies
    #[serde(with = "humantime_serde")]
    pub session_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            custom_authorization_header: Some("flowgate-authorization".to_string()),
            disable_for_http: false,
            disable_for_grpc: false,
            cookie_name: "flowgate_idt".to_string(),
            authorization_server_url: "http://localhost:8088".to_string(),
            user_info_url: None,
            redirect_url: "/".to_string(),
            shared_secret: None,
            session_ttl: Duration::from_secs(3600),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Address is not of the form `host:port`
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// RPC and HTTP listeners share an address in insecure mode
    #[error("grpc and http listeners share address {0}")]
    DuplicateAddress(String),
    /// Secure mode without certificate material
    #[error("secure mode requires {0}")]
    MissingTlsFile(&'static str),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
