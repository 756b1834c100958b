//! Environment-driven configuration for the server binary.
//!
//! Defaults come from [`ServerConfig::default`]; every `FLOWGATE_*` variable
//! that is set overrides one field. Malformed values are rejected rather
//! than ignored.

use std::path::PathBuf;
use std::time::Duration;

use flowgate_gateway::{ConfigError, ServerConfig};
use humantime_serde::re::humantime;

/// Everything the binary needs to start.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// File-backed attribute store; in-memory when unset.
    pub attribute_store_path: Option<PathBuf>,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let mut config = AppConfig::default();
        let server = &mut config.server;

        // Listeners and transport security
        env.flag("FLOWGATE_SECURE", &mut server.security.secure)?;
        env.flag("FLOWGATE_USE_AUTH", &mut server.security.use_auth)?;
        env.flag("FLOWGATE_ALLOW_CORS", &mut server.security.allow_cors)?;
        env.list("FLOWGATE_ALLOWED_ORIGINS", &mut server.security.allowed_origins);
        env.list("FLOWGATE_ALLOWED_HEADERS", &mut server.security.allowed_headers);
        if let Some(path) = env.get("FLOWGATE_CERTIFICATE_FILE") {
            server.security.certificate_file = Some(path.into());
        }
        if let Some(path) = env.get("FLOWGATE_KEY_FILE") {
            server.security.key_file = Some(path.into());
        }
        if let Some(addr) = env.get("FLOWGATE_GRPC_ADDRESS") {
            server.security.grpc_host_address = addr;
        }
        if let Some(addr) = env.get("FLOWGATE_HTTP_ADDRESS") {
            server.security.http_host_address = addr;
        }
        if let Some(name) = env.get("FLOWGATE_TLS_SERVER_NAME") {
            server.tls_server_name = name;
        }
        env.duration("FLOWGATE_DIAL_TIMEOUT", &mut server.dial_timeout)?;
        env.flag("FLOWGATE_GRPC_SERVER_REFLECTION", &mut server.grpc_server_reflection)?;

        // Authentication
        if let Some(header) = env.get("FLOWGATE_AUTH_HEADER") {
            server.auth.custom_authorization_header = (!header.is_empty()).then_some(header);
        }
        env.flag("FLOWGATE_AUTH_DISABLE_FOR_HTTP", &mut server.auth.disable_for_http)?;
        env.flag("FLOWGATE_AUTH_DISABLE_FOR_GRPC", &mut server.auth.disable_for_grpc)?;
        if let Some(cookie) = env.get("FLOWGATE_AUTH_COOKIE") {
            server.auth.cookie_name = cookie;
        }
        if let Some(url) = env.get("FLOWGATE_AUTH_SERVER_URL") {
            server.auth.authorization_server_url = url;
        }
        if let Some(url) = env.get("FLOWGATE_AUTH_USER_INFO_URL") {
            server.auth.user_info_url = Some(url);
        }
        if let Some(url) = env.get("FLOWGATE_AUTH_REDIRECT_URL") {
            server.auth.redirect_url = url;
        }
        if let Some(secret) = env.get("FLOWGATE_AUTH_SECRET") {
            server.auth.shared_secret = Some(secret);
        }
        env.duration("FLOWGATE_SESSION_TTL", &mut server.auth.session_ttl)?;

        // Process
        if let Some(path) = env.get("FLOWGATE_ATTRIBUTE_STORE_PATH") {
            config.attribute_store_path = Some(path.into());
        }
        env.flag("FLOWGATE_LOG_JSON", &mut config.log_json)?;

        config.server.validate()?;
        if config.server.security.use_auth && config.server.auth.shared_secret.is_none() {
            return Err(ConfigError::Invalid(
                "FLOWGATE_USE_AUTH requires FLOWGATE_AUTH_SECRET".into(),
            ));
        }

        Ok(config)
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string())
    }

    fn flag(&self, key: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(raw) = self.get(key) {
            *target = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => return Err(invalid(key, &raw)),
            };
        }
        Ok(())
    }

    fn list(&self, key: &str, target: &mut Vec<String>) {
        if let Some(raw) = self.get(key) {
            *target = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    fn duration(&self, key: &str, target: &mut Duration) -> Result<(), ConfigError> {
        if let Some(raw) = self.get(key) {
            *target = humantime::parse_duration(&raw).map_err(|_| invalid(key, &raw))?;
        }
        Ok(())
    }
}

fn invalid(key: &str, raw: &str) -> ConfigError {
    ConfigError::Invalid(format!("{key}={raw:?}"))
}
