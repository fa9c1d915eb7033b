//! HTTP server settings.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `CORS_ALLOWED_ORIGIN` | `http://localhost:4200` |

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:4200";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerConfigError {
    #[error("BIND_ADDR is not a socket address: {0:?}")]
    BindAddr(String),

    #[error("CORS_ALLOWED_ORIGIN is not a valid header value: {0:?}")]
    CorsOrigin(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub cors_allowed_origin: HeaderValue,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ServerConfigError::BindAddr(raw_addr.clone()))?;

        let raw_origin =
            lookup("CORS_ALLOWED_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());
        let cors_allowed_origin = HeaderValue::from_str(raw_origin.trim())
            .map_err(|_| ServerConfigError::CorsOrigin(raw_origin.clone()))?;

        Ok(Self {
            bind_addr,
            cors_allowed_origin,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cors_allowed_origin: HeaderValue::from_static(DEFAULT_CORS_ORIGIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.bind_addr.port(), 8080);
    }

    #[test]
    fn overrides_and_errors() {
        let cfg = ServerConfig::from_lookup(|name| match name {
            "BIND_ADDR" => Some("127.0.0.1:9000".to_string()),
            "CORS_ALLOWED_ORIGIN" => Some("https://sales.example.com".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.cors_allowed_origin, "https://sales.example.com");

        let err = ServerConfig::from_lookup(|name| {
            (name == "BIND_ADDR").then(|| "localhost".to_string())
        })
        .unwrap_err();
        assert_eq!(err, ServerConfigError::BindAddr("localhost".to_string()));

        let err = ServerConfig::from_lookup(|name| {
            (name == "CORS_ALLOWED_ORIGIN").then(|| "bad\norigin".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ServerConfigError::CorsOrigin(_)));
    }
}
