//! API Configuration Module
//!
//! Server-level settings: bind address, CORS and deployment environment.
//! Loaded from environment variables with development defaults, built once
//! in `main` and passed to the router.

use crate::error::{ApiError, ApiResult};
use std::net::SocketAddr;

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host or IP the listener binds to.
    pub bind_host: String,

    pub port: u16,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Deployment environment ("development", "production", ...).
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `KANBAN_API_BIND`: Listen host (default: 0.0.0.0)
    /// - `PORT` or `KANBAN_API_PORT`: Listen port (default: 3000)
    /// - `KANBAN_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `KANBAN_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `KANBAN_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `KANBAN_ENVIRONMENT`: Deployment environment (default: development)
    ///
    /// # Errors
    /// Returns an error if the port is set but not a valid number.
    pub fn from_env() -> ApiResult<Self> {
        let defaults = Self::default();

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("KANBAN_API_PORT").ok())
        {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ApiError::malformed(format!("Invalid port value: {}", raw)))?,
            None => defaults.port,
        };

        let cors_origins = std::env::var("KANBAN_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_host: std::env::var("KANBAN_API_BIND").unwrap_or(defaults.bind_host),
            port,
            cors_origins,
            cors_allow_credentials: std::env::var("KANBAN_CORS_ALLOW_CREDENTIALS")
                .ok()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(defaults.cors_allow_credentials),
            cors_max_age_secs: std::env::var("KANBAN_CORS_MAX_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cors_max_age_secs),
            environment: std::env::var("KANBAN_ENVIRONMENT")
                .map(|e| e.to_lowercase())
                .unwrap_or(defaults.environment),
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }

    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ApiError::malformed(format!("Invalid bind address {}: {}", addr, e)))
    }

    /// Production must name its CORS origins explicitly.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.is_production() && self.cors_origins.is_empty() {
            return Err(ApiError::malformed(
                "CORS origins not configured for production. Set KANBAN_CORS_ORIGINS.",
            ));
        }
        Ok(())
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // *.example.com
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain
                        .strip_suffix(pattern)
                        .is_some_and(|sub| sub.ends_with('.'));
                }
            }
            false
        })
    }
}
