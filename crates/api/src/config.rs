//! Client configuration.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://localhost:49213";

pub const BASE_URL_ENV: &str = "PORTAL_API_BASE_URL";
pub const INSECURE_TLS_ENV: &str = "PORTAL_API_INSECURE_TLS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Accept self-signed certificates (local development API).
    pub accept_invalid_certs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Read `PORTAL_API_BASE_URL` and `PORTAL_API_INSECURE_TLS`, falling back
    /// to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        config.accept_invalid_certs = lookup(INSECURE_TLS_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        config
    }
}
