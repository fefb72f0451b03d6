use crate::error::{ApiError, Result};
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "UPWATCH_API_URL";
pub const DEFAULT_SESSION_FILE: &str = "~/.config/upwatch/session";

/// Where the uptime API lives.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self { base_url })
    }

    /// Explicit override first, then `UPWATCH_API_URL`, then the local dev address.
    pub fn resolve(override_url: Option<&str>) -> Result<Self> {
        match override_url {
            Some(url) => Self::new(url),
            None => match std::env::var(API_URL_ENV) {
                Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
                _ => Self::new(DEFAULT_API_URL),
            },
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path against the base URL.
    ///
    /// Paths starting with `http` are taken as absolute. Anything else is
    /// appended to the base verbatim, so a base with a path prefix keeps it.
    pub fn resolve_path(&self, path: &str) -> Result<Url> {
        let full = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
        };
        Url::parse(&full).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", full, e)))
    }
}

/// Default location of the persisted session cookie, tilde-expanded.
pub fn default_session_path() -> PathBuf {
    PathBuf::from(shellexpand::tilde(DEFAULT_SESSION_FILE).as_ref())
}
