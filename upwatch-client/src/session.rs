use crate::error::SessionError;
use reqwest::cookie::{CookieStore, Jar};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Persists the API origin's cookies between runs.
///
/// The file holds a single `Cookie` header line (`name=value; name2=value2`).
/// No session data is interpreted here; the server's cookie is opaque.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seed `jar` with the persisted cookies for `origin`. A missing file is not an error.
    pub fn load_into(&self, jar: &Jar, origin: &Url) -> Result<usize, SessionError> {
        if !self.path.exists() {
            debug!("No session file at {}", self.path.display());
            return Ok(0);
        }

        let content = fs::read_to_string(&self.path)?;
        let mut loaded = 0;
        for pair in content
            .trim()
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            if !pair.contains('=') {
                return Err(SessionError::InvalidHeader(pair.to_string()));
            }
            jar.add_cookie_str(&format!("{}; Path=/", pair), origin);
            loaded += 1;
        }

        debug!("Loaded {} cookie(s) from {}", loaded, self.path.display());
        Ok(loaded)
    }

    /// Write the jar's current cookies for `origin`, or remove the file when there are none.
    pub fn save_from(&self, jar: &Jar, origin: &Url) -> Result<(), SessionError> {
        match jar.cookies(origin) {
            Some(header) => {
                let header = header
                    .to_str()
                    .map_err(|e| SessionError::InvalidHeader(e.to_string()))?;
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&self.path, header)?;
                restrict_permissions(&self.path)?;
                debug!("Saved session to {}", self.path.display());
            }
            None => self.clear()?,
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            debug!("Removed session file {}", self.path.display());
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
