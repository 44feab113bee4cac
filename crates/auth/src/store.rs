//! Durable token storage (one named entry, survives restarts).

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::AccessToken;

const APP_DIR: &str = "classroom-portal";
const TOKEN_FILE: &str = "access_token";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no data directory available for the token store; set an explicit token file")]
    NoDataDir,
}

/// Key/value slot holding the current access token.
pub trait TokenStore {
    fn load(&self) -> Result<Option<AccessToken>, StoreError>;

    fn save(&mut self, token: &AccessToken) -> Result<(), StoreError>;

    /// Remove the stored token. Removing an empty slot succeeds.
    fn remove(&mut self) -> Result<(), StoreError>;
}

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    token: Option<AccessToken>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<AccessToken>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn get(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AccessToken>, StoreError> {
        Ok(self.token.clone())
    }

    fn save(&mut self, token: &AccessToken) -> Result<(), StoreError> {
        self.token = Some(token.clone());
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StoreError> {
        self.token = None;
        Ok(())
    }
}

/// Single-file store, the desktop counterpart of browser local storage.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data dir>/classroom-portal/access_token`.
    pub fn in_data_dir() -> Result<Self, StoreError> {
        Ok(Self::new(default_token_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

// The file holds the token verbatim; only a missing file means "no token".
impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AccessToken>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(AccessToken::new(contents))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn save(&mut self, token: &AccessToken) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, token.as_str()).map_err(|e| self.io_error(e))?;
        restrict_permissions(&self.path).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = ?self.path, "persisted access token");
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = ?self.path, "removed persisted access token");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

/// Default token location inside the OS data directory.
pub fn default_token_path() -> Result<PathBuf, StoreError> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or(StoreError::NoDataDir)?;

    Ok(base.join(APP_DIR).join(TOKEN_FILE))
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
