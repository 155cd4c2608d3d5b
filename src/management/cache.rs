use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{error::AuthError, types::TokenCacheEntry};

/// Durable storage for the refresh token.
///
/// `load` never fails: anything that is not a readable, non-empty entry is
/// reported as absence, which sends the caller through the interactive
/// authorization flow.
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn load(&self) -> Option<String>;
    async fn save(&self, refresh_token: &str) -> Result<(), AuthError>;
    async fn clear(&self) -> Result<(), AuthError>;
}

/// JSON file holding a single [`TokenCacheEntry`].
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    /// Cache backed by the file at `path`. Nothing is touched on disk until
    /// the first `save`; missing parent directories are created then.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "token.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenCache for FileTokenCache {
    async fn load(&self) -> Option<String> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cached credential");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token cache unreadable, ignoring it");
                return None;
            }
        };

        match serde_json::from_str::<TokenCacheEntry>(&content) {
            Ok(entry) if !entry.refresh_token.is_empty() => Some(entry.refresh_token),
            Ok(_) => {
                warn!(path = %self.path.display(), "token cache holds an empty token, ignoring it");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "token cache is corrupt, ignoring it");
                None
            }
        }
    }

    /// Writes a temp file next to the cache and renames it into place, so a
    /// crash mid-write leaves either the old or the new entry.
    async fn save(&self, refresh_token: &str) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(AuthError::Cache)?;
        }

        let entry = TokenCacheEntry {
            refresh_token: refresh_token.to_string(),
        };
        let json = serde_json::to_string_pretty(&entry)
            .map_err(|e| AuthError::Cache(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        let tmp = self.temp_path();
        async_fs::write(&tmp, json).await.map_err(AuthError::Cache)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            async_fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(AuthError::Cache)?;
        }

        async_fs::rename(&tmp, &self.path)
            .await
            .map_err(AuthError::Cache)?;
        debug!(path = %self.path.display(), "refresh token cached");
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        match async_fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "token cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Cache(e)),
        }
    }
}
