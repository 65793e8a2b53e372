//! Durable persistence of the session snapshot.
//!
//! One writer (the setup coordinator), many readers (test workers). The
//! write is atomic — a temp file in the destination directory renamed over
//! the target — so no reader ever observes a partial document.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crmv_protocol::StorageState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session file i/o failed: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed session content. Absorbed by the validity checker, which
    /// turns it into a re-login decision; never surfaced past setup.
    #[error("session file is not valid storage-state JSON: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Reads and writes one storage-state file.
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

    /// Creates the parent directory if absent. Safe to call repeatedly.
    pub fn ensure_parent(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Serializes `state` and writes it atomically. Idempotent.
    pub fn save(&self, state: &StorageState) -> StoreResult<()> {
        self.ensure_parent().map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        let json = serde_json::to_string_pretty(state).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        // Rename only works atomically within one filesystem, so the temp
        // file sits next to the destination.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            target = "crmv",
            path = %self.path.display(),
            cookies = state.cookies.len(),
            origins = state.origins.len(),
            "session state saved"
        );
        Ok(())
    }

    /// Loads a previously saved snapshot.
    pub fn load(&self) -> StoreResult<StorageState> {
        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}
