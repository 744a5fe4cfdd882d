// ABOUTME: Token persistence for session restore across process restarts
// ABOUTME: TokenStorage capability with in-memory and JSON-file implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! Token storage
//!
//! The REST backend persists its token pair so a relaunched app can restore
//! the session without re-entering credentials. Absent or unreadable stored
//! tokens are never an error: the user is simply signed out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::models::AuthTokens;

/// Persistence capability for the active token pair
pub trait TokenStorage: Send + Sync {
    /// Load the stored token pair, if any
    ///
    /// # Errors
    ///
    /// Returns an error only for I/O failures other than a missing entry.
    /// Corrupt contents are logged and treated as absent.
    fn load(&self) -> AppResult<Option<AuthTokens>>;

    /// Persist the token pair, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns an error if the tokens cannot be written.
    fn store(&self, tokens: &AuthTokens) -> AppResult<()>;

    /// Remove the stored token pair, if any
    ///
    /// # Errors
    ///
    /// Returns an error if an existing entry cannot be removed.
    fn clear(&self) -> AppResult<()>;
}

/// Volatile storage, for tests and ephemeral processes
#[derive(Default)]
pub struct MemoryTokenStorage {
    tokens: Mutex<Option<AuthTokens>>,
}

impl MemoryTokenStorage {
    /// Create empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage wrapped for sharing with a backend
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> AppResult<Option<AuthTokens>> {
        Ok(self.tokens.lock().clone())
    }

    fn store(&self, tokens: &AuthTokens) -> AppResult<()> {
        *self.tokens.lock() = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        *self.tokens.lock() = None;
        Ok(())
    }
}

/// JSON-file storage with restrictive permissions
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    /// Use an explicit file path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Use the platform data directory (`<data_dir>/stridewell/session.json`)
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    pub fn in_data_dir() -> AppResult<Self> {
        let base = dirs::data_dir()
            .ok_or_else(|| AppError::config("No platform data directory available"))?;
        Ok(Self::new(base.join("stridewell").join("session.json")))
    }

    /// The file this storage reads and writes
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn restrict_permissions(path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
    }

    #[cfg(not(unix))]
    fn restrict_permissions(_path: &Path) -> io::Result<()> {
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> AppResult<Option<AuthTokens>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::internal(format!(
                    "Failed to read session file: {e}"
                )))
            }
        };

        match serde_json::from_str::<AuthTokens>(&contents) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file unreadable, treating as signed out");
                Ok(None)
            }
        }
    }

    fn store(&self, tokens: &AuthTokens) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::internal(format!("Failed to create session directory: {e}"))
            })?;
        }

        let contents = serde_json::to_string(tokens)
            .map_err(|e| AppError::internal(format!("Failed to encode session tokens: {e}")))?;
        fs::write(&self.path, contents)
            .map_err(|e| AppError::internal(format!("Failed to write session file: {e}")))?;

        if let Err(e) = Self::restrict_permissions(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not restrict session file permissions");
        }

        debug!(path = %self.path.display(), "session tokens persisted");
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::internal(format!(
                "Failed to remove session file: {e}"
            ))),
        }
    }
}
