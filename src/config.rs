// ABOUTME: Environment-based configuration for the Stridewell auth core
// ABOUTME: Backend selection and auth service credentials from STRIDEWELL_* variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! Configuration
//!
//! Environment-only: the host app sets `STRIDEWELL_*` variables before
//! constructing the backend. No configuration files.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `STRIDEWELL_AUTH_BACKEND` | `memory` (default) or `rest` |
//! | `STRIDEWELL_AUTH_URL` | Auth service base URL (required for `rest`) |
//! | `STRIDEWELL_AUTH_ANON_KEY` | Project API key (required for `rest`) |
//! | `STRIDEWELL_SESSION_FILE` | Token persistence path (optional) |

use std::env;
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

/// Environment variable selecting the backend implementation
pub const ENV_BACKEND: &str = "STRIDEWELL_AUTH_BACKEND";
/// Environment variable with the auth service base URL
pub const ENV_AUTH_URL: &str = "STRIDEWELL_AUTH_URL";
/// Environment variable with the project API key
pub const ENV_ANON_KEY: &str = "STRIDEWELL_AUTH_ANON_KEY";
/// Environment variable overriding the session token file path
pub const ENV_SESSION_FILE: &str = "STRIDEWELL_SESSION_FILE";

/// Which auth backend implementation to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// In-memory stub, for development and tests
    #[default]
    Memory,
    /// HTTP client for the hosted auth service
    Rest,
}

impl BackendKind {
    /// Parse a backend selector
    ///
    /// # Errors
    ///
    /// Returns a configuration error for anything other than `memory` or
    /// `rest`.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rest" => Ok(Self::Rest),
            other => Err(AppError::config(format!(
                "Unknown auth backend '{other}', expected 'memory' or 'rest'"
            ))),
        }
    }
}

/// Auth core configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Selected backend implementation
    pub backend: BackendKind,
    /// Auth service base URL (rest backend only)
    pub base_url: Option<String>,
    /// Project API key (rest backend only)
    pub anon_key: Option<String>,
    /// Where the rest backend persists its token pair; platform data
    /// directory when unset
    pub session_file: Option<PathBuf>,
}

impl AuthConfig {
    /// Configuration for the in-memory backend
    #[must_use]
    pub fn memory() -> Self {
        Self::default()
    }

    /// Configuration for the REST backend
    #[must_use]
    pub fn rest(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Rest,
            base_url: Some(base_url.into()),
            anon_key: Some(anon_key.into()),
            session_file: None,
        }
    }

    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the backend selector is unknown or
    /// the rest backend is selected without a URL and API key.
    pub fn from_env() -> AppResult<Self> {
        let backend = match env::var(ENV_BACKEND) {
            Ok(value) => BackendKind::parse(&value)?,
            Err(_) => BackendKind::default(),
        };

        let config = Self {
            backend,
            base_url: env::var(ENV_AUTH_URL).ok(),
            anon_key: env::var(ENV_ANON_KEY).ok(),
            session_file: env::var(ENV_SESSION_FILE).ok().map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the selected backend has what it needs
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the missing variable.
    pub fn validate(&self) -> AppResult<()> {
        if self.backend == BackendKind::Rest {
            if self.base_url.as_deref().map_or(true, str::is_empty) {
                return Err(AppError::config(format!(
                    "{ENV_AUTH_URL} is required for the rest backend"
                )));
            }
            if self.anon_key.as_deref().map_or(true, str::is_empty) {
                return Err(AppError::config(format!(
                    "{ENV_ANON_KEY} is required for the rest backend"
                )));
            }
        }
        Ok(())
    }
}
