// ABOUTME: Auth backend factory and runtime selection
// ABOUTME: Unified Backend enum delegating to the in-memory or REST implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! Backend factory
//!
//! The concrete backend is chosen once at startup from [`AuthConfig`] and
//! wrapped in the [`Backend`] enum, so the session store and everything
//! above it stay implementation-agnostic.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::backend::memory::MemoryBackend;
use crate::backend::rest::{RestBackend, RestBackendConfig};
use crate::backend::{AuthBackend, AuthChangeStream};
use crate::config::{AuthConfig, BackendKind};
use crate::errors::{AppError, AppResult};
use crate::models::Session;
use crate::storage::{FileTokenStorage, TokenStorage};

/// Auth backend wrapper that delegates to the selected implementation
#[derive(Clone)]
pub enum Backend {
    /// In-memory stub instance
    Memory(MemoryBackend),
    /// HTTP client instance
    Rest(RestBackend),
}

impl Backend {
    /// Build the backend selected by `config`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the rest backend is selected with
    /// incomplete settings or no usable token storage location.
    pub fn from_config(config: &AuthConfig) -> AppResult<Self> {
        config.validate()?;
        match config.backend {
            BackendKind::Memory => {
                info!("auth backend: in-memory stub");
                Ok(Self::Memory(MemoryBackend::new()))
            }
            BackendKind::Rest => {
                let base_url = config
                    .base_url
                    .clone()
                    .ok_or_else(|| AppError::config("Auth service URL missing"))?;
                let anon_key = config
                    .anon_key
                    .clone()
                    .ok_or_else(|| AppError::config("Auth service API key missing"))?;

                let storage: Arc<dyn TokenStorage> = match &config.session_file {
                    Some(path) => Arc::new(FileTokenStorage::new(path)),
                    None => Arc::new(FileTokenStorage::in_data_dir()?),
                };

                info!(url = %base_url, "auth backend: rest");
                let rest = RestBackend::new(RestBackendConfig::new(base_url, anon_key), storage)?;
                Ok(Self::Rest(rest))
            }
        }
    }

    /// Get a descriptive string for the current backend
    #[must_use]
    pub const fn backend_info(&self) -> &'static str {
        match self {
            Self::Memory(_) => "In-Memory (Development)",
            Self::Rest(_) => "REST (Hosted Auth Service)",
        }
    }

    /// Which implementation is active
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Memory(_) => BackendKind::Memory,
            Self::Rest(_) => BackendKind::Rest,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("kind", &self.kind())
            .finish()
    }
}

impl From<MemoryBackend> for Backend {
    fn from(backend: MemoryBackend) -> Self {
        Self::Memory(backend)
    }
}

impl From<RestBackend> for Backend {
    fn from(backend: RestBackend) -> Self {
        Self::Rest(backend)
    }
}

#[async_trait]
impl AuthBackend for Backend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Map<String, Value>,
    ) -> AppResult<Session> {
        match self {
            Self::Memory(backend) => backend.create_account(email, password, metadata).await,
            Self::Rest(backend) => backend.create_account(email, password, metadata).await,
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Session> {
        match self {
            Self::Memory(backend) => backend.authenticate(email, password).await,
            Self::Rest(backend) => backend.authenticate(email, password).await,
        }
    }

    async fn invalidate_session(&self, access_token: &str) -> AppResult<()> {
        match self {
            Self::Memory(backend) => backend.invalidate_session(access_token).await,
            Self::Rest(backend) => backend.invalidate_session(access_token).await,
        }
    }

    async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        match self {
            Self::Memory(backend) => backend.request_password_reset(email).await,
            Self::Rest(backend) => backend.request_password_reset(email).await,
        }
    }

    async fn current_session(&self) -> AppResult<Option<Session>> {
        match self {
            Self::Memory(backend) => backend.current_session().await,
            Self::Rest(backend) => backend.current_session().await,
        }
    }

    fn subscribe_changes(&self) -> AuthChangeStream {
        match self {
            Self::Memory(backend) => backend.subscribe_changes(),
            Self::Rest(backend) => backend.subscribe_changes(),
        }
    }
}
