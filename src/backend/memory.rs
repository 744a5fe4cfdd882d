// ABOUTME: In-memory auth backend for development and tests
// ABOUTME: Account and session maps with bcrypt hashing and broadcast change events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! In-memory stub backend
//!
//! Keeps accounts and sessions in process memory. Behavior mirrors the
//! hosted service closely enough that the apps cannot tell the difference:
//! the same validation rules, the same uniform invalid-credentials error,
//! and the same ordered change events. State is lost on process exit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::RwLock;
use rand::Rng;
use tokio::task;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{is_valid_email, AuthBackend, AuthChangeStream, ChangeHub};
use crate::constants::{error_messages, limits};
use crate::errors::{AppError, AppResult};
use crate::models::{AuthChange, AuthTokens, Identity, Session};

/// Registered account
#[derive(Debug, Clone)]
struct StoredAccount {
    id: Uuid,
    email: String,
    password_hash: String,
    metadata: serde_json::Map<String, serde_json::Value>,
    created_at: chrono::DateTime<Utc>,
}

impl StoredAccount {
    fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }
}

struct Inner {
    /// Accounts keyed by lowercased email
    accounts: RwLock<HashMap<String, StoredAccount>>,
    /// Open sessions keyed by access token
    sessions: RwLock<HashMap<String, Session>>,
    /// The session most recently opened through this backend handle
    current: RwLock<Option<Session>>,
    changes: ChangeHub,
}

/// In-memory auth backend
///
/// Cheap to clone; clones share the same account and session state, so a
/// second handle behaves like another device talking to the same backend.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                accounts: RwLock::new(HashMap::new()),
                sessions: RwLock::new(HashMap::new()),
                current: RwLock::new(None),
                changes: ChangeHub::new(),
            }),
        }
    }

    /// Number of registered accounts
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.inner.accounts.read().len()
    }

    fn issue_session(&self, identity: Identity) -> Session {
        let mut token_bytes = [0u8; 32];
        rand::thread_rng().fill(&mut token_bytes);
        let mut refresh_bytes = [0u8; 32];
        rand::thread_rng().fill(&mut refresh_bytes);

        let session = Session {
            identity,
            tokens: AuthTokens {
                access_token: hex::encode(token_bytes),
                refresh_token: hex::encode(refresh_bytes),
                expires_at: Utc::now() + Duration::seconds(limits::SESSION_TTL_SECS),
            },
        };

        self.inner
            .sessions
            .write()
            .insert(session.tokens.access_token.clone(), session.clone());
        *self.inner.current.write() = Some(session.clone());
        session
    }

    async fn hash_password(password: &str) -> AppResult<String> {
        let password = password.to_owned();
        task::spawn_blocking(move || bcrypt::hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
    }

    async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        task::spawn_blocking(move || bcrypt::verify(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> AppResult<Session> {
        if !is_valid_email(email) {
            return Err(AppError::invalid_input(error_messages::INVALID_EMAIL_FORMAT));
        }
        if password.len() < limits::MIN_PASSWORD_LENGTH {
            return Err(AppError::invalid_input(error_messages::PASSWORD_TOO_WEAK));
        }

        let password_hash = Self::hash_password(password).await?;
        let key = email.to_lowercase();

        let identity = {
            let mut accounts = self.inner.accounts.write();
            if accounts.contains_key(&key) {
                return Err(AppError::invalid_input(error_messages::USER_ALREADY_EXISTS));
            }

            let account = StoredAccount {
                id: Uuid::new_v4(),
                email: email.to_owned(),
                password_hash,
                metadata,
                created_at: Utc::now(),
            };
            let identity = account.identity();
            accounts.insert(key, account);
            identity
        };

        info!(user_id = %identity.id, "account created");

        let session = self.issue_session(identity);
        self.inner.changes.emit(&AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Session> {
        let key = email.to_lowercase();
        let account = self.inner.accounts.read().get(&key).cloned();

        let Some(account) = account else {
            debug!("authentication attempt for unknown email");
            return Err(AppError::auth_invalid(error_messages::INVALID_CREDENTIALS));
        };

        if !Self::verify_password(password, &account.password_hash).await? {
            debug!(user_id = %account.id, "authentication attempt with wrong password");
            return Err(AppError::auth_invalid(error_messages::INVALID_CREDENTIALS));
        }

        info!(user_id = %account.id, "user authenticated");

        let session = self.issue_session(account.identity());
        self.inner.changes.emit(&AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn invalidate_session(&self, access_token: &str) -> AppResult<()> {
        let removed = self.inner.sessions.write().remove(access_token);

        let mut current = self.inner.current.write();
        let was_current = current
            .as_ref()
            .is_some_and(|session| session.tokens.access_token == access_token);
        if was_current {
            *current = None;
        }
        drop(current);

        if let Some(session) = removed {
            info!(user_id = %session.identity.id, "session invalidated");
            self.inner.changes.emit(&AuthChange::SignedOut);
        } else {
            debug!("invalidate for unknown token, nothing to do");
        }
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        if !is_valid_email(email) {
            return Err(AppError::invalid_input(error_messages::INVALID_EMAIL_FORMAT));
        }

        // Whether the account exists stays internal; callers always see the
        // same success.
        let known = self.inner.accounts.read().contains_key(&email.to_lowercase());
        debug!(known_account = known, "password reset requested");
        Ok(())
    }

    async fn current_session(&self) -> AppResult<Option<Session>> {
        let current = self.inner.current.read().clone();
        match current {
            Some(session) if session.tokens.expires_within(Duration::zero()) => {
                debug!("stored session expired, treating as signed out");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn subscribe_changes(&self) -> AuthChangeStream {
        self.inner.changes.subscribe()
    }
}
