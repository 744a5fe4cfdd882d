// ABOUTME: Auth backend abstraction for the Stridewell auth core
// ABOUTME: Capability trait over account, session, and change-stream operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! Auth backend capability
//!
//! All backend implementations expose the same six operations through
//! [`AuthBackend`] so the session store never knows which one is active.
//! The concrete backend is chosen once at startup via
//! [`factory::Backend`].

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::errors::AppResult;
use crate::models::{AuthChange, Session};

/// Backend selection and delegation
pub mod factory;

/// In-memory stub backend for development and tests
pub mod memory;

/// HTTP client backend for a GoTrue-style auth service
pub mod rest;

/// Ordered, lossless stream of auth change events
///
/// Backed by an unbounded channel: a live subscriber observes every event in
/// the order the backend produced it. Dropping the receiver unsubscribes.
pub type AuthChangeStream = mpsc::UnboundedReceiver<AuthChange>;

/// Core auth backend trait
///
/// All backend implementations must implement this trait to provide a
/// consistent interface for the session store.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Create a new account and open a session for it
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed, the password is rejected,
    /// the email is already registered, or the backend is unreachable.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> AppResult<Session>;

    /// Authenticate existing credentials
    ///
    /// # Errors
    ///
    /// Returns a uniform invalid-credentials error for a bad email/password
    /// combination; the error does not reveal whether the email exists.
    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Session>;

    /// Invalidate the session identified by `access_token`
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend is unreachable; an unknown token
    /// is not an error.
    async fn invalidate_session(&self, access_token: &str) -> AppResult<()>;

    /// Request an out-of-band password reset flow
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed email or an unreachable backend.
    /// Success does not reveal whether the email is registered.
    async fn request_password_reset(&self, email: &str) -> AppResult<()>;

    /// Query the session active for this client, if any
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend is unreachable. A missing,
    /// expired, or unrecoverable session is `Ok(None)`.
    async fn current_session(&self) -> AppResult<Option<Session>>;

    /// Subscribe to auth change events
    fn subscribe_changes(&self) -> AuthChangeStream;
}

/// Fan-out point for auth change events
///
/// Shared by the backend implementations: every emitted event reaches each
/// live subscriber in emission order. Closed subscribers are pruned on the
/// next emit.
pub(crate) struct ChangeHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AuthChange>>>,
}

impl ChangeHub {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self) -> AuthChangeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    pub(crate) fn emit(&self, change: &AuthChange) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(change.clone()).is_ok());
    }
}

/// Validate an email address shape: non-empty local part and a domain with a
/// dot, the same cheap check the hosted service applies before deeper
/// verification.
pub(crate) fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        _ => false,
    }
}
