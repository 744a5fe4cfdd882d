// ABOUTME: HTTP auth backend for a GoTrue-style auth service
// ABOUTME: Signup, password and refresh grants, logout, recover, and session restore
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! REST auth backend
//!
//! Client for the hosted auth service the production apps talk to. The wire
//! contract is the GoTrue surface: `signup`, `token` (password and
//! refresh-token grants), `logout`, `recover`, and `user`, all under
//! `/auth/v1/` and authenticated with the project `apikey` header.
//!
//! The backend persists its token pair through [`TokenStorage`] so
//! `current_session` can restore a signed-in state after a relaunch, and it
//! runs a background task that renews the access token shortly before
//! expiry, emitting a token-refreshed change event on success. There is no
//! retry: a failed request surfaces to the caller, a failed refresh signs
//! the session out.

use std::sync::{Arc, Weak};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::backend::{AuthBackend, AuthChangeStream, ChangeHub};
use crate::constants::limits;
use crate::errors::{AppError, AppResult};
use crate::models::{AuthChange, AuthTokens, Identity, Session};
use crate::storage::TokenStorage;

/// REST backend configuration
#[derive(Debug, Clone)]
pub struct RestBackendConfig {
    /// Base URL of the auth service (project URL, no trailing path)
    pub base_url: String,
    /// Project API key sent as the `apikey` header
    pub anon_key: String,
    /// How long before expiry the background task refreshes the access token
    pub refresh_margin_secs: i64,
}

impl RestBackendConfig {
    /// Configuration with the default refresh margin
    #[must_use]
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            refresh_margin_secs: limits::TOKEN_REFRESH_MARGIN_SECS,
        }
    }
}

/// Session payload returned by the signup and token endpoints
#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    refresh_token: String,
    /// Access token lifetime in seconds
    expires_in: i64,
    user: WireUser,
}

/// User record as the auth service serializes it
#[derive(Debug, Deserialize)]
struct WireUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Map<String, Value>,
    created_at: DateTime<Utc>,
}

impl WireUser {
    fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            email: self.email.unwrap_or_default(),
            metadata: self.user_metadata,
            created_at: self.created_at,
        }
    }
}

impl WireSession {
    fn into_session(self) -> Session {
        let expires_at = Utc::now() + Duration::seconds(self.expires_in);
        Session {
            identity: self.user.into_identity(),
            tokens: AuthTokens {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at,
            },
        }
    }
}

struct RestInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    refresh_margin: Duration,
    storage: Arc<dyn TokenStorage>,
    changes: ChangeHub,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

/// HTTP auth backend
///
/// Cheap to clone; clones share the HTTP client, token storage, refresh
/// task, and change subscribers.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<RestInner>,
}

impl RestBackend {
    /// Create a backend against `config.base_url`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unparseable base URL and an
    /// internal error if the HTTP client cannot be constructed.
    pub fn new(config: RestBackendConfig, storage: Arc<dyn TokenStorage>) -> AppResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::config(format!("Invalid auth service URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(limits::HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(RestInner {
                client,
                base_url: base_url.as_str().trim_end_matches('/').to_owned(),
                anon_key: config.anon_key,
                refresh_margin: Duration::seconds(config.refresh_margin_secs.max(0)),
                storage,
                changes: ChangeHub::new(),
                refresh_task: Mutex::new(None),
            }),
        })
    }

    /// Start (or restart) the background refresh task for `tokens`
    fn spawn_refresh_task(&self, mut tokens: AuthTokens) {
        let weak: Weak<RestInner> = Arc::downgrade(&self.inner);
        let margin = self.inner.refresh_margin;

        let handle = tokio::spawn(async move {
            loop {
                let wait_ms = (tokens.expires_at - Utc::now() - margin)
                    .num_milliseconds()
                    .max(0);
                #[allow(clippy::cast_sign_loss)]
                sleep(StdDuration::from_millis(wait_ms as u64)).await;

                let Some(inner) = weak.upgrade() else {
                    return;
                };

                match inner.refresh_session(&tokens.refresh_token).await {
                    Ok(session) => {
                        debug!(user_id = %session.identity.id, "access token refreshed");
                        tokens = session.tokens.clone();
                        inner.changes.emit(&AuthChange::TokenRefreshed(session));
                    }
                    Err(e) => {
                        warn!(error = %e, "token refresh failed, signing out");
                        if let Err(e) = inner.storage.clear() {
                            warn!(error = %e, "failed to clear stored tokens");
                        }
                        inner.changes.emit(&AuthChange::SignedOut);
                        return;
                    }
                }
            }
        });

        if let Some(previous) = self.inner.refresh_task.lock().replace(handle) {
            previous.abort();
        }
    }

    fn stop_refresh_task(&self) {
        if let Some(handle) = self.inner.refresh_task.lock().take() {
            handle.abort();
        }
    }

    /// Adopt a session: persist its tokens and keep them fresh
    fn adopt_session(&self, session: &Session) -> AppResult<()> {
        self.inner.storage.store(&session.tokens)?;
        self.spawn_refresh_task(session.tokens.clone());
        Ok(())
    }
}

impl RestInner {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    /// Map a non-success response to an error, surfacing the backend's own
    /// description verbatim when one is present.
    async fn error_from_response(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body
            .get("error_description")
            .and_then(Value::as_str)
            .or_else(|| body.get("msg").and_then(Value::as_str))
            .or_else(|| body.get("error").and_then(Value::as_str))
            .map_or_else(
                || format!("Auth service returned {status}"),
                str::to_owned,
            );

        match status.as_u16() {
            400 | 401 | 403 => AppError::auth_invalid(message),
            404 => AppError::not_found(message),
            422 => AppError::invalid_input(message),
            _ => AppError::backend(message),
        }
    }

    async fn post_for_session(&self, url: String, body: Value) -> AppResult<Session> {
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::backend(format!("Auth service unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let wire: WireSession = response
            .json()
            .await
            .map_err(|e| AppError::backend(format!("Unexpected auth service response: {e}")))?;
        Ok(wire.into_session())
    }

    /// Exchange a refresh token for a fresh session and persist it
    async fn refresh_session(&self, refresh_token: &str) -> AppResult<Session> {
        let url = self.endpoint("token?grant_type=refresh_token");
        let session = self
            .post_for_session(url, json!({ "refresh_token": refresh_token }))
            .await?;
        self.storage.store(&session.tokens)?;
        Ok(session)
    }

    /// Fetch the user record for an access token
    async fn fetch_identity(&self, access_token: &str) -> AppResult<Identity> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::backend(format!("Auth service unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let wire: WireUser = response
            .json()
            .await
            .map_err(|e| AppError::backend(format!("Unexpected auth service response: {e}")))?;
        Ok(wire.into_identity())
    }
}

#[async_trait]
impl AuthBackend for RestBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Map<String, Value>,
    ) -> AppResult<Session> {
        let url = self.inner.endpoint("signup");
        let session = self
            .inner
            .post_for_session(
                url,
                json!({ "email": email, "password": password, "data": metadata }),
            )
            .await?;

        info!(user_id = %session.identity.id, "account created");
        self.adopt_session(&session)?;
        self.inner.changes.emit(&AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn authenticate(&self, email: &str, password: &str) -> AppResult<Session> {
        let url = self.inner.endpoint("token?grant_type=password");
        let session = self
            .inner
            .post_for_session(url, json!({ "email": email, "password": password }))
            .await?;

        info!(user_id = %session.identity.id, "user authenticated");
        self.adopt_session(&session)?;
        self.inner.changes.emit(&AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    async fn invalidate_session(&self, access_token: &str) -> AppResult<()> {
        let response = self
            .inner
            .client
            .post(self.inner.endpoint("logout"))
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::backend(format!("Auth service unreachable: {e}")))?;

        // 401 means the token is already dead, which is what we wanted.
        if !response.status().is_success() && response.status().as_u16() != 401 {
            return Err(RestInner::error_from_response(response).await);
        }

        self.stop_refresh_task();
        if let Err(e) = self.inner.storage.clear() {
            warn!(error = %e, "failed to clear stored tokens");
        }
        info!("session invalidated");
        self.inner.changes.emit(&AuthChange::SignedOut);
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let response = self
            .inner
            .client
            .post(self.inner.endpoint("recover"))
            .header("apikey", &self.inner.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(|e| AppError::backend(format!("Auth service unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(RestInner::error_from_response(response).await);
        }
        debug!("password reset requested");
        Ok(())
    }

    async fn current_session(&self) -> AppResult<Option<Session>> {
        let Some(tokens) = self.inner.storage.load()? else {
            return Ok(None);
        };

        // Try the stored access token first; fall back to a refresh when it
        // is expired, about to expire, or rejected.
        if !tokens.expires_within(self.inner.refresh_margin) {
            match self.inner.fetch_identity(&tokens.access_token).await {
                Ok(identity) => {
                    let session = Session { identity, tokens };
                    self.spawn_refresh_task(session.tokens.clone());
                    return Ok(Some(session));
                }
                Err(e) if e.is_auth_error() => {
                    debug!("stored access token rejected, attempting refresh");
                }
                Err(e) => return Err(e),
            }
        }

        match self.inner.refresh_session(&tokens.refresh_token).await {
            Ok(session) => {
                self.spawn_refresh_task(session.tokens.clone());
                Ok(Some(session))
            }
            Err(e) if e.is_auth_error() => {
                debug!("stored session unrecoverable, treating as signed out");
                if let Err(e) = self.inner.storage.clear() {
                    warn!(error = %e, "failed to clear stored tokens");
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn subscribe_changes(&self) -> AuthChangeStream {
        self.inner.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn wire_session_parses_auth_service_payload() {
        let payload = serde_json::json!({
            "access_token": "access-abc",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-def",
            "user": {
                "id": "b52f8a82-5f57-4c0a-9c6e-94a9d0a3a7b1",
                "aud": "authenticated",
                "email": "jane@example.com",
                "user_metadata": { "role": "trainer", "full_name": "Jane Doe" },
                "created_at": "2025-03-01T10:00:00Z"
            }
        });

        let wire: WireSession = serde_json::from_value(payload).unwrap();
        let session = wire.into_session();
        assert_eq!(session.identity.email, "jane@example.com");
        assert_eq!(session.identity.metadata_str("role"), Some("trainer"));
        assert_eq!(session.tokens.access_token, "access-abc");
        assert_eq!(session.tokens.refresh_token, "refresh-def");
        assert!(session.tokens.expires_at > Utc::now());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn wire_user_tolerates_missing_email_and_metadata() {
        let payload = serde_json::json!({
            "id": "b52f8a82-5f57-4c0a-9c6e-94a9d0a3a7b1",
            "created_at": "2025-03-01T10:00:00Z"
        });

        let wire: WireUser = serde_json::from_value(payload).unwrap();
        let identity = wire.into_identity();
        assert_eq!(identity.email, "");
        assert!(identity.metadata.is_empty());
    }
}
