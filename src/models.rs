// ABOUTME: Common data models for the Stridewell auth core
// ABOUTME: Identity, token pair, session, and auth change event types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! Core data models
//!
//! [`Identity`] is the backend-issued user record; the session store only
//! ever holds a transient cached copy. [`Session`] pairs an identity with
//! its opaque token grant and exists only while authenticated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Backend-issued user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identifier assigned by the backend
    pub id: Uuid,
    /// Email address the account was registered with
    pub email: String,
    /// Arbitrary key-value attributes attached at sign-up (may include an
    /// explicit `role`, `full_name`, or `first_name`)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Look up a string-valued metadata attribute
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }

    /// The part of the email before the `@`, if non-empty
    #[must_use]
    pub fn email_local_part(&self) -> Option<&str> {
        self.email.split('@').next().filter(|s| !s.is_empty())
    }
}

/// Opaque access/refresh token pair issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    /// Bearer token presented on authenticated requests
    pub access_token: String,
    /// Token used to obtain a fresh access token
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl AuthTokens {
    /// Whether the access token expires within `margin` from now
    #[must_use]
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at <= Utc::now() + margin
    }
}

/// Active authentication grant tied to an identity
///
/// Created on successful sign-up or sign-in, destroyed on sign-out or token
/// invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The authenticated user
    pub identity: Identity,
    /// The token grant backing this session
    pub tokens: AuthTokens,
}

/// Backend-pushed auth state change
///
/// Covers sign-in from anywhere (including other devices against the same
/// backend), token refresh, and sign-out. Delivered to each subscriber in
/// the order the backend produced them.
#[derive(Debug, Clone)]
pub enum AuthChange {
    /// A session became active
    SignedIn(Session),
    /// The active session's tokens were renewed
    TokenRefreshed(Session),
    /// The active session was invalidated
    SignedOut,
}

impl AuthChange {
    /// The session carried by this change, if any
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(session) | Self::TokenRefreshed(session) => Some(session),
            Self::SignedOut => None,
        }
    }

    /// Short event name for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SignedIn(_) => "signed_in",
            Self::TokenRefreshed(_) => "token_refreshed",
            Self::SignedOut => "signed_out",
        }
    }
}
