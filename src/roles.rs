// ABOUTME: Role resolution from identity attributes
// ABOUTME: UserRole enum, email-marker heuristics, and display-name derivation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! Role resolution
//!
//! Maps an [`Identity`] to exactly one [`UserRole`] from the closed set the
//! apps understand. Resolution is a pure function of the identity and is
//! recomputed on every identity change: roles are never stored
//! independently.
//!
//! Priority order, first match wins:
//! 1. an explicit `role` metadata attribute,
//! 2. substring markers in the lowercased email address,
//! 3. the `client` default.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::DEFAULT_DISPLAY_NAME;
use crate::models::Identity;

/// Coarse role classification driving role-specific app surfaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular member working with a trainer or nutritionist
    #[default]
    Client,
    /// Coach managing client programs
    Trainer,
    /// Nutrition specialist managing meal plans
    Nutritionist,
    /// Application administrator
    Admin,
    /// Human-resources staff for corporate wellness accounts
    Hr,
}

impl UserRole {
    /// Stable string form, matching the serialized representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Trainer => "trainer",
            Self::Nutritionist => "nutritionist",
            Self::Admin => "admin",
            Self::Hr => "hr",
        }
    }

    /// Parse a role string, falling back to [`UserRole::Client`] for
    /// anything outside the closed set
    #[must_use]
    pub fn from_str_lossy(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "trainer" => Self::Trainer,
            "nutritionist" => Self::Nutritionist,
            "admin" => Self::Admin,
            "hr" => Self::Hr,
            _ => Self::Client,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the role for an identity
///
/// An explicit `role` metadata attribute always wins, regardless of email
/// content. Otherwise the lowercased email address is scanned for markers;
/// with no match the role defaults to `client`.
#[must_use]
pub fn resolve_role(identity: &Identity) -> UserRole {
    if let Some(explicit) = identity.metadata_str("role") {
        return UserRole::from_str_lossy(explicit);
    }

    let email = identity.email.to_lowercase();
    if email.contains("trainer") || email.contains("coach") {
        UserRole::Trainer
    } else if email.contains("nutritionist") || email.contains("nutrition") {
        UserRole::Nutritionist
    } else if email.contains("admin") {
        UserRole::Admin
    } else if email.contains("hr") {
        UserRole::Hr
    } else {
        UserRole::Client
    }
}

/// Derive the display name for an identity
///
/// Prefers the metadata full name, then first name, then the email local
/// part, then the literal `"User"`.
#[must_use]
pub fn display_name(identity: &Identity) -> String {
    identity
        .metadata_str("full_name")
        .or_else(|| identity.metadata_str("first_name"))
        .filter(|name| !name.trim().is_empty())
        .or_else(|| identity.email_local_part())
        .map_or_else(|| DEFAULT_DISPLAY_NAME.to_owned(), str::to_owned)
}

/// Resolved role and display name for the current identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleProfile {
    /// Resolved role
    pub role: UserRole,
    /// Resolved display name
    pub display_name: String,
}

impl RoleProfile {
    /// Resolve the profile for an optional identity
    ///
    /// An absent identity resolves to `client`/"User". Keeping the signed-out
    /// role at `client` rather than introducing a "none" state matches the
    /// shipped app behavior; navigation is expected to redirect before the
    /// default is ever shown.
    #[must_use]
    pub fn resolve(identity: Option<&Identity>) -> Self {
        identity.map_or_else(Self::default, |identity| Self {
            role: resolve_role(identity),
            display_name: display_name(identity),
        })
    }
}

impl Default for RoleProfile {
    fn default() -> Self {
        Self {
            role: UserRole::Client,
            display_name: DEFAULT_DISPLAY_NAME.to_owned(),
        }
    }
}
