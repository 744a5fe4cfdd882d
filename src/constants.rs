// ABOUTME: Application constants for the Stridewell auth core
// ABOUTME: Canonical user-facing messages, validation limits, and timing values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

/// Canonical user-facing error messages
///
/// These mirror the wording of the hosted auth service so the apps render
/// the same copy regardless of which backend is active.
pub mod error_messages {
    /// Uniform rejection for bad email/password combinations. Deliberately
    /// does not reveal whether the email is registered.
    pub const INVALID_CREDENTIALS: &str = "Invalid login credentials";

    /// Duplicate account on sign-up
    pub const USER_ALREADY_EXISTS: &str = "User already registered";

    /// Password below the minimum length
    pub const PASSWORD_TOO_WEAK: &str = "Password should be at least 8 characters";

    /// Malformed email address
    pub const INVALID_EMAIL_FORMAT: &str = "Unable to validate email address: invalid format";
}

/// Validation limits and timing values
pub mod limits {
    /// Minimum accepted password length on account creation
    pub const MIN_PASSWORD_LENGTH: usize = 8;

    /// Lifetime of an access token issued by the in-memory backend
    pub const SESSION_TTL_SECS: i64 = 3600;

    /// How long before expiry the background task refreshes an access token
    pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

    /// HTTP request timeout for the REST backend
    pub const HTTP_TIMEOUT_SECS: u64 = 30;
}

/// Default display name when an identity carries no usable name signal
pub const DEFAULT_DISPLAY_NAME: &str = "User";
