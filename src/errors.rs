// ABOUTME: Unified error handling system for the Stridewell auth core
// ABOUTME: Standard error codes, AppError type, and named constructors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

//! Unified error handling
//!
//! Every fallible operation in this crate resolves to an [`AppResult`]. No
//! error is fatal to the session store: a failed operation returns the error
//! to the caller and leaves the store's state untouched.

use serde::{Deserialize, Serialize};

/// Convenience alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// Standard error codes for classifying failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Credentials were rejected or a token is invalid/expired
    AuthInvalid,
    /// Input failed validation (malformed email, weak password, duplicate account)
    InvalidInput,
    /// A referenced resource does not exist
    ResourceNotFound,
    /// The auth backend could not be reached or returned a server error
    BackendUnavailable,
    /// Configuration is missing or inconsistent
    ConfigInvalid,
    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    /// Stable string form of the code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthInvalid => "auth_invalid",
            Self::InvalidInput => "invalid_input",
            Self::ResourceNotFound => "resource_not_found",
            Self::BackendUnavailable => "backend_unavailable",
            Self::ConfigInvalid => "config_invalid",
            Self::InternalError => "internal_error",
        }
    }
}

/// Application error with a standard code and a human-readable message
///
/// Backend-defined failure descriptions (invalid credentials, duplicate
/// account, weak password) are carried verbatim in `message` for display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    /// Classification of the failure
    pub code: ErrorCode,
    /// Human-readable description, safe to surface to the user
    pub message: String,
}

impl AppError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Rejected credentials or invalid/expired token
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Input validation failure
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Missing resource
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound, message)
    }

    /// Backend unreachable or failing
    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BackendUnavailable, message)
    }

    /// Configuration problem
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Unexpected internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Whether this error represents rejected credentials
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self.code, ErrorCode::AuthInvalid)
    }
}
