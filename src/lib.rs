// ABOUTME: Main library entry point for the Stridewell auth core
// ABOUTME: Session store, role resolution, and pluggable auth backends for the Stridewell apps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

// Crate-level attributes:
// - deny(unsafe_code): Zero-tolerance unsafe policy. Nothing in this crate
//   needs raw pointers or FFI.
#![deny(unsafe_code)]

//! # Stridewell Auth
//!
//! The session and role core shared by the Stridewell fitness applications.
//! This crate owns "who is logged in": it authenticates against a pluggable
//! auth backend, resolves the coarse user role (client, trainer,
//! nutritionist, admin, hr) that drives role-specific app surfaces, and
//! fans ordered auth-state changes out to subscribers.
//!
//! ## Features
//!
//! - **Session store**: single source of truth for the current identity,
//!   with a loading gate for the initial session restore
//! - **Role resolution**: deterministic Identity -> role mapping with a
//!   display-name derivation
//! - **Pluggable backends**: an in-memory stub for development and tests,
//!   and an HTTP client for a GoTrue-style auth service, selected at startup
//! - **Ordered change delivery**: backend auth events are applied one at a
//!   time, in receipt order, and never dropped for a live subscriber
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use stridewell_auth::backend::factory::Backend;
//! use stridewell_auth::config::AuthConfig;
//! use stridewell_auth::errors::AppResult;
//! use stridewell_auth::session::SessionManager;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = AuthConfig::from_env()?;
//!     let backend = Backend::from_config(&config)?;
//!     let sessions = SessionManager::connect(backend);
//!
//!     sessions.wait_ready().await;
//!     println!("signed in: {}", sessions.snapshot().is_authenticated());
//!
//!     Ok(())
//! }
//! ```

/// Unified error handling system with standard error codes
pub mod errors;

/// Common data models: identities, sessions, tokens, change events
pub mod models;

/// Role resolution from identity attributes
pub mod roles;

/// Auth backend capability with in-memory and HTTP implementations
pub mod backend;

/// Session store: auth state, operations, and change subscriptions
pub mod session;

/// Token persistence for session restore across restarts
pub mod storage;

/// Environment-based configuration
pub mod config;

/// Application constants and canonical messages
pub mod constants;

/// Structured logging setup
pub mod logging;
