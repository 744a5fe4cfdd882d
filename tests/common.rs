// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides logging init, unique emails, and session manager helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs, dead_code)]

//! Shared test utilities for `stridewell_auth`
//!
//! Common setup to reduce duplication across integration tests.

use std::sync::Once;
use std::time::Duration;

use serde_json::Value;
use stridewell_auth::backend::factory::Backend;
use stridewell_auth::backend::memory::MemoryBackend;
use stridewell_auth::session::{AuthSnapshot, SessionManager, Subscription};
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// How long tests wait for an async state transition before failing
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(stridewell_auth::logging::init_logging);
}

/// Unique email that triggers no role markers (hex digits only after the
/// prefix, so "coach"/"admin"/"hr"/"nutrition" cannot appear by accident)
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}_{}@example.com", Uuid::new_v4().simple())
}

/// Build profile metadata from string pairs
pub fn profile(entries: &[(&str, &str)]) -> serde_json::Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_owned(), Value::String((*value).to_owned())))
        .collect()
}

/// A session manager on a fresh in-memory backend, plus a second backend
/// handle that behaves like another device talking to the same service
pub fn memory_manager() -> (SessionManager, MemoryBackend) {
    init_test_logging();
    let backend = MemoryBackend::new();
    let manager = SessionManager::connect(Backend::from(backend.clone()));
    (manager, backend)
}

/// Like [`memory_manager`], but with the initial session restore resolved
pub async fn ready_manager() -> (SessionManager, MemoryBackend) {
    let (manager, backend) = memory_manager();
    manager.wait_ready().await;
    (manager, backend)
}

/// Receive the next snapshot or fail the test
pub async fn recv_snapshot(subscription: &mut Subscription) -> AuthSnapshot {
    tokio::time::timeout(EVENT_TIMEOUT, subscription.recv())
        .await
        .expect("timed out waiting for auth snapshot")
        .expect("subscription closed unexpectedly")
}

/// Wait until the store's state satisfies `predicate` or fail the test
pub async fn wait_for_state<F>(manager: &SessionManager, predicate: F) -> AuthSnapshot
where
    F: Fn(&AuthSnapshot) -> bool,
{
    let mut subscription = manager.subscribe();
    loop {
        let snapshot = recv_snapshot(&mut subscription).await;
        if predicate(&snapshot) {
            return snapshot;
        }
    }
}
