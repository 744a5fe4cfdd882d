// ABOUTME: Unit tests for the in-memory auth backend
// ABOUTME: Validates account creation, authentication, invalidation, and change events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{init_test_logging, profile, unique_email, EVENT_TIMEOUT};
use stridewell_auth::backend::memory::MemoryBackend;
use stridewell_auth::backend::AuthBackend;
use stridewell_auth::errors::ErrorCode;
use stridewell_auth::models::AuthChange;

#[tokio::test]
async fn create_account_then_authenticate_round_trips() {
    init_test_logging();
    let backend = MemoryBackend::new();
    let email = unique_email("member");

    let created = backend
        .create_account(&email, "long-enough-password", profile(&[]))
        .await
        .expect("account creation failed");
    assert_eq!(created.identity.email, email);
    assert_eq!(backend.account_count(), 1);

    let session = backend
        .authenticate(&email, "long-enough-password")
        .await
        .expect("authentication failed");
    assert_eq!(session.identity.id, created.identity.id);
    // A fresh sign-in issues a fresh grant.
    assert_ne!(session.tokens.access_token, created.tokens.access_token);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    init_test_logging();
    let backend = MemoryBackend::new();
    let email = unique_email("member");

    backend
        .create_account(&email, "long-enough-password", profile(&[]))
        .await
        .expect("account creation failed");

    let wrong_password = backend
        .authenticate(&email, "not-the-password")
        .await
        .expect_err("wrong password must be rejected");
    let unknown_email = backend
        .authenticate(&unique_email("ghost"), "whatever-password")
        .await
        .expect_err("unknown email must be rejected");

    assert_eq!(wrong_password.code, ErrorCode::AuthInvalid);
    // Same code, same message: the caller cannot tell whether the email exists.
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    init_test_logging();
    let backend = MemoryBackend::new();
    let email = unique_email("member");

    backend
        .create_account(&email, "long-enough-password", profile(&[]))
        .await
        .expect("first creation failed");

    let err = backend
        .create_account(&email, "another-password-1", profile(&[]))
        .await
        .expect_err("duplicate email must be rejected");
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(err.message, "User already registered");
    assert_eq!(backend.account_count(), 1);
}

#[tokio::test]
async fn weak_password_and_malformed_email_are_rejected() {
    init_test_logging();
    let backend = MemoryBackend::new();

    let err = backend
        .create_account(&unique_email("member"), "short", profile(&[]))
        .await
        .expect_err("weak password must be rejected");
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(err.message, "Password should be at least 8 characters");

    let err = backend
        .create_account("not-an-email", "long-enough-password", profile(&[]))
        .await
        .expect_err("malformed email must be rejected");
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(backend.account_count(), 0);
}

#[tokio::test]
async fn password_reset_does_not_reveal_account_existence() {
    init_test_logging();
    let backend = MemoryBackend::new();
    let email = unique_email("member");

    backend
        .create_account(&email, "long-enough-password", profile(&[]))
        .await
        .expect("account creation failed");

    backend
        .request_password_reset(&email)
        .await
        .expect("reset for existing account failed");
    backend
        .request_password_reset(&unique_email("ghost"))
        .await
        .expect("reset for unknown account must look identical");

    let err = backend
        .request_password_reset("not-an-email")
        .await
        .expect_err("malformed email must be rejected");
    assert_eq!(err.code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn invalidate_session_clears_current_and_is_idempotent() {
    init_test_logging();
    let backend = MemoryBackend::new();
    let email = unique_email("member");

    let session = backend
        .create_account(&email, "long-enough-password", profile(&[]))
        .await
        .expect("account creation failed");
    assert!(backend
        .current_session()
        .await
        .expect("current_session failed")
        .is_some());

    backend
        .invalidate_session(&session.tokens.access_token)
        .await
        .expect("invalidation failed");
    assert!(backend
        .current_session()
        .await
        .expect("current_session failed")
        .is_none());

    // Unknown token: nothing to do, still success.
    backend
        .invalidate_session(&session.tokens.access_token)
        .await
        .expect("repeat invalidation must succeed");
}

#[tokio::test]
async fn change_events_arrive_in_operation_order() {
    init_test_logging();
    let backend = MemoryBackend::new();
    let mut changes = backend.subscribe_changes();

    let first = unique_email("one");
    let second = unique_email("two");

    backend
        .create_account(&first, "long-enough-password", profile(&[]))
        .await
        .expect("first account failed");
    let session = backend
        .create_account(&second, "long-enough-password", profile(&[]))
        .await
        .expect("second account failed");
    backend
        .invalidate_session(&session.tokens.access_token)
        .await
        .expect("invalidation failed");

    let mut events = Vec::new();
    for _ in 0..3 {
        let event = tokio::time::timeout(EVENT_TIMEOUT, changes.recv())
            .await
            .expect("timed out waiting for change event")
            .expect("change stream closed");
        events.push(event);
    }

    match (&events[0], &events[1], &events[2]) {
        (
            AuthChange::SignedIn(first_session),
            AuthChange::SignedIn(second_session),
            AuthChange::SignedOut,
        ) => {
            assert_eq!(first_session.identity.email, first);
            assert_eq!(second_session.identity.email, second);
        }
        other => panic!("unexpected event order: {other:?}"),
    }
}
