// ABOUTME: Unit tests for token storage implementations
// ABOUTME: Validates round trips, missing/corrupt files, and clearing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chrono::{Duration, Utc};
use stridewell_auth::models::AuthTokens;
use stridewell_auth::storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};

fn tokens() -> AuthTokens {
    AuthTokens {
        access_token: "access-abc".to_owned(),
        refresh_token: "refresh-def".to_owned(),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

#[test]
fn memory_storage_round_trips_and_clears() {
    let storage = MemoryTokenStorage::new();
    assert!(storage.load().expect("load failed").is_none());

    let stored = tokens();
    storage.store(&stored).expect("store failed");
    assert_eq!(storage.load().expect("load failed"), Some(stored));

    storage.clear().expect("clear failed");
    assert!(storage.load().expect("load failed").is_none());
}

#[test]
fn file_storage_round_trips_and_clears() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let storage = FileTokenStorage::new(dir.path().join("session.json"));

    assert!(storage.load().expect("load failed").is_none());

    let stored = tokens();
    storage.store(&stored).expect("store failed");
    assert_eq!(storage.load().expect("load failed"), Some(stored));

    storage.clear().expect("clear failed");
    assert!(storage.load().expect("load failed").is_none());
    // Clearing an already-clear store is fine.
    storage.clear().expect("repeat clear failed");
}

#[test]
fn file_storage_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let storage = FileTokenStorage::new(dir.path().join("nested").join("deep").join("session.json"));

    storage.store(&tokens()).expect("store failed");
    assert!(storage.load().expect("load failed").is_some());
}

#[test]
fn corrupt_session_file_reads_as_signed_out() {
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{ not json").expect("write failed");

    let storage = FileTokenStorage::new(&path);
    assert!(storage.load().expect("load failed").is_none());
}

#[cfg(unix)]
#[test]
fn session_file_is_not_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir failed");
    let storage = FileTokenStorage::new(dir.path().join("session.json"));
    storage.store(&tokens()).expect("store failed");

    let mode = std::fs::metadata(storage.path())
        .expect("metadata failed")
        .permissions()
        .mode();
    assert_eq!(mode & 0o077, 0, "session file must be owner-only");
}
