// ABOUTME: Unit tests for environment-based configuration
// ABOUTME: Validates backend selection, required variables, and factory wiring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use serial_test::serial;
use stridewell_auth::backend::factory::Backend;
use stridewell_auth::config::{
    AuthConfig, BackendKind, ENV_ANON_KEY, ENV_AUTH_URL, ENV_BACKEND, ENV_SESSION_FILE,
};
use stridewell_auth::errors::ErrorCode;

fn clear_auth_env() {
    env::remove_var(ENV_BACKEND);
    env::remove_var(ENV_AUTH_URL);
    env::remove_var(ENV_ANON_KEY);
    env::remove_var(ENV_SESSION_FILE);
}

#[test]
#[serial]
fn defaults_to_memory_backend() {
    clear_auth_env();
    let config = AuthConfig::from_env().expect("from_env failed");
    assert_eq!(config.backend, BackendKind::Memory);

    let backend = Backend::from_config(&config).expect("factory failed");
    assert_eq!(backend.kind(), BackendKind::Memory);
    assert_eq!(backend.backend_info(), "In-Memory (Development)");
}

#[test]
#[serial]
fn rest_backend_requires_url_and_key() {
    clear_auth_env();
    env::set_var(ENV_BACKEND, "rest");

    let err = AuthConfig::from_env().expect_err("missing URL must fail");
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    env::set_var(ENV_AUTH_URL, "https://auth.stridewell.test");
    let err = AuthConfig::from_env().expect_err("missing key must fail");
    assert_eq!(err.code, ErrorCode::ConfigInvalid);

    env::set_var(ENV_ANON_KEY, "test-anon-key");
    env::set_var(ENV_SESSION_FILE, "/tmp/stridewell-test-session.json");
    let config = AuthConfig::from_env().expect("complete rest config must parse");
    assert_eq!(config.backend, BackendKind::Rest);

    let backend = Backend::from_config(&config).expect("factory failed");
    assert_eq!(backend.kind(), BackendKind::Rest);

    clear_auth_env();
}

#[test]
#[serial]
fn unknown_backend_selector_is_rejected() {
    clear_auth_env();
    env::set_var(ENV_BACKEND, "carrier-pigeon");

    let err = AuthConfig::from_env().expect_err("unknown backend must fail");
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
    assert!(err.message.contains("carrier-pigeon"));

    clear_auth_env();
}

#[test]
#[serial]
fn rest_config_rejects_malformed_url() {
    clear_auth_env();
    let config = AuthConfig::rest("not a url", "test-anon-key");
    let err = Backend::from_config(&config).expect_err("malformed URL must fail");
    assert_eq!(err.code, ErrorCode::ConfigInvalid);
}

#[test]
fn programmatic_constructors_validate() {
    assert!(AuthConfig::memory().validate().is_ok());
    assert!(AuthConfig::rest("https://auth.stridewell.test", "key")
        .validate()
        .is_ok());

    let mut incomplete = AuthConfig::rest("https://auth.stridewell.test", "key");
    incomplete.anon_key = None;
    assert!(incomplete.validate().is_err());
}
