// ABOUTME: Structured logging setup for the Stridewell auth core
// ABOUTME: tracing-subscriber wiring with env-filter support
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Stridewell

use tracing_subscriber::EnvFilter;

/// Initialize structured logging
///
/// Respects `RUST_LOG` when set, defaulting to `info`. Safe to call more
/// than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
