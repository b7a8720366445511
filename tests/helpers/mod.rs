// ABOUTME: Test helper modules shared across integration tests
// ABOUTME: Currently just the Axum oneshot request helper
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

pub mod axum_test;
