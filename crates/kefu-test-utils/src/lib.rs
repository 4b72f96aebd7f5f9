// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Kefu integration tests.
//!
//! Provides mock adapters and a test harness for fast, deterministic tests
//! without external services.
//!
//! # Components
//!
//! - [`TestHarness`] - temp SQLite store seeded with one assigned mini-app
//! - [`MockPushProvider`] - scripted push provider that records every send
//! - [`RecordingDispatch`] - push dispatcher that only records jobs

pub mod harness;
pub mod mock_dispatch;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_dispatch::RecordingDispatch;
pub use mock_provider::MockPushProvider;
