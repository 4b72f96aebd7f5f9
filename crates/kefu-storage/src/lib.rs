// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Kefu message relay.
//!
//! Provides [`SqliteStore`], which implements the message store, user store
//! and directory traits from `kefu-core` over a single tokio-rusqlite
//! connection with WAL mode and embedded refinery migrations.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
