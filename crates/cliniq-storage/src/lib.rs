// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the cliniq queue token service.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for tokens,
//! allocation counters, and the append-only notification log.
//!
//! The one place where per-row atomicity is not enough -- allocating the next
//! token number and inserting the token -- runs as a single transaction in
//! [`queries::tokens::allocate_and_insert`].

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
