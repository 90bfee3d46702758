// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the cliniq queue token service.
//!
//! A thin axum boundary over [`cliniq_queue::QueueService`]: request/response
//! mapping, bearer auth for staff routes, and error-to-status translation.
//! All queue semantics live in the core; nothing here mutates state on its
//! own.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState, ServerConfig};
