// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue core for the cliniq service.
//!
//! Ties together the token sequencer, the patient-flow state machine, the
//! position recalculator, the offline reconciler, and the read model behind
//! one [`QueueService`]. Transport lives in `cliniq-gateway`; persistence in
//! `cliniq-storage`.

pub mod recalc;
pub mod reconcile;
pub mod sequencer;
pub mod service;
pub mod stats;
pub mod sweep;
pub mod views;

pub use reconcile::{OfflineTokenUpload, SyncConflict, SyncItemError, SyncReport};
pub use service::{CreateTokenRequest, QueueService};
pub use stats::QueueStats;
pub use views::{DisplayFeed, DoctorDisplay, DoctorQueueView};
