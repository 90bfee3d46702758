// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait boundaries between the queue core and its external collaborators.

pub mod notify;

pub use notify::NotifierAdapter;
