// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. All SQL lives here.

pub mod counters;
pub mod notifications;
pub mod tokens;
