// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification gateway trait.
//!
//! The queue core treats patient outreach as an external collaborator: calls
//! are fire-and-forget with a short timeout, and a failed send never rolls
//! back the state transition that triggered it.

use async_trait::async_trait;

use crate::error::CliniqError;
use crate::types::{NotificationChannel, NotificationType, NotifyPayload};

/// Adapter for outbound patient notifications (SMS/WhatsApp/app push).
#[async_trait]
pub trait NotifierAdapter: Send + Sync {
    /// Short identifier for logs ("webhook", "memory", ...).
    fn name(&self) -> &str;

    /// The channel this adapter delivers on, recorded in the notification log.
    fn channel(&self) -> NotificationChannel;

    /// Deliver one notification to a patient phone number.
    ///
    /// Implementations must bound their own latency (the core assumes a
    /// ~5 second ceiling) and return `CliniqError::Notify` on failure.
    async fn notify(
        &self,
        phone: &str,
        event: NotificationType,
        payload: &NotifyPayload,
    ) -> Result<(), CliniqError>;
}
