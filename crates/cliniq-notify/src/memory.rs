// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory notifier for tests and for running without a relay configured.

use async_trait::async_trait;
use cliniq_core::types::{NotificationChannel, NotificationType, NotifyPayload};
use cliniq_core::{CliniqError, NotifierAdapter};
use tokio::sync::Mutex;

/// One captured notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub phone: String,
    pub event: NotificationType,
    pub payload: NotifyPayload,
}

/// Notifier that records every send instead of delivering it.
///
/// With `failing` set, every send returns `CliniqError::Notify` after
/// recording -- for asserting that notification failure never rolls back a
/// transition.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SentNotification>>,
    failing: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose sends always fail (after recording).
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    /// Everything sent so far, in order.
    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotifierAdapter for MemoryNotifier {
    fn name(&self) -> &str {
        "memory"
    }

    fn channel(&self) -> NotificationChannel {
        NotificationChannel::App
    }

    async fn notify(
        &self,
        phone: &str,
        event: NotificationType,
        payload: &NotifyPayload,
    ) -> Result<(), CliniqError> {
        self.sent.lock().await.push(SentNotification {
            phone: phone.to_string(),
            event,
            payload: payload.clone(),
        });
        if self.failing {
            return Err(CliniqError::Notify("memory notifier set to fail".into()));
        }
        Ok(())
    }
}
