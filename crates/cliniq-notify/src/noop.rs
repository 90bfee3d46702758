// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! No-op notifier used when no relay endpoint is configured.

use async_trait::async_trait;
use cliniq_core::types::{NotificationChannel, NotificationType, NotifyPayload};
use cliniq_core::{CliniqError, NotifierAdapter};
use tracing::debug;

/// Notifier that logs each event at debug level and drops it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl NotifierAdapter for NoopNotifier {
    fn name(&self) -> &str {
        "noop"
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
        debug!(phone, %event, token = %payload.display_token, "notification dropped (no relay configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_always_succeeds() {
        let notifier = NoopNotifier;
        let payload = NotifyPayload {
            display_token: "A-001".to_string(),
            patient_name: "Asha Rao".to_string(),
            queue_position: Some(1),
            estimated_wait_minutes: Some(10),
        };
        notifier
            .notify("9990001111", NotificationType::TokenIssued, &payload)
            .await
            .unwrap();
    }
}
