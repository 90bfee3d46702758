// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP webhook notifier.
//!
//! Posts each notification to a configured relay endpoint (an SMS/WhatsApp
//! bridge in production). The request timeout bounds every send; the queue
//! core treats the call as best-effort and logs failures without retrying.

use std::time::Duration;

use async_trait::async_trait;
use cliniq_core::types::{NotificationChannel, NotificationType, NotifyPayload};
use cliniq_core::{CliniqError, NotifierAdapter};
use serde::Serialize;
use tracing::debug;

/// Wire shape posted to the relay.
#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    phone: &'a str,
    event: NotificationType,
    payload: &'a NotifyPayload,
}

/// Notifier that delivers via an HTTP relay endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Build a notifier for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, CliniqError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CliniqError::Config(format!("failed to build webhook client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotifierAdapter for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Sms
    }

    async fn notify(
        &self,
        phone: &str,
        event: NotificationType,
        payload: &NotifyPayload,
    ) -> Result<(), CliniqError> {
        let body = WebhookBody {
            phone,
            event,
            payload,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CliniqError::Notify(format!("webhook send failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CliniqError::Notify(format!(
                "webhook relay returned {}",
                response.status()
            )));
        }
        debug!(phone, %event, "notification relayed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn payload() -> NotifyPayload {
        NotifyPayload {
            display_token: "A-003".to_string(),
            patient_name: "Asha Rao".to_string(),
            queue_position: Some(3),
            estimated_wait_minutes: Some(30),
        }
    }

    #[tokio::test]
    async fn posts_event_and_payload_to_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notify"))
            .and(body_partial_json(serde_json::json!({
                "phone": "9990001111",
                "event": "token_issued",
                "payload": { "display_token": "A-003", "queue_position": 3 }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/notify", server.uri()), 5).unwrap();
        notifier
            .notify("9990001111", NotificationType::TokenIssued, &payload())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_a_notify_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/notify", server.uri()), 5).unwrap();
        let err = notifier
            .notify("9990001111", NotificationType::YourTurnNow, &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, CliniqError::Notify(msg) if msg.contains("502")));
    }

    #[tokio::test]
    async fn unreachable_relay_is_a_notify_error() {
        // Nothing listens on this port.
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/notify", 1).unwrap();
        let err = notifier
            .notify("9990001111", NotificationType::Skipped, &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, CliniqError::Notify(_)));
    }
}
