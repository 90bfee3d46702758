// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end queue flow tests against a real (temporary) SQLite database:
//! token issuance, call-next, skip/recall, offline reconciliation, the
//! notification sweep, and daily stats.

use std::sync::Arc;

use chrono::Utc;
use cliniq_config::model::QueueConfig;
use cliniq_core::types::{NotificationType, Priority, TokenAction, TokenStatus};
use cliniq_core::CliniqError;
use cliniq_notify::MemoryNotifier;
use cliniq_queue::{CreateTokenRequest, OfflineTokenUpload, QueueService};
use cliniq_storage::queries::notifications;
use cliniq_storage::Database;
use tempfile::TempDir;

async fn setup() -> (Arc<QueueService>, Arc<MemoryNotifier>, TempDir) {
    setup_with_notifier(MemoryNotifier::new()).await
}

async fn setup_with_notifier(
    notifier: MemoryNotifier,
) -> (Arc<QueueService>, Arc<MemoryNotifier>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("queue.db").to_str().unwrap())
        .await
        .unwrap();
    let notifier = Arc::new(notifier);
    let service = Arc::new(QueueService::new(
        db,
        notifier.clone(),
        QueueConfig::default(),
    ));
    (service, notifier, dir)
}

fn create_req(phone: &str, name: &str) -> CreateTokenRequest {
    CreateTokenRequest {
        clinic_id: "clinic-1".to_string(),
        doctor_id: "doc-1".to_string(),
        patient_id: None,
        patient_name: name.to_string(),
        patient_phone: phone.to_string(),
        booking_type: None,
        appointment_id: None,
        token_prefix: None,
        priority: None,
        notes: None,
    }
}

fn upload(phone: &str, name: &str, minutes_ago: i64) -> OfflineTokenUpload {
    OfflineTokenUpload {
        clinic_id: "clinic-1".to_string(),
        doctor_id: "doc-1".to_string(),
        patient_id: None,
        patient_name: name.to_string(),
        patient_phone: phone.to_string(),
        booking_type: None,
        token_prefix: None,
        priority: None,
        notes: None,
        local_created_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
        local_token_number: Some(99),
    }
}

#[tokio::test]
async fn walk_in_day_scenario() {
    let (service, _notifier, _dir) = setup().await;

    // Three walk-ins get contiguous tokens with positions 1..3 and wait
    // estimates at the default 10-minute rate.
    let t1 = service.create_token(create_req("9990001111", "P1")).await.unwrap();
    let t2 = service.create_token(create_req("9990002222", "P2")).await.unwrap();
    let t3 = service.create_token(create_req("9990003333", "P3")).await.unwrap();

    assert_eq!(t1.display_token, "A-001");
    assert_eq!(t2.display_token, "A-002");
    assert_eq!(t3.display_token, "A-003");
    for (t, pos) in [(&t1, 1), (&t2, 2), (&t3, 3)] {
        assert_eq!(t.status, TokenStatus::Waiting);
        assert_eq!(t.queue_position, Some(pos));
        assert_eq!(t.estimated_wait_minutes, Some(pos * 10));
    }

    // Call next: A-001 becomes called, the rest shuffle up.
    let called = service.call_next("clinic-1", "doc-1").await.unwrap().unwrap();
    assert_eq!(called.display_token, "A-001");
    assert_eq!(called.status, TokenStatus::Called);

    let queue = service.get_queue("clinic-1", "doc-1").await.unwrap();
    assert_eq!(
        queue.current_token.as_ref().map(|t| t.display_token.as_str()),
        Some("A-001")
    );
    let positions: Vec<(String, Option<i64>)> = queue
        .waiting_queue
        .iter()
        .map(|t| (t.display_token.clone(), t.queue_position))
        .collect();
    assert_eq!(
        positions,
        vec![("A-002".to_string(), Some(1)), ("A-003".to_string(), Some(2))]
    );

    // A-001 steps out: skip, then recall puts them back at the front with
    // raised priority.
    let skipped = service.transition(&called.id, TokenAction::Skip).await.unwrap();
    assert_eq!(skipped.status, TokenStatus::Skipped);

    let recalled = service.transition(&called.id, TokenAction::Recall).await.unwrap();
    assert_eq!(recalled.status, TokenStatus::Waiting);
    assert_eq!(recalled.priority, Priority::Priority);
    assert_eq!(recalled.queue_position, Some(1));

    let queue = service.get_queue("clinic-1", "doc-1").await.unwrap();
    let order: Vec<&str> = queue
        .waiting_queue
        .iter()
        .map(|t| t.display_token.as_str())
        .collect();
    assert_eq!(order, ["A-001", "A-002", "A-003"]);
}

#[tokio::test]
async fn call_next_on_empty_queue_returns_none() {
    let (service, _notifier, _dir) = setup().await;
    let result = service.call_next("clinic-1", "doc-1").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn concurrent_call_next_never_double_calls() {
    let (service, _notifier, _dir) = setup().await;
    service.create_token(create_req("9990001111", "P1")).await.unwrap();
    service.create_token(create_req("9990002222", "P2")).await.unwrap();

    let a = {
        let service = service.clone();
        tokio::spawn(async move { service.call_next("clinic-1", "doc-1").await })
    };
    let b = {
        let service = service.clone();
        tokio::spawn(async move { service.call_next("clinic-1", "doc-1").await })
    };

    let first = a.await.unwrap().unwrap().unwrap();
    let second = b.await.unwrap().unwrap().unwrap();
    assert_ne!(first.id, second.id, "two call-next calls picked the same token");

    let picked: Vec<String> = vec![first.display_token, second.display_token];
    assert!(picked.contains(&"A-001".to_string()));
    assert!(picked.contains(&"A-002".to_string()));
}

#[tokio::test]
async fn full_consultation_records_duration_and_stats() {
    let (service, _notifier, _dir) = setup().await;
    service.create_token(create_req("9990001111", "P1")).await.unwrap();
    service.create_token(create_req("9990002222", "P2")).await.unwrap();

    let called = service.call_next("clinic-1", "doc-1").await.unwrap().unwrap();
    let started = service.transition(&called.id, TokenAction::Start).await.unwrap();
    assert_eq!(started.status, TokenStatus::InConsultation);
    assert!(started.consultation_started_at.is_some());

    let done = service.transition(&called.id, TokenAction::Complete).await.unwrap();
    assert_eq!(done.status, TokenStatus::Completed);
    assert!(done.consultation_ended_at.is_some());
    assert_eq!(done.consultation_minutes, Some(0)); // sub-minute consultation

    let stats = service.get_stats("clinic-1", None).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.avg_consultation_minutes, 0);
}

#[tokio::test]
async fn illegal_transitions_report_the_current_state() {
    let (service, _notifier, _dir) = setup().await;
    let token = service.create_token(create_req("9990001111", "P1")).await.unwrap();

    // start is only legal from `called`.
    let err = service.transition(&token.id, TokenAction::Start).await.unwrap_err();
    assert!(matches!(
        err,
        CliniqError::InvalidTransition {
            from: TokenStatus::Waiting,
            action: TokenAction::Start,
        }
    ));

    // Unknown token id.
    let err = service.transition("no-such-id", TokenAction::Skip).await.unwrap_err();
    assert!(matches!(err, CliniqError::NotFound(_)));
}

#[tokio::test]
async fn completed_token_is_frozen() {
    let (service, _notifier, _dir) = setup().await;
    let token = service.create_token(create_req("9990001111", "P1")).await.unwrap();
    service.call_next("clinic-1", "doc-1").await.unwrap().unwrap();
    service.transition(&token.id, TokenAction::Start).await.unwrap();
    service.transition(&token.id, TokenAction::Complete).await.unwrap();

    for action in [TokenAction::Recall, TokenAction::Skip, TokenAction::Cancel] {
        let err = service.transition(&token.id, action).await.unwrap_err();
        assert!(
            matches!(
                err,
                CliniqError::InvalidTransition {
                    from: TokenStatus::Completed,
                    ..
                }
            ),
            "completed token accepted {action}"
        );
    }
}

#[tokio::test]
async fn offline_item_conflicts_with_online_token() {
    let (service, _notifier, _dir) = setup().await;

    // Reception creates a token online; the same patient also got one on a
    // disconnected tablet.
    let online = service.create_token(create_req("9990001111", "P1")).await.unwrap();

    let report = service
        .sync_offline_batch(vec![upload("9990001111", "P1", 30)], "tablet-7")
        .await
        .unwrap();

    assert!(report.synced.is_empty());
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.errors.is_empty());
    assert_eq!(report.conflicts[0].existing_token.id, online.id);
    assert!(report.conflicts[0].resolution.contains("A-001"));

    // The conflicting item was not admitted: still exactly one token today.
    let stats = service.get_stats("clinic-1", None).await.unwrap();
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn duplicate_items_within_one_batch_conflict() {
    let (service, _notifier, _dir) = setup().await;

    let report = service
        .sync_offline_batch(
            vec![upload("9990001111", "P1", 40), upload("9990001111", "P1", 20)],
            "tablet-7",
        )
        .await
        .unwrap();

    assert_eq!(report.synced.len(), 1);
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn replaying_a_batch_is_idempotent() {
    let (service, _notifier, _dir) = setup().await;
    let batch = vec![
        upload("9990001111", "P1", 40),
        upload("9990002222", "P2", 35),
    ];

    let first = service.sync_offline_batch(batch.clone(), "tablet-7").await.unwrap();
    assert_eq!(first.synced.len(), 2);
    assert!(first.conflicts.is_empty());

    let replay = service.sync_offline_batch(batch, "tablet-7").await.unwrap();
    assert_eq!(replay.synced.len(), 2, "replay must report the same items synced");
    assert!(replay.conflicts.is_empty());
    assert!(replay.errors.is_empty());

    // Same server-side tokens, no duplicates.
    let mut first_ids: Vec<String> = first.synced.iter().map(|t| t.id.clone()).collect();
    let mut replay_ids: Vec<String> = replay.synced.iter().map(|t| t.id.clone()).collect();
    first_ids.sort();
    replay_ids.sort();
    assert_eq!(first_ids, replay_ids);

    let stats = service.get_stats("clinic-1", None).await.unwrap();
    assert_eq!(stats.total, 2);
}

#[tokio::test]
async fn one_bad_item_never_blocks_the_batch() {
    let (service, _notifier, _dir) = setup().await;

    let batch = vec![upload("", "No Phone", 10), upload("9990002222", "P2", 5)];

    let report = service.sync_offline_batch(batch, "tablet-7").await.unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.synced.len(), 1);
    assert!(report.errors[0].error.contains("patient_phone"));
    assert_eq!(report.synced[0].patient_phone, "9990002222");
}

#[tokio::test]
async fn sync_requires_a_device_id() {
    let (service, _notifier, _dir) = setup().await;
    let err = service
        .sync_offline_batch(vec![upload("9990001111", "P1", 10)], "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, CliniqError::Validation(_)));
}

#[tokio::test]
async fn offline_tokens_get_server_numbers_and_provenance() {
    let (service, _notifier, _dir) = setup().await;

    let report = service
        .sync_offline_batch(vec![upload("9990001111", "P1", 25)], "tablet-7")
        .await
        .unwrap();
    let token = &report.synced[0];

    // The device claimed number 99; the server re-derived 1.
    assert_eq!(token.token_number, 1);
    assert_eq!(token.display_token, "A-001");
    assert!(token.offline.created_offline);
    assert_eq!(token.offline.device_id.as_deref(), Some("tablet-7"));
    assert!(token.offline.synced_at.is_some());
    assert_eq!(token.status, TokenStatus::Waiting);
    assert_eq!(token.queue_position, Some(1));
}

#[tokio::test]
async fn notification_failure_never_rolls_back_a_transition() {
    let (service, notifier, _dir) = setup_with_notifier(MemoryNotifier::failing()).await;

    let token = service.create_token(create_req("9990001111", "P1")).await.unwrap();
    let called = service.call_next("clinic-1", "doc-1").await.unwrap().unwrap();
    assert_eq!(called.status, TokenStatus::Called);

    // Both sends were attempted and both failed; the log records them.
    let sent = notifier.sent().await;
    assert_eq!(sent.len(), 2);
    let log = notifications::list_for_token(service.database(), &token.id)
        .await
        .unwrap();
    assert_eq!(log.len(), 2);
    assert!(log
        .iter()
        .all(|e| e.status == cliniq_core::types::NotificationStatus::Failed));
}

#[tokio::test]
async fn transitions_emit_the_documented_notifications() {
    let (service, notifier, _dir) = setup().await;

    let token = service.create_token(create_req("9990001111", "P1")).await.unwrap();
    service.call_next("clinic-1", "doc-1").await.unwrap().unwrap();
    service.transition(&token.id, TokenAction::Skip).await.unwrap();

    let events: Vec<NotificationType> = notifier.sent().await.iter().map(|s| s.event).collect();
    assert_eq!(
        events,
        vec![
            NotificationType::TokenIssued,
            NotificationType::YourTurnNow,
            NotificationType::Skipped,
        ]
    );
}

#[tokio::test]
async fn cancelling_a_waiting_token_notifies_and_frees_the_queue() {
    let (service, notifier, _dir) = setup().await;
    let token = service.create_token(create_req("9990001111", "P1")).await.unwrap();
    let t2 = service.create_token(create_req("9990002222", "P2")).await.unwrap();
    assert_eq!(t2.queue_position, Some(2));

    let cancelled = service.transition(&token.id, TokenAction::Cancel).await.unwrap();
    assert_eq!(cancelled.status, TokenStatus::Cancelled);

    let queue = service.get_queue("clinic-1", "doc-1").await.unwrap();
    assert_eq!(queue.total_waiting, 1);
    assert_eq!(queue.waiting_queue[0].queue_position, Some(1));

    let events: Vec<NotificationType> = notifier.sent().await.iter().map(|s| s.event).collect();
    assert!(events.contains(&NotificationType::Cancelled));
}

#[tokio::test]
async fn sweep_alerts_top_positions_once_per_window() {
    let (service, notifier, _dir) = setup().await;
    for i in 1..=5 {
        service
            .create_token(create_req(&format!("900000111{i}"), &format!("P{i}")))
            .await
            .unwrap();
    }

    // Default config: top 3 positions, 30-minute window.
    let attempted = service.run_notification_sweep().await.unwrap();
    assert_eq!(attempted, 3);

    // Immediate re-run: everyone is inside the window.
    let attempted = service.run_notification_sweep().await.unwrap();
    assert_eq!(attempted, 0);

    let soon_alerts = notifier
        .sent()
        .await
        .iter()
        .filter(|s| s.event == NotificationType::YourTurnSoon)
        .count();
    assert_eq!(soon_alerts, 3);
}

#[tokio::test]
async fn tokens_by_phone_returns_only_active_tokens() {
    let (service, _notifier, _dir) = setup().await;
    let token = service.create_token(create_req("9990001111", "P1")).await.unwrap();

    let found = service.tokens_by_phone("9990001111").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, token.id);

    service.transition(&token.id, TokenAction::Cancel).await.unwrap();
    let found = service.tokens_by_phone("9990001111").await.unwrap();
    assert!(found.is_empty());

    assert!(service.tokens_by_phone("  ").await.is_err());
}

#[tokio::test]
async fn display_feed_covers_all_doctors() {
    let (service, _notifier, _dir) = setup().await;
    service.create_token(create_req("9990001111", "P1")).await.unwrap();
    let mut other = create_req("9990002222", "P2");
    other.doctor_id = "doc-2".to_string();
    service.create_token(other).await.unwrap();
    service.call_next("clinic-1", "doc-1").await.unwrap().unwrap();

    let feed = service.get_display_feed("clinic-1").await.unwrap();
    assert_eq!(feed.clinic_id, "clinic-1");
    assert_eq!(feed.queues.len(), 2);

    let doc1 = feed.queues.iter().find(|q| q.doctor_id == "doc-1").unwrap();
    assert_eq!(doc1.current_token.as_deref(), Some("A-001"));
    assert!(doc1.waiting_tokens.is_empty());

    let doc2 = feed.queues.iter().find(|q| q.doctor_id == "doc-2").unwrap();
    assert!(doc2.current_token.is_none());
    assert_eq!(doc2.waiting_tokens, vec!["A-001"]);
}

#[tokio::test]
async fn emergency_priority_jumps_the_queue() {
    let (service, _notifier, _dir) = setup().await;
    service.create_token(create_req("9990001111", "P1")).await.unwrap();
    service.create_token(create_req("9990002222", "P2")).await.unwrap();

    let mut emergency = create_req("9990003333", "P3");
    emergency.priority = Some(Priority::Emergency);
    let token = service.create_token(emergency).await.unwrap();
    assert_eq!(token.queue_position, Some(1), "emergency goes to the front");

    let called = service.call_next("clinic-1", "doc-1").await.unwrap().unwrap();
    assert_eq!(called.id, token.id);
}
