// SPDX-FileCopyrightText: 2026 Cliniq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue token state machine.
//!
//! Pure functions over [`Token`]: they mutate the in-memory value and report
//! what happened, but never touch storage or the notification gateway. The
//! caller persists the result and acts on the returned [`TransitionOutcome`].
//!
//! Legal transitions:
//!
//! ```text
//! waiting ----------> called ------> in_consultation ------> completed
//!    |  \              |  \
//!    |   \             |   +-------> no_show
//!    |    +--------+   |
//!    v             v   v
//! cancelled       skipped ---------> waiting   (priority raised)
//! ```

use chrono::{DateTime, Utc};

use crate::error::CliniqError;
use crate::types::{NotificationType, Priority, Token, TokenAction, TokenStatus};

/// What a transition did, so the orchestrator knows which side effects to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: TokenStatus,
    pub to: TokenStatus,
    /// Outreach to send for this transition, if any. Best-effort only.
    pub notification: Option<NotificationType>,
    /// Whether the waiting set for this doctor/day gained or lost a member,
    /// which requires a position recalculation.
    pub waiting_set_changed: bool,
}

/// Flip a waiting token to `called`. This is the `CallNext` half of the state
/// machine; the caller is responsible for having selected the next eligible
/// token and for the compare-and-swap on persist.
pub fn mark_called(token: &mut Token, now: DateTime<Utc>) -> Result<TransitionOutcome, CliniqError> {
    if token.status != TokenStatus::Waiting {
        return Err(CliniqError::Internal(format!(
            "call-next selected token {} in state {}",
            token.id, token.status
        )));
    }
    token.status = TokenStatus::Called;
    token.called_at = Some(now);
    clear_derived(token);
    Ok(TransitionOutcome {
        from: TokenStatus::Waiting,
        to: TokenStatus::Called,
        notification: Some(NotificationType::YourTurnNow),
        waiting_set_changed: true,
    })
}

/// Apply a reception/doctor action to a token.
///
/// Returns `InvalidTransition` (carrying the current state) for anything not
/// in the transition table. Timestamps are taken from `now` so the function
/// stays deterministic under test.
pub fn apply_action(
    token: &mut Token,
    action: TokenAction,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, CliniqError> {
    let from = token.status;
    let outcome = match (from, action) {
        (TokenStatus::Called, TokenAction::Start) => {
            token.status = TokenStatus::InConsultation;
            token.consultation_started_at = Some(now);
            TransitionOutcome {
                from,
                to: TokenStatus::InConsultation,
                notification: None,
                waiting_set_changed: false,
            }
        }
        (TokenStatus::InConsultation, TokenAction::Complete) => {
            token.status = TokenStatus::Completed;
            token.consultation_ended_at = Some(now);
            token.consultation_minutes = token
                .consultation_started_at
                .map(|started| round_minutes(started, now));
            TransitionOutcome {
                from,
                to: TokenStatus::Completed,
                notification: None,
                waiting_set_changed: false,
            }
        }
        (TokenStatus::Called, TokenAction::NoShow) => {
            token.status = TokenStatus::NoShow;
            TransitionOutcome {
                from,
                to: TokenStatus::NoShow,
                notification: None,
                waiting_set_changed: false,
            }
        }
        (TokenStatus::Waiting | TokenStatus::Called, TokenAction::Skip) => {
            token.status = TokenStatus::Skipped;
            clear_derived(token);
            TransitionOutcome {
                from,
                to: TokenStatus::Skipped,
                notification: Some(NotificationType::Skipped),
                // Only a skip out of `waiting` shrinks the waiting set.
                waiting_set_changed: from == TokenStatus::Waiting,
            }
        }
        (TokenStatus::Skipped, TokenAction::Recall) => {
            token.status = TokenStatus::Waiting;
            // Recalled patients go ahead of later-arriving normal patients
            // but never lose an already-higher tier.
            if token.priority.rank() < Priority::Priority.rank() {
                token.priority = Priority::Priority;
            }
            TransitionOutcome {
                from,
                to: TokenStatus::Waiting,
                notification: None,
                waiting_set_changed: true,
            }
        }
        (TokenStatus::Waiting, TokenAction::Cancel) => {
            token.status = TokenStatus::Cancelled;
            clear_derived(token);
            TransitionOutcome {
                from,
                to: TokenStatus::Cancelled,
                notification: Some(NotificationType::Cancelled),
                waiting_set_changed: true,
            }
        }
        _ => return Err(CliniqError::InvalidTransition { from, action }),
    };
    Ok(outcome)
}

/// Position and ETA are undefined outside `waiting`.
fn clear_derived(token: &mut Token) {
    token.queue_position = None;
    token.estimated_wait_minutes = None;
}

/// Whole-minute consultation duration, rounded to nearest.
fn round_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let secs = (end - start).num_seconds();
    (secs as f64 / 60.0).round() as i64
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::types::{format_display_token, BookingType, OfflineSync, SyncStatus};

    fn ts(hms: (u32, u32, u32)) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, hms.0, hms.1, hms.2).unwrap()
    }

    fn token_in(status: TokenStatus) -> Token {
        let now = ts((9, 0, 0));
        Token {
            id: "tok-1".into(),
            clinic_id: "clinic-1".into(),
            doctor_id: "doc-1".into(),
            token_date: now.date_naive(),
            token_prefix: "A".into(),
            token_number: 1,
            display_token: format_display_token("A", 1),
            patient_id: None,
            patient_name: "Asha Rao".into(),
            patient_phone: "9990001111".into(),
            booking_type: BookingType::WalkIn,
            appointment_id: None,
            status,
            priority: Priority::Normal,
            queue_position: Some(1),
            estimated_wait_minutes: Some(10),
            issued_at: now,
            called_at: None,
            consultation_started_at: None,
            consultation_ended_at: None,
            consultation_minutes: None,
            notes: None,
            offline: OfflineSync::online(now),
        }
    }

    #[test]
    fn call_next_flips_waiting_to_called() {
        let mut token = token_in(TokenStatus::Waiting);
        let outcome = mark_called(&mut token, ts((9, 5, 0))).unwrap();
        assert_eq!(token.status, TokenStatus::Called);
        assert_eq!(token.called_at, Some(ts((9, 5, 0))));
        assert_eq!(token.queue_position, None);
        assert_eq!(outcome.notification, Some(NotificationType::YourTurnNow));
        assert!(outcome.waiting_set_changed);
    }

    #[test]
    fn start_records_consultation_start() {
        let mut token = token_in(TokenStatus::Called);
        let outcome = apply_action(&mut token, TokenAction::Start, ts((9, 10, 0))).unwrap();
        assert_eq!(token.status, TokenStatus::InConsultation);
        assert_eq!(token.consultation_started_at, Some(ts((9, 10, 0))));
        assert!(!outcome.waiting_set_changed);
        assert!(outcome.notification.is_none());
    }

    #[test]
    fn complete_computes_rounded_duration() {
        let mut token = token_in(TokenStatus::Called);
        apply_action(&mut token, TokenAction::Start, ts((9, 10, 0))).unwrap();
        // 12m40s rounds to 13 minutes.
        apply_action(&mut token, TokenAction::Complete, ts((9, 22, 40))).unwrap();
        assert_eq!(token.status, TokenStatus::Completed);
        assert_eq!(token.consultation_minutes, Some(13));
    }

    #[test]
    fn complete_without_recorded_start_leaves_duration_unset() {
        // A token can reach in_consultation through reconciled offline state
        // where the start timestamp was never captured.
        let mut token = token_in(TokenStatus::InConsultation);
        apply_action(&mut token, TokenAction::Complete, ts((10, 0, 0))).unwrap();
        assert_eq!(token.consultation_minutes, None);
    }

    #[test]
    fn no_show_only_from_called() {
        let mut token = token_in(TokenStatus::Called);
        let outcome = apply_action(&mut token, TokenAction::NoShow, ts((9, 20, 0))).unwrap();
        assert_eq!(outcome.to, TokenStatus::NoShow);

        let mut waiting = token_in(TokenStatus::Waiting);
        let err = apply_action(&mut waiting, TokenAction::NoShow, ts((9, 20, 0))).unwrap_err();
        assert!(matches!(
            err,
            CliniqError::InvalidTransition {
                from: TokenStatus::Waiting,
                action: TokenAction::NoShow,
            }
        ));
    }

    #[test]
    fn skip_from_waiting_shrinks_waiting_set() {
        let mut token = token_in(TokenStatus::Waiting);
        let outcome = apply_action(&mut token, TokenAction::Skip, ts((9, 15, 0))).unwrap();
        assert_eq!(token.status, TokenStatus::Skipped);
        assert!(outcome.waiting_set_changed);
        assert_eq!(outcome.notification, Some(NotificationType::Skipped));
    }

    #[test]
    fn skip_from_called_does_not_touch_waiting_set() {
        let mut token = token_in(TokenStatus::Called);
        let outcome = apply_action(&mut token, TokenAction::Skip, ts((9, 15, 0))).unwrap();
        assert_eq!(token.status, TokenStatus::Skipped);
        assert!(!outcome.waiting_set_changed);
    }

    #[test]
    fn recall_raises_priority_one_tier() {
        let mut token = token_in(TokenStatus::Skipped);
        let outcome = apply_action(&mut token, TokenAction::Recall, ts((9, 30, 0))).unwrap();
        assert_eq!(token.status, TokenStatus::Waiting);
        assert_eq!(token.priority, Priority::Priority);
        assert!(outcome.waiting_set_changed);
    }

    #[test]
    fn recall_never_demotes_an_emergency() {
        let mut token = token_in(TokenStatus::Skipped);
        token.priority = Priority::Emergency;
        apply_action(&mut token, TokenAction::Recall, ts((9, 30, 0))).unwrap();
        assert_eq!(token.priority, Priority::Emergency);
    }

    #[test]
    fn cancel_only_from_waiting() {
        let mut token = token_in(TokenStatus::Waiting);
        let outcome = apply_action(&mut token, TokenAction::Cancel, ts((9, 5, 0))).unwrap();
        assert_eq!(outcome.to, TokenStatus::Cancelled);
        assert_eq!(outcome.notification, Some(NotificationType::Cancelled));

        let mut called = token_in(TokenStatus::Called);
        assert!(apply_action(&mut called, TokenAction::Cancel, ts((9, 5, 0))).is_err());
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for status in [
            TokenStatus::Completed,
            TokenStatus::Cancelled,
            TokenStatus::NoShow,
        ] {
            for action in TokenAction::iter() {
                let mut token = token_in(status);
                let result = apply_action(&mut token, action, ts((12, 0, 0)));
                assert!(
                    matches!(result, Err(CliniqError::InvalidTransition { .. })),
                    "{status} must reject {action}"
                );
                assert_eq!(token.status, status, "token must be left untouched");
            }
        }
    }

    #[test]
    fn exhaustive_legality_table() {
        // Every (state, action) pair outside the documented table is rejected.
        let legal: &[(TokenStatus, TokenAction)] = &[
            (TokenStatus::Called, TokenAction::Start),
            (TokenStatus::InConsultation, TokenAction::Complete),
            (TokenStatus::Called, TokenAction::NoShow),
            (TokenStatus::Waiting, TokenAction::Skip),
            (TokenStatus::Called, TokenAction::Skip),
            (TokenStatus::Skipped, TokenAction::Recall),
            (TokenStatus::Waiting, TokenAction::Cancel),
        ];
        for status in TokenStatus::iter() {
            for action in TokenAction::iter() {
                let mut token = token_in(status);
                let result = apply_action(&mut token, action, ts((12, 0, 0)));
                if legal.contains(&(status, action)) {
                    assert!(result.is_ok(), "{status} + {action} should be legal");
                } else {
                    assert!(result.is_err(), "{status} + {action} should be rejected");
                }
            }
        }
    }

    #[test]
    fn reconciled_provenance_is_marked_synced() {
        let offline = OfflineSync::reconciled(
            "tablet-7".into(),
            ts((8, 40, 0)),
            ts((9, 0, 0)),
        );
        assert!(offline.created_offline);
        assert_eq!(offline.sync_status, SyncStatus::Synced);
        assert_eq!(offline.device_id.as_deref(), Some("tablet-7"));
    }
}
