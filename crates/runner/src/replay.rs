// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay validation: reconstruct a task's status history from
//! `STATUS_CHANGED` events alone.

use oj_core::{Event, EventType, Status};

/// Outcome of replaying one task's `STATUS_CHANGED` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayResult {
    Valid {
        final_status: Status,
        transition_count: usize,
    },
    Invalid(ReplayFailure),
}

impl ReplayResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// A single-token summary plus details (`REASON` or
    /// `REASON:{json details}`) for embedding in a dead-letter message.
    pub fn describe(&self) -> String {
        match self {
            Self::Valid { .. } => "VALID".to_string(),
            Self::Invalid(failure) => failure.describe(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayFailure {
    NoStatusEvents,
    InvalidBootstrap {
        from: String,
    },
    InvalidTransition {
        from: String,
        to: String,
        index: usize,
    },
}

impl ReplayFailure {
    fn describe(&self) -> String {
        match self {
            Self::NoStatusEvents => "NO_STATUS_EVENTS".to_string(),
            Self::InvalidBootstrap { from } => {
                format!("INVALID_BOOTSTRAP:{{\"from\":\"{from}\"}}")
            }
            Self::InvalidTransition { from, to, index } => {
                format!("INVALID_TRANSITION:{{\"from\":\"{from}\",\"index\":{index},\"to\":\"{to}\"}}")
            }
        }
    }
}

/// Extract `(old_status, new_status)` string pairs from `STATUS_CHANGED`
/// events, in file order. Non-string fields are skipped rather than
/// treated as errors.
fn status_pairs(events: &[Event]) -> Vec<(String, String)> {
    events
        .iter()
        .filter(|e| e.event_type == EventType::StatusChanged)
        .filter_map(|e| {
            let old = e.payload.get("old_status")?.as_str()?.to_string();
            let new = e.payload.get("new_status")?.as_str()?.to_string();
            Some((old, new))
        })
        .collect()
}

/// Validate one task's lifecycle from its `STATUS_CHANGED` events.
pub fn validate_task_lifecycle(events_for_task: &[Event]) -> ReplayResult {
    let transitions = status_pairs(events_for_task);

    let Some((first_from, _)) = transitions.first() else {
        return ReplayResult::Invalid(ReplayFailure::NoStatusEvents);
    };

    if first_from != "QUEUED" {
        return ReplayResult::Invalid(ReplayFailure::InvalidBootstrap {
            from: first_from.clone(),
        });
    }

    let mut current = first_from.clone();
    for (index, (from, to)) in transitions.iter().enumerate() {
        let current_status = Status::parse(&current);
        let is_terminal = current_status.is_some_and(Status::is_terminal);
        if is_terminal || from != &current {
            return ReplayResult::Invalid(ReplayFailure::InvalidTransition {
                from: current,
                to: to.clone(),
                index,
            });
        }
        let allowed = match current_status {
            Some(status) => status.allowed_next(),
            None => {
                return ReplayResult::Invalid(ReplayFailure::InvalidTransition {
                    from: current,
                    to: to.clone(),
                    index,
                })
            }
        };
        if !allowed.iter().any(|s| s.to_string() == *to) {
            return ReplayResult::Invalid(ReplayFailure::InvalidTransition {
                from: current,
                to: to.clone(),
                index,
            });
        }
        current = to.clone();
    }

    match Status::parse(&current) {
        Some(final_status) => ReplayResult::Valid {
            final_status,
            transition_count: transitions.len(),
        },
        None => ReplayResult::Invalid(ReplayFailure::InvalidTransition {
            from: current.clone(),
            to: current,
            index: transitions.len().saturating_sub(1),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_core::{RunId, TaskId};

    fn status_changed(from: &str, to: &str) -> Event {
        Event::new(
            RunId::new(),
            EventType::StatusChanged,
            Some(TaskId::new("t1")),
            chrono::Utc::now(),
            serde_json::json!({"old_status": from, "new_status": to}),
        )
    }

    #[test]
    fn happy_path_is_valid() {
        let events = vec![
            status_changed("QUEUED", "EVALUATING"),
            status_changed("EVALUATING", "COMPLETED"),
        ];
        let result = validate_task_lifecycle(&events);
        assert_eq!(
            result,
            ReplayResult::Valid {
                final_status: Status::Completed,
                transition_count: 2,
            }
        );
    }

    #[test]
    fn empty_events_is_no_status_events() {
        assert_eq!(
            validate_task_lifecycle(&[]),
            ReplayResult::Invalid(ReplayFailure::NoStatusEvents)
        );
    }

    #[test]
    fn bad_bootstrap_is_invalid_bootstrap() {
        let events = vec![status_changed("EVALUATING", "FAILED")];
        assert_eq!(
            validate_task_lifecycle(&events),
            ReplayResult::Invalid(ReplayFailure::InvalidBootstrap {
                from: "EVALUATING".to_string(),
            })
        );
    }

    #[test]
    fn illegal_jump_is_invalid_transition() {
        let events = vec![status_changed("QUEUED", "COMPLETED")];
        assert_eq!(
            validate_task_lifecycle(&events),
            ReplayResult::Invalid(ReplayFailure::InvalidTransition {
                from: "QUEUED".to_string(),
                to: "COMPLETED".to_string(),
                index: 0,
            })
        );
    }

    #[test]
    fn event_after_terminal_status_is_invalid() {
        let events = vec![
            status_changed("QUEUED", "EVALUATING"),
            status_changed("EVALUATING", "COMPLETED"),
            status_changed("COMPLETED", "FAILED"),
        ];
        let result = validate_task_lifecycle(&events);
        assert!(matches!(
            result,
            ReplayResult::Invalid(ReplayFailure::InvalidTransition { index: 2, .. })
        ));
    }

    #[test]
    fn non_status_changed_events_are_ignored() {
        let mut events = vec![Event::new(
            RunId::new(),
            EventType::RunStarted,
            Some(TaskId::new("t1")),
            chrono::Utc::now(),
            serde_json::json!({}),
        )];
        events.push(status_changed("QUEUED", "EVALUATING"));
        events.push(status_changed("EVALUATING", "COMPLETED"));
        let result = validate_task_lifecycle(&events);
        assert_eq!(
            result,
            ReplayResult::Valid {
                final_status: Status::Completed,
                transition_count: 2,
            }
        );
    }
}
