// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consistency validation: join replayed lifecycle with the persisted
//! queue record.

use std::path::Path;

use oj_core::{Status, TaskId};
use oj_storage::queue::load_queue_tolerant;

use crate::replay::{validate_task_lifecycle, ReplayResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyResult {
    Valid {
        status: Status,
    },
    TaskNotFound,
    ReplayInvalid(ReplayResult),
    StateMismatch {
        queue_status: Option<Status>,
        replay_status: Status,
    },
}

impl ConsistencyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// A bare reason token, or `REASON:{json details}` when there is
    /// detail to carry (here, the nested replay failure).
    pub fn describe(&self) -> String {
        match self {
            Self::Valid { .. } => "VALID".to_string(),
            Self::TaskNotFound => "TASK_NOT_FOUND".to_string(),
            Self::ReplayInvalid(replay) => format!("REPLAY_INVALID:{{{}}}", replay.describe()),
            Self::StateMismatch {
                queue_status,
                replay_status,
            } => format!(
                "STATE_MISMATCH:{{\"queue_status\":{:?},\"replay_status\":\"{replay_status}\"}}",
                queue_status.map(|s| s.to_string())
            ),
        }
    }
}

/// Validate task `task_id`'s consistency: the queue must contain exactly
/// one record with that id, replay of its journal must be valid, and
/// the replayed final status must match the queue's persisted status.
pub fn validate_task_consistency(
    queue_path: &Path,
    task_id: &TaskId,
    events_for_task: &[oj_core::Event],
) -> ConsistencyResult {
    let queue_tasks = load_queue_tolerant(queue_path);
    let queue_task = queue_tasks
        .iter()
        .find(|t| t.task_id.as_ref() == Some(task_id));

    let Some(queue_task) = queue_task else {
        return ConsistencyResult::TaskNotFound;
    };

    let replay_result = validate_task_lifecycle(events_for_task);
    let ReplayResult::Valid { final_status, .. } = replay_result else {
        return ConsistencyResult::ReplayInvalid(replay_result);
    };

    if queue_task.status != Some(final_status) {
        return ConsistencyResult::StateMismatch {
            queue_status: queue_task.status,
            replay_status: final_status,
        };
    }

    ConsistencyResult::Valid {
        status: final_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oj_core::{Event, EventType, RunId, Task};
    use oj_storage::queue::persist_queue;
    use tempfile::tempdir;

    fn status_changed(from: &str, to: &str) -> Event {
        Event::new(
            RunId::new(),
            EventType::StatusChanged,
            Some(TaskId::new("t1")),
            chrono::Utc::now(),
            serde_json::json!({"old_status": from, "new_status": to}),
        )
    }

    fn task(id: &str, status: Status) -> Task {
        Task {
            task_id: Some(TaskId::new(id)),
            status: Some(status),
            task_file: Some("/x".into()),
            retries: 0,
            max_retries: 0,
            retry_delay_seconds: 0.0,
            next_attempt_at: None,
            last_exit_code: None,
            harness_log_path: None,
            failure_reason: None,
            dead_letter_reason: None,
            invariant_violation: None,
        }
    }

    #[test]
    fn matching_replay_and_queue_is_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.jsonl");
        persist_queue(&path, &[task("t1", Status::Completed)]).unwrap();
        let events = vec![
            status_changed("QUEUED", "EVALUATING"),
            status_changed("EVALUATING", "COMPLETED"),
        ];
        let result = validate_task_consistency(&path, &TaskId::new("t1"), &events);
        assert_eq!(
            result,
            ConsistencyResult::Valid {
                status: Status::Completed
            }
        );
    }

    #[test]
    fn missing_queue_record_is_task_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.jsonl");
        persist_queue(&path, &[]).unwrap();
        let result = validate_task_consistency(&path, &TaskId::new("t1"), &[]);
        assert_eq!(result, ConsistencyResult::TaskNotFound);
    }

    #[test]
    fn invalid_replay_propagates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.jsonl");
        persist_queue(&path, &[task("t1", Status::Completed)]).unwrap();
        let events = vec![status_changed("QUEUED", "COMPLETED")];
        let result = validate_task_consistency(&path, &TaskId::new("t1"), &events);
        assert!(matches!(result, ConsistencyResult::ReplayInvalid(_)));
    }

    #[test]
    fn mismatched_final_status_is_state_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasks.jsonl");
        persist_queue(&path, &[task("t1", Status::Failed)]).unwrap();
        let events = vec![
            status_changed("QUEUED", "EVALUATING"),
            status_changed("EVALUATING", "COMPLETED"),
        ];
        let result = validate_task_consistency(&path, &TaskId::new("t1"), &events);
        assert_eq!(
            result,
            ConsistencyResult::StateMismatch {
                queue_status: Some(Status::Failed),
                replay_status: Status::Completed,
            }
        );
    }
}
