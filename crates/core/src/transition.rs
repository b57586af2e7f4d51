// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state-machine transition guard and its coerce-on-violation
//! behavior: an illegal move doesn't error, it dead-letters the task.

use crate::reason::DeadLetterReason;
use crate::status::Status;
use crate::task::{InvariantViolation, Task};

/// What `transition` actually did to the task, so callers that follow up
/// with field mutations (e.g. setting `failure_reason`) can tell whether
/// the guard honored the intended status or diverted to dead-letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// `task.status` is now `new_status` as requested. `from` is `None`
    /// only if a task with no recognized current status is somehow
    /// asked to move forward — in practice this path is the coercion
    /// branch instead, so `from` is always `Some` in `Applied`.
    Applied { from: Status, to: Status },
    /// The move was not in `ALLOWED_TRANSITIONS` — because the current
    /// status was missing/unrecognized, or because it did not permit
    /// `new_status` — so the guard coerced the task into `DEAD_LETTER`.
    Coerced {
        from: Option<Status>,
        attempted: Status,
    },
}

/// Attempt `task.status -> new_status`. Mutates `task` in place and
/// returns which of the two guard behaviors fired.
///
/// This function does not emit events; callers own journaling the
/// `STATUS_CHANGED`/`DEAD_LETTERED` events implied by the outcome, since
/// event emission needs a `run_id` and timestamp this pure function does
/// not have.
pub fn transition(task: &mut Task, new_status: Status) -> TransitionOutcome {
    match task.status {
        Some(current) if current.can_transition_to(new_status) => {
            task.status = Some(new_status);
            TransitionOutcome::Applied {
                from: current,
                to: new_status,
            }
        }
        current => {
            task.status = Some(Status::DeadLetter);
            task.invariant_violation = Some(InvariantViolation::Bool(true));
            task.dead_letter_reason = Some(DeadLetterReason::InvariantViolation);
            TransitionOutcome::Coerced {
                from: current,
                attempted: new_status,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::TaskId;

    fn task_with_status(status: Option<Status>) -> Task {
        Task {
            task_id: Some(TaskId::new("t1")),
            status,
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
    fn allowed_move_applies_cleanly() {
        let mut task = task_with_status(Some(Status::Queued));
        let outcome = transition(&mut task, Status::Evaluating);
        assert_eq!(
            outcome,
            TransitionOutcome::Applied {
                from: Status::Queued,
                to: Status::Evaluating,
            }
        );
        assert_eq!(task.status, Some(Status::Evaluating));
        assert!(task.invariant_violation.is_none());
    }

    #[test]
    fn illegal_move_coerces_to_dead_letter() {
        let mut task = task_with_status(Some(Status::Queued));
        let outcome = transition(&mut task, Status::Completed);
        assert_eq!(
            outcome,
            TransitionOutcome::Coerced {
                from: Some(Status::Queued),
                attempted: Status::Completed,
            }
        );
        assert_eq!(task.status, Some(Status::DeadLetter));
        assert_eq!(
            task.invariant_violation,
            Some(InvariantViolation::Bool(true))
        );
        assert_eq!(
            task.dead_letter_reason,
            Some(DeadLetterReason::InvariantViolation)
        );
    }

    #[test]
    fn missing_current_status_coerces_to_dead_letter() {
        let mut task = task_with_status(None);
        let outcome = transition(&mut task, Status::Evaluating);
        assert_eq!(
            outcome,
            TransitionOutcome::Coerced {
                from: None,
                attempted: Status::Evaluating,
            }
        );
        assert_eq!(task.status, Some(Status::DeadLetter));
    }

    #[test]
    fn moving_out_of_terminal_status_always_coerces() {
        for terminal in [Status::Completed, Status::Refused, Status::DeadLetter] {
            let mut task = task_with_status(Some(terminal));
            let outcome = transition(&mut task, Status::Queued);
            assert!(matches!(outcome, TransitionOutcome::Coerced { .. }));
            assert_eq!(task.status, Some(Status::DeadLetter));
        }
    }
}
