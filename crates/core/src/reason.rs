// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed error-taxonomy tokens persisted on task records.

use serde::{Deserialize, Serialize};

/// Why a task's most recent attempt failed. Never raw exception text —
/// always one of this closed set, persisted on the task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// Task record missing or mistyped required fields.
    PrecheckInvalid,
    /// `task_file` path does not exist.
    TaskFileMissing,
    /// Task file unreadable as a JSON object, or violates the key/type contract.
    TaskFileInvalid,
    /// `repo_path` fails the absoluteness/traversal/directory/`.git` checks.
    RepoPathInvalid,
    /// Harness exited non-zero.
    UnknownFailure,
    /// Any unhandled internal error during the protected block.
    RunnerException,
}

crate::simple_display! {
    FailureReason {
        PrecheckInvalid => "PRECHECK_INVALID",
        TaskFileMissing => "TASK_FILE_MISSING",
        TaskFileInvalid => "TASK_FILE_INVALID",
        RepoPathInvalid => "REPO_PATH_INVALID",
        UnknownFailure => "UNKNOWN_FAILURE",
        RunnerException => "RUNNER_EXCEPTION",
    }
}

/// Why a task was moved to `DEAD_LETTER`, never to be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeadLetterReason {
    /// The transition guard or a terminal validator rejected the task's history.
    InvariantViolation,
    /// Retries are exhausted (`retries >= max_retries`).
    RetriesExhausted,
}

crate::simple_display! {
    DeadLetterReason {
        InvariantViolation => "INVARIANT_VIOLATION",
        RetriesExhausted => "RETRIES_EXHAUSTED",
    }
}
