// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task record persisted to the queue file, and the task-file payload
//! it points at.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::id::TaskId;
use crate::reason::{DeadLetterReason, FailureReason};
use crate::status::Status;

/// Either a plain boolean or a structured `{code, message}` cause: a
/// bare `true` when the transition guard itself coerces a transition,
/// and a structured cause when a terminal validator rejects the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvariantViolation {
    Bool(bool),
    Structured { code: String, message: String },
}

impl InvariantViolation {
    pub fn structured(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structured {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Deserialize a field as `None` on either a missing key (`#[serde(default)]`
/// handles that case before this ever runs) or a present-but-wrong-type
/// value, instead of failing the whole record. A producer record with a
/// malformed `task_id`/`status`/`task_file` must still load far enough
/// for the runner to classify it as a precheck failure, not refuse to
/// parse outright.
fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value::<T>(value).ok())
}

/// A task record, one line of `queue/tasks.jsonl`.
///
/// `task_id`, `status`, and `task_file` are `Option` even though a
/// well-formed record always carries them: the precheck step must be
/// able to observe that one of them is missing or mistyped, which means
/// the type that holds a task record has to be able to represent that
/// state rather than fail to deserialize at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, deserialize_with = "lenient_option")]
    pub task_id: Option<TaskId>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub task_file: Option<String>,

    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub retry_delay_seconds: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harness_log_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_reason: Option<DeadLetterReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invariant_violation: Option<InvariantViolation>,
}

impl Task {
    /// Whether `task_id`, `status`, and `task_file` are all present and
    /// well-typed — the precheck gate a task must clear before the
    /// runner will touch its task file or invoke the harness.
    pub fn precheck_valid(&self) -> bool {
        self.task_id.as_ref().is_some_and(|id| !id.as_str().is_empty())
            && self.status.is_some()
            && self
                .task_file
                .as_ref()
                .is_some_and(|path| !path.is_empty())
    }

    /// Whether `next_attempt_at` defers this task past `now_epoch_secs`.
    pub fn is_deferred(&self, now_epoch_secs: f64) -> bool {
        self.next_attempt_at.is_some_and(|at| now_epoch_secs < at)
    }
}

/// The JSON payload read from a task's `task_file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFile {
    pub repo_path: String,
    pub argv: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TaskFile {
    const ALLOWED_KEYS: &'static [&'static str] = &["repo_path", "argv", "label"];

    /// Validate the key/type contract against the raw JSON object the
    /// file actually contained — `serde`'s default leniency would
    /// silently accept unknown keys, but the contract forbids them.
    pub fn validate_keys(raw: &serde_json::Map<String, serde_json::Value>) -> bool {
        raw.keys().all(|k| Self::ALLOWED_KEYS.contains(&k.as_str()))
            && raw.contains_key("repo_path")
            && raw.contains_key("argv")
    }

    /// Structural validity beyond key membership: non-empty `repo_path`,
    /// non-empty `argv` of non-empty strings, non-empty `label` if present.
    pub fn is_well_formed(&self) -> bool {
        if self.repo_path.is_empty() || self.argv.is_empty() {
            return false;
        }
        if self.argv.iter().any(|a| a.is_empty()) {
            return false;
        }
        if let Some(label) = &self.label {
            if label.is_empty() {
                return false;
            }
        }
        true
    }
}
