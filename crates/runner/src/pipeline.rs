// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queue runner: `run_once` and the per-task pipeline.

use oj_core::{
    transition, Clock, DeadLetterReason, EventType, FailureReason, InvariantViolation, RunId,
    Status, Task, TaskFile, TaskId, TransitionOutcome,
};
use oj_storage::journal::EventJournal;
use oj_storage::queue::{load_queue, persist_queue, QueueError};
use oj_storage::{load_config, RunnerConfig};
use thiserror::Error;

use crate::consistency::validate_task_consistency;
use crate::harness;
use crate::paths::RuntimeRoot;
use crate::replay::validate_task_lifecycle;
use crate::resolve::resolve_repo_path;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Journal(#[from] oj_storage::journal::JournalError),
}

const TERMINAL_STATUSES: [Status; 3] = [Status::Completed, Status::Refused, Status::DeadLetter];

/// Owns the queue/journal/config paths and the clock used for retry
/// deferral and event timestamps. One `Runner` corresponds to one
/// runner process: its `EventJournal` is opened once and its `run_id`
/// is stable across every `run_once` call made through it.
pub struct Runner<C: Clock> {
    runtime_root: RuntimeRoot,
    clock: C,
    journal: EventJournal,
}

impl<C: Clock> Runner<C> {
    pub fn new(runtime_root: RuntimeRoot, clock: C) -> Result<Self, RunnerError> {
        let journal = EventJournal::open(runtime_root.events_path(), RunId::new())?;
        Ok(Self {
            runtime_root,
            clock,
            journal,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.journal.run_id()
    }

    fn now_epoch_secs(&self) -> f64 {
        self.clock.epoch_ms() as f64 / 1000.0
    }

    fn now_timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(self.clock.epoch_ms() as i64)
            .unwrap_or_else(chrono::Utc::now)
    }

    fn emit(&self, event_type: EventType, task_id: Option<TaskId>, payload: serde_json::Value) {
        self.journal
            .append(event_type, task_id, self.now_timestamp(), payload);
    }

    fn persist(&self, tasks: &[Task]) -> Result<(), RunnerError> {
        Ok(persist_queue(&self.runtime_root.queue_path(), tasks)?)
    }

    fn config(&self) -> RunnerConfig {
        load_config(&self.runtime_root.config_path())
    }

    /// Execute one pass over the queue, processing up to
    /// `max_tasks_per_run` eligible tasks. Returns the count processed.
    pub async fn run_once(&self) -> Result<usize, RunnerError> {
        let mut tasks = load_queue(&self.runtime_root.queue_path())?;
        let max_tasks_per_run = self.config().max_tasks_per_run as usize;
        let mut processed = 0usize;

        for idx in 0..tasks.len() {
            if processed >= max_tasks_per_run {
                break;
            }
            if tasks[idx].status != Some(Status::Queued) {
                continue;
            }
            let now = self.now_epoch_secs();
            if tasks[idx].is_deferred(now) {
                continue;
            }

            self.process_task(&mut tasks, idx, now).await?;
            processed += 1;
        }

        Ok(processed)
    }

    async fn process_task(
        &self,
        tasks: &mut [Task],
        idx: usize,
        now: f64,
    ) -> Result<(), RunnerError> {
        if !tasks[idx].precheck_valid() {
            self.mark_failed(&mut tasks[idx], FailureReason::PrecheckInvalid);
            self.apply_retry_if_eligible(&mut tasks[idx], now);
            self.persist(tasks)?;
            self.run_terminal_validations(&mut tasks[idx])?;
            self.persist(tasks)?;
            self.emit_run_finished(&tasks[idx]);
            return Ok(());
        }

        self.apply_transition(&mut tasks[idx], Status::Evaluating);
        self.persist(tasks)?;

        let task_id = tasks[idx].task_id.clone();
        self.emit(EventType::RunStarted, task_id, serde_json::json!({}));

        self.run_harness_stage(&mut tasks[idx]).await;

        self.apply_retry_if_eligible(&mut tasks[idx], now);
        self.persist(tasks)?;
        self.run_terminal_validations(&mut tasks[idx])?;
        self.persist(tasks)?;
        self.emit_run_finished(&tasks[idx]);
        Ok(())
    }

    /// Resolve the task file, invoke the harness, and record the
    /// outcome. Any failure along the way is folded into a `FAILED`
    /// transition with the matching closed-taxonomy reason; nothing
    /// here propagates an error out of the pipeline.
    async fn run_harness_stage(&self, task: &mut Task) {
        let task_file_path = match &task.task_file {
            Some(path) => path.clone(),
            None => {
                // precheck_valid() already guarantees this, but keep the
                // pipeline total rather than indexing into an Option.
                self.mark_failed(task, FailureReason::RunnerException);
                return;
            }
        };

        if !std::path::Path::new(&task_file_path).exists() {
            self.mark_failed(task, FailureReason::TaskFileMissing);
            return;
        }

        let contents = match std::fs::read_to_string(&task_file_path) {
            Ok(c) => c,
            Err(_) => {
                self.mark_failed(task, FailureReason::TaskFileInvalid);
                return;
            }
        };
        let raw: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(v) => v,
            Err(_) => {
                self.mark_failed(task, FailureReason::TaskFileInvalid);
                return;
            }
        };
        let serde_json::Value::Object(raw_map) = raw else {
            self.mark_failed(task, FailureReason::TaskFileInvalid);
            return;
        };
        if !TaskFile::validate_keys(&raw_map) {
            self.mark_failed(task, FailureReason::TaskFileInvalid);
            return;
        }
        let task_file: TaskFile = match serde_json::from_value(serde_json::Value::Object(raw_map))
        {
            Ok(tf) => tf,
            Err(_) => {
                self.mark_failed(task, FailureReason::TaskFileInvalid);
                return;
            }
        };
        if !task_file.is_well_formed() {
            self.mark_failed(task, FailureReason::TaskFileInvalid);
            return;
        }

        let Some(resolved_repo) = resolve_repo_path(&task_file.repo_path) else {
            self.mark_failed(task, FailureReason::RepoPathInvalid);
            return;
        };

        let task_id_str = task
            .task_id
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_default();
        let label = task_file.label.clone().unwrap_or_else(|| task_id_str.clone());
        let log_path = self.runtime_root.harness_log_path(&task_id_str);
        if let Some(dir) = log_path.parent() {
            if std::fs::create_dir_all(dir).is_err() {
                self.mark_failed(task, FailureReason::RunnerException);
                return;
            }
        }

        match harness::run(&resolved_repo, &log_path, &label, &task_file.argv).await {
            Ok(exit_code) => {
                task.last_exit_code = Some(exit_code);
                task.harness_log_path = Some(log_path.display().to_string());
                if exit_code == 0 {
                    self.apply_transition(task, Status::Completed);
                    task.failure_reason = None;
                } else {
                    self.mark_failed(task, FailureReason::UnknownFailure);
                }
            }
            Err(_) => {
                self.mark_failed(task, FailureReason::RunnerException);
            }
        }
    }

    /// Apply a transition, emitting the events the guard's outcome
    /// implies.
    fn apply_transition(&self, task: &mut Task, new_status: Status) {
        let task_id = task.task_id.clone();
        match transition(task, new_status) {
            TransitionOutcome::Applied { from, to } => {
                self.emit(
                    EventType::StatusChanged,
                    task_id,
                    serde_json::json!({"old_status": from.to_string(), "new_status": to.to_string()}),
                );
            }
            TransitionOutcome::Coerced { from, .. } => {
                let old_status = from.map(|s| s.to_string());
                self.emit(
                    EventType::StatusChanged,
                    task_id.clone(),
                    serde_json::json!({"old_status": old_status, "new_status": Status::DeadLetter.to_string()}),
                );
                self.emit(
                    EventType::DeadLettered,
                    task_id,
                    serde_json::json!({"dead_letter_reason": task.dead_letter_reason.map(|r| r.to_string())}),
                );
            }
        }
    }

    /// Transition to `FAILED`, then set `failure_reason` only if the
    /// guard actually landed on `FAILED` rather than diverting to
    /// `DEAD_LETTER`.
    fn mark_failed(&self, task: &mut Task, reason: FailureReason) {
        self.apply_transition(task, Status::Failed);
        if task.status == Some(Status::Failed) {
            task.failure_reason = Some(reason);
        }
    }

    fn emit_run_finished(&self, task: &Task) {
        let final_status = task.status.map(|s| s.to_string());
        self.emit(
            EventType::RunFinished,
            task.task_id.clone(),
            serde_json::json!({"final_status": final_status}),
        );
    }

    /// Retry policy: only acts when the task is currently `FAILED`.
    fn apply_retry_if_eligible(&self, task: &mut Task, now: f64) {
        if task.status != Some(Status::Failed) {
            return;
        }

        if task.retries < task.max_retries {
            task.retries += 1;
            let next_attempt_at = now + task.retry_delay_seconds;
            task.next_attempt_at = Some(next_attempt_at);
            let task_id = task.task_id.clone();
            self.emit(
                EventType::RetryScheduled,
                task_id,
                serde_json::json!({
                    "retries": task.retries,
                    "max_retries": task.max_retries,
                    "next_attempt_at": next_attempt_at,
                }),
            );
            self.apply_transition(task, Status::Queued);
            if task.status == Some(Status::Queued) {
                task.failure_reason = None;
            }
            return;
        }

        self.apply_transition(task, Status::DeadLetter);
        if task.status == Some(Status::DeadLetter) {
            task.dead_letter_reason = Some(DeadLetterReason::RetriesExhausted);
            let task_id = task.task_id.clone();
            self.emit(
                EventType::DeadLettered,
                task_id,
                serde_json::json!({"dead_letter_reason": DeadLetterReason::RetriesExhausted.to_string()}),
            );
        }
    }

    /// Terminal validations: only run once the task has reached one of
    /// the terminal statuses, and only if it has a usable `task_id` to
    /// look itself up by.
    fn run_terminal_validations(&self, task: &mut Task) -> Result<(), RunnerError> {
        let Some(task_id) = task.task_id.clone() else {
            return Ok(());
        };
        let Some(status) = task.status else {
            return Ok(());
        };
        if !TERMINAL_STATUSES.contains(&status) {
            return Ok(());
        }

        let events = oj_storage::journal::get_events_for_task(&self.runtime_root.events_path(), &task_id);
        let replay_result = validate_task_lifecycle(&events);
        if !replay_result.is_valid() {
            self.mark_dead_letter_for_validator_failure(
                task,
                "REPLAY_INVALID",
                &replay_result.describe(),
            );
            return Ok(());
        }

        let consistency_result =
            validate_task_consistency(&self.runtime_root.queue_path(), &task_id, &events);
        if consistency_result.is_valid() {
            return Ok(());
        }
        self.mark_dead_letter_for_validator_failure(
            task,
            "CONSISTENCY_INVALID",
            &consistency_result.describe(),
        );
        Ok(())
    }

    fn mark_dead_letter_for_validator_failure(&self, task: &mut Task, code: &str, message: &str) {
        let task_id = task.task_id.clone();
        let old_status = task.status;
        if old_status != Some(Status::DeadLetter) {
            task.status = Some(Status::DeadLetter);
            self.emit(
                EventType::StatusChanged,
                task_id.clone(),
                serde_json::json!({
                    "old_status": old_status.map(|s| s.to_string()),
                    "new_status": Status::DeadLetter.to_string(),
                }),
            );
        }
        task.dead_letter_reason = Some(DeadLetterReason::InvariantViolation);
        task.invariant_violation = Some(InvariantViolation::structured(code, message));
        self.emit(
            EventType::DeadLettered,
            task_id,
            serde_json::json!({"dead_letter_reason": DeadLetterReason::InvariantViolation.to_string()}),
        );
    }
}
