// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The append-only event journal.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oj_core::{Event, EventType, RunId, TaskId};

/// Name of the environment variable that enables a one-line diagnostic
/// on event-writer failure.
pub const EVENTS_WARN_ENV: &str = "ACP_EVENTS_WARN";

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("failed to create journal directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// An append-only writer bound to one `run_id` for the process
/// lifetime, so every event emitted by one invocation can be tied back
/// to it.
///
/// `append_event` never fails its caller: any I/O or serialization
/// error is caught, counted, and optionally logged.
pub struct EventJournal {
    path: PathBuf,
    run_id: RunId,
    error_count: Arc<AtomicU64>,
}

impl EventJournal {
    /// Open a journal at `path`, creating its parent directory now so a
    /// later write failure can only be a genuine I/O fault.
    pub fn open(path: impl Into<PathBuf>, run_id: RunId) -> Result<Self, JournalError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| JournalError::CreateDir {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(Self {
            path,
            run_id,
            error_count: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Total number of append failures since this journal was opened.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::SeqCst)
    }

    /// Build and append an event. Never returns an error; failures are
    /// absorbed into the error counter and, when `ACP_EVENTS_WARN=1`,
    /// logged at `warn` level.
    pub fn append(
        &self,
        event_type: EventType,
        task_id: Option<TaskId>,
        timestamp: chrono::DateTime<chrono::Utc>,
        payload: serde_json::Value,
    ) {
        let event = Event::new(self.run_id, event_type, task_id, timestamp, payload);
        if let Err(err) = self.append_raw(&event) {
            self.error_count.fetch_add(1, Ordering::SeqCst);
            if std::env::var(EVENTS_WARN_ENV).as_deref() == Ok("1") {
                tracing::warn!(error = %err, path = %self.path.display(), "event append failed");
            }
        }
    }

    fn append_raw(&self, event: &Event) -> std::io::Result<()> {
        let value = serde_json::to_value(event)?;
        let line = serde_json::to_string(&value)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()
    }
}

/// Read every well-formed object line from `path`, in file order.
/// Blank lines, malformed JSON, non-object JSON, and a missing or
/// unreadable file all yield an empty result rather than an error.
pub fn get_events(path: &Path) -> Vec<Event> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<serde_json::Value>(line) {
            Ok(serde_json::Value::Object(_)) => serde_json::from_str::<Event>(line).ok(),
            _ => None,
        })
        .collect()
}

/// `get_events` filtered to one task by exact `task_id` equality.
pub fn get_events_for_task(path: &Path, task_id: &TaskId) -> Vec<Event> {
    get_events(path)
        .into_iter()
        .filter(|e| e.task_id.as_ref() == Some(task_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        assert!(get_events(&path).is_empty());
    }

    #[test]
    fn append_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let run_id = RunId::new();
        let journal = EventJournal::open(&path, run_id).unwrap();
        journal.append(
            EventType::RunStarted,
            Some(TaskId::new("t1")),
            chrono::Utc::now(),
            serde_json::json!({}),
        );
        journal.append(
            EventType::StatusChanged,
            Some(TaskId::new("t1")),
            chrono::Utc::now(),
            serde_json::json!({"old_status": "QUEUED", "new_status": "EVALUATING"}),
        );

        let events = get_events(&path);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::RunStarted);
        assert_eq!(events[1].event_type, EventType::StatusChanged);
        assert!(events.iter().all(|e| e.run_id == run_id));
        assert_eq!(journal.error_count(), 0);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, "not json\n[1,2,3]\n\n").unwrap();
        assert!(get_events(&path).is_empty());
    }

    #[test]
    fn get_events_for_task_filters_by_exact_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let journal = EventJournal::open(&path, RunId::new()).unwrap();
        journal.append(
            EventType::RunStarted,
            Some(TaskId::new("t1")),
            chrono::Utc::now(),
            serde_json::json!({}),
        );
        journal.append(
            EventType::RunStarted,
            Some(TaskId::new("t2")),
            chrono::Utc::now(),
            serde_json::json!({}),
        );
        let events = get_events_for_task(&path, &TaskId::new("t1"));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].task_id.as_ref().unwrap().as_str(), "t1");
    }

    #[test]
    fn append_to_unwritable_path_increments_error_counter_without_panicking() {
        let dir = tempdir().unwrap();
        // Point the journal at a directory path, so opening the file for
        // append fails at the OS level.
        let path = dir.path().to_path_buf();
        let journal = EventJournal::open(dir.path().join("sub"), RunId::new()).unwrap();
        // Re-target `path` field via a path that is itself a directory.
        let broken = EventJournal {
            path,
            run_id: journal.run_id(),
            error_count: Arc::new(AtomicU64::new(0)),
        };
        broken.append(
            EventType::RunStarted,
            Some(TaskId::new("t1")),
            chrono::Utc::now(),
            serde_json::json!({}),
        );
        assert_eq!(broken.error_count(), 1);
    }
}
