// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event record shape written to and read from the journal: a flat
//! record with a string `event_type` tag and a generic `payload` object,
//! rather than an internally-tagged enum, so the wire format stays a
//! plain JSON object regardless of which event type it carries.

use serde::{Deserialize, Serialize};

use crate::id::{RunId, TaskId};

/// The closed set of event types the core emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    StatusChanged,
    RunStarted,
    RunFinished,
    RetryScheduled,
    DeadLettered,
}

crate::simple_display! {
    EventType {
        StatusChanged => "STATUS_CHANGED",
        RunStarted => "RUN_STARTED",
        RunFinished => "RUN_FINISHED",
        RetryScheduled => "RETRY_SCHEDULED",
        DeadLettered => "DEAD_LETTERED",
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "STATUS_CHANGED" => Ok(Self::StatusChanged),
            "RUN_STARTED" => Ok(Self::RunStarted),
            "RUN_FINISHED" => Ok(Self::RunFinished),
            "RETRY_SCHEDULED" => Ok(Self::RetryScheduled),
            "DEAD_LETTERED" => Ok(Self::DeadLettered),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &[
                    "STATUS_CHANGED",
                    "RUN_STARTED",
                    "RUN_FINISHED",
                    "RETRY_SCHEDULED",
                    "DEAD_LETTERED",
                ],
            )),
        }
    }
}

/// Fixed journal schema tag; bumped if the event wire format ever changes.
pub const EVENT_VERSION: &str = "v0";

/// One line of `logs/events.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub run_id: RunId,
    pub event_type: EventType,
    /// `None` when the originating task record had no usable `task_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default = "serde_json::Map::new")]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl Event {
    /// Build an event for `task_id`, stamping the fixed version and the
    /// given run id. `payload` is coerced to an empty object if the
    /// caller passes anything that isn't a JSON object.
    pub fn new(
        run_id: RunId,
        event_type: EventType,
        task_id: Option<TaskId>,
        timestamp: chrono::DateTime<chrono::Utc>,
        payload: serde_json::Value,
    ) -> Self {
        let payload = match payload {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            event_version: EVENT_VERSION.to_string(),
            timestamp,
            run_id,
            event_type,
            task_id,
            payload,
        }
    }
}
