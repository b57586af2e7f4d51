// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task lifecycle status enum and the closed transition table.

/// A task's lifecycle status.
///
/// Serializes to the exact uppercase tokens the queue file and event
/// journal use on the wire (`QUEUED`, `EVALUATING`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Queued,
    Evaluating,
    Completed,
    Failed,
    Refused,
    DeadLetter,
}

crate::simple_display! {
    Status {
        Queued => "QUEUED",
        Evaluating => "EVALUATING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Refused => "REFUSED",
        DeadLetter => "DEAD_LETTER",
    }
}

impl Status {
    /// Parse a status from its wire token. Returns `None` for any value
    /// outside the closed enum.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "QUEUED" => Some(Self::Queued),
            "EVALUATING" => Some(Self::Evaluating),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "REFUSED" => Some(Self::Refused),
            "DEAD_LETTER" => Some(Self::DeadLetter),
            _ => None,
        }
    }

    /// Terminal statuses never leave their state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Refused | Self::DeadLetter)
    }

    /// The statuses this status may transition to, per the closed graph.
    pub fn allowed_next(self) -> &'static [Status] {
        match self {
            Self::Queued => &[
                Status::Evaluating,
                Status::DeadLetter,
                Status::Failed,
                Status::Refused,
            ],
            Self::Evaluating => &[
                Status::Completed,
                Status::Failed,
                Status::DeadLetter,
                Status::Refused,
            ],
            Self::Failed => &[Status::Queued, Status::DeadLetter],
            Self::Completed | Self::Refused | Self::DeadLetter => &[],
        }
    }

    pub fn can_transition_to(self, next: Status) -> bool {
        self.allowed_next().contains(&next)
    }
}

impl serde::Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Status {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Status::parse(&s).ok_or_else(|| serde::de::Error::unknown_variant(
            &s,
            &["QUEUED", "EVALUATING", "COMPLETED", "FAILED", "REFUSED", "DEAD_LETTER"],
        ))
    }
}

/// Look up whether `from -> to` is an allowed move, keyed by wire
/// token rather than by enum, for callers — e.g. the replay validator —
/// that only have the string form read back from the journal.
pub fn allowed_transition(from: &str, to: &str) -> bool {
    match Status::parse(from) {
        Some(from) => match Status::parse(to) {
            Some(to) => from.can_transition_to(to),
            None => false,
        },
        None => false,
    }
}
