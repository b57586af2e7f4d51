// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime-root-relative path layout.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the runtime root.
pub const RUNTIME_ROOT_ENV: &str = "ACP_SLICE_RUNTIME_ROOT";

/// The directory everything else (`queue/`, `logs/`, `config.json`)
/// lives under. Resolution order: explicit CLI flag, then
/// `ACP_SLICE_RUNTIME_ROOT`, then a well-known default.
#[derive(Debug, Clone)]
pub struct RuntimeRoot(PathBuf);

impl RuntimeRoot {
    pub fn resolve(flag: Option<PathBuf>) -> Self {
        if let Some(path) = flag {
            return Self(path);
        }
        if let Ok(env_path) = std::env::var(RUNTIME_ROOT_ENV) {
            if !env_path.is_empty() {
                return Self(PathBuf::from(env_path));
            }
        }
        Self(default_runtime_root())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn queue_path(&self) -> PathBuf {
        self.0.join("queue").join("tasks.jsonl")
    }

    pub fn events_path(&self) -> PathBuf {
        self.0.join("logs").join("events.jsonl")
    }

    pub fn config_path(&self) -> PathBuf {
        self.0.join("config.json")
    }

    pub fn harness_log_dir(&self) -> PathBuf {
        self.0.join("logs").join("harness")
    }

    pub fn harness_log_path(&self, task_id: &str) -> PathBuf {
        self.harness_log_dir().join(format!("{task_id}.jsonl"))
    }
}

fn default_runtime_root() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".acp-slice")
}
