// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration loading (`config.json`).

use std::path::Path;

const DEFAULT_MAX_TASKS_PER_RUN: u32 = 1;

/// The runner's configuration, loaded from `<runtime_root>/config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub max_tasks_per_run: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_run: DEFAULT_MAX_TASKS_PER_RUN,
        }
    }
}

/// Load configuration from `path`. A missing file, a parse error, or an
/// invalid `max_tasks_per_run` (non-positive, non-integer, or wrong
/// type) all fall back silently to the default.
pub fn load_config(path: &Path) -> RunnerConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return RunnerConfig::default(),
    };

    let value: serde_json::Value = match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(_) => return RunnerConfig::default(),
    };

    let max_tasks_per_run = value
        .get("max_tasks_per_run")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_TASKS_PER_RUN);

    RunnerConfig { max_tasks_per_run }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(load_config(&path).max_tasks_per_run, 1);
    }

    #[test]
    fn valid_value_is_honored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_tasks_per_run": 5}"#).unwrap();
        assert_eq!(load_config(&path).max_tasks_per_run, 5);
    }

    #[test]
    fn non_positive_value_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_tasks_per_run": 0}"#).unwrap();
        assert_eq!(load_config(&path).max_tasks_per_run, 1);

        std::fs::write(&path, r#"{"max_tasks_per_run": -3}"#).unwrap();
        assert_eq!(load_config(&path).max_tasks_per_run, 1);
    }

    #[test]
    fn malformed_json_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_config(&path).max_tasks_per_run, 1);
    }

    #[test]
    fn non_integer_value_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_tasks_per_run": "five"}"#).unwrap();
        assert_eq!(load_config(&path).max_tasks_per_run, 1);
    }
}
