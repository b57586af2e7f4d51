// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-delimited JSON persistence for `queue/tasks.jsonl`.

use std::io::Write as _;
use std::path::Path;

use oj_core::Task;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("failed to read queue file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse queue record at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write queue file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Load every task record from `path`, in file order.
///
/// Unlike the tolerant validator readers, this is the runner's own load
/// path and trusts its own writes: a malformed line is a hard error
/// rather than a silent skip.
pub fn load_queue(path: &Path) -> Result<Vec<Task>, QueueError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(QueueError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };

    let mut tasks = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let task: Task = serde_json::from_str(line).map_err(|source| QueueError::Parse {
            line: idx + 1,
            source,
        })?;
        tasks.push(task);
    }
    Ok(tasks)
}

/// Tolerant variant used by the consistency validator: malformed lines
/// are skipped rather than erroring.
pub fn load_queue_tolerant(path: &Path) -> Vec<Task> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Atomically replace `path` with `tasks`, one JSON object per line,
/// keys in sorted order.
///
/// Writes to a temp file in the same directory, flushes, then renames
/// over the target so partial writes are never observable.
pub fn persist_queue(path: &Path, tasks: &[Task]) -> Result<(), QueueError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|source| QueueError::Write {
        path: path.display().to_string(),
        source,
    })?;

    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks.jsonl".to_string())
    ));

    {
        let mut file = std::fs::File::create(&tmp_path).map_err(|source| QueueError::Write {
            path: tmp_path.display().to_string(),
            source,
        })?;
        for task in tasks {
            let line = sorted_keys_json(task);
            writeln!(file, "{line}").map_err(|source| QueueError::Write {
                path: tmp_path.display().to_string(),
                source,
            })?;
        }
        file.flush().map_err(|source| QueueError::Write {
            path: tmp_path.display().to_string(),
            source,
        })?;
    }

    std::fs::rename(&tmp_path, path).map_err(|source| QueueError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Round-trip through `serde_json::Value` to get sorted-key output:
/// `serde_json::Map` is `BTreeMap`-backed unless the `preserve_order`
/// feature is enabled, which this workspace does not pull in.
fn sorted_keys_json(task: &Task) -> String {
    let value = serde_json::to_value(task).unwrap_or(serde_json::Value::Null);
    serde_json::to_string(&value).unwrap_or_default()
}
