// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The harness subprocess adapter.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to spawn harness process: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Invoke the external harness: `aah run --repo <repo> --log <log> --label
/// <label> -- <argv...>`. No timeout is imposed; the runner waits for
/// the harness to exit on its own (see DESIGN.md for why).
///
/// Returns the process exit code, or `-1` if the process was terminated
/// by a signal rather than exiting normally.
pub async fn run(
    resolved_repo: &Path,
    log_path: &Path,
    label: &str,
    argv: &[String],
) -> Result<i32, HarnessError> {
    let mut command = tokio::process::Command::new("aah");
    command
        .arg("run")
        .arg("--repo")
        .arg(resolved_repo)
        .arg("--log")
        .arg(log_path)
        .arg("--label")
        .arg(label)
        .arg("--")
        .args(argv);

    tracing::info!(
        repo = %resolved_repo.display(),
        log = %log_path.display(),
        label,
        "invoking harness"
    );

    let status = command.status().await.map_err(HarnessError::Spawn)?;
    let exit_code = status.code().unwrap_or(-1);
    tracing::info!(exit_code, label, "harness exited");
    Ok(exit_code)
}
