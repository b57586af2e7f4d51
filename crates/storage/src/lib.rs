// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! acp-slice-storage: atomic queue-file persistence, the append-only
//! event journal, and runtime configuration loading.

pub mod config;
pub mod journal;
pub mod queue;

pub use config::{load_config, RunnerConfig};
pub use journal::{EventJournal, JournalError};
pub use queue::{load_queue, persist_queue, QueueError};
