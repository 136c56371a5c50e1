// src/engine/mod.rs

//! Orchestration engine for assetpipe.
//!
//! This module ties together:
//! - the per-category trigger queue (what happens when a category is
//!   triggered while one of its runs is still in flight)
//! - the main runtime event loop that reacts to:
//!   - manual and file-watch triggers
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::collections::BTreeMap;

use crate::types::Category;

/// Outcome of one task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Requested on the command line (initial categories of a task).
    Manual,
    /// Triggered due to a filesystem event.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once nothing is in flight and nothing is
    /// pending (one-shot tasks such as `minify`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from watchers, the backend, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A category should run.
    TaskTriggered {
        category: Category,
        reason: TriggerReason,
    },
    /// A run of a category finished.
    TaskCompleted {
        category: Category,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// A task run handed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub category: Category,
    /// Monotonic id across all dispatched runs, for log correlation.
    pub run_id: u64,
    pub reason: TriggerReason,
}

/// Run and failure counts of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub runs: u32,
    pub failures: u32,
}

/// Summary of everything the runtime executed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    stats: BTreeMap<Category, CategoryStats>,
}

impl RunReport {
    pub fn record(&mut self, category: Category, outcome: TaskOutcome) {
        let entry = self.stats.entry(category).or_default();
        entry.runs += 1;
        if outcome == TaskOutcome::Failed {
            entry.failures += 1;
        }
    }

    pub fn stats(&self, category: Category) -> CategoryStats {
        self.stats.get(&category).copied().unwrap_or_default()
    }

    pub fn runs(&self, category: Category) -> u32 {
        self.stats(category).runs
    }

    pub fn failures(&self, category: Category) -> u32 {
        self.stats(category).failures
    }

    pub fn total_runs(&self) -> u32 {
        self.stats.values().map(|s| s.runs).sum()
    }

    pub fn total_failures(&self) -> u32 {
        self.stats.values().map(|s| s.failures).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.total_failures() > 0
    }

    /// Categories that failed at least once, in category order.
    pub fn failed_categories(&self) -> Vec<Category> {
        self.stats
            .iter()
            .filter(|(_, s)| s.failures > 0)
            .map(|(c, _)| *c)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, CategoryStats)> + '_ {
        self.stats.iter().map(|(c, s)| (*c, *s))
    }
}

pub mod core;
pub mod queue;
pub mod runtime;

pub use self::core::{CoreCommand, CoreRuntime, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::Runtime;
