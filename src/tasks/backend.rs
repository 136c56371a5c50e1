// src/tasks/backend.rs

//! Pluggable task backend.
//!
//! The runtime hands every dispatched run to a `TaskBackend` instead of
//! running it itself, so tests can swap in a backend that records runs and
//! completes them immediately.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::{RuntimeEvent, ScheduledTask, TaskOutcome};
use crate::errors::Result;
use crate::tasks::pipeline::Pipeline;

pub trait TaskBackend: Send {
    /// Start `task`. The backend must eventually send exactly one
    /// `TaskCompleted` for it.
    fn dispatch(
        &mut self,
        task: ScheduledTask,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: every run is a Tokio task driving the [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineBackend {
    pipeline: Arc<Pipeline>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl PipelineBackend {
    pub fn new(pipeline: Arc<Pipeline>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            pipeline,
            runtime_tx,
        }
    }
}

impl TaskBackend for PipelineBackend {
    fn dispatch(
        &mut self,
        task: ScheduledTask,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let category = task.category;
                let run_id = task.run_id;
                info!(%category, run_id, reason = ?task.reason, "starting task");

                // A panicking run must still complete, or the category stays
                // in flight for good.
                let run = tokio::spawn(async move { pipeline.run(category).await });
                let outcome = match run.await {
                    Ok(Ok(_)) => TaskOutcome::Success,
                    Ok(Err(err)) => {
                        error!(%category, run_id, error = %err, "task failed");
                        TaskOutcome::Failed
                    }
                    Err(err) => {
                        error!(%category, run_id, error = %err, "task aborted");
                        TaskOutcome::Failed
                    }
                };

                if let Err(err) = tx.send(RuntimeEvent::TaskCompleted { category, outcome }).await {
                    warn!(%category, "failed to report task completion: {err}");
                    return;
                }
                info!(%category, run_id, ?outcome, "task completed");
            });
            Ok(())
        })
    }
}
