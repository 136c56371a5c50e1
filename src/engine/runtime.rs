// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::tasks::TaskBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RunReport, RuntimeEvent, ScheduledTask};

/// Async IO shell around [`CoreRuntime`].
///
/// Reads `RuntimeEvent`s from the channel, feeds them to the core and hands
/// dispatched runs to a [`TaskBackend`]. All scheduling semantics live in the
/// core.
pub struct Runtime<B: TaskBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
}

impl<B: TaskBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: TaskBackend> Runtime<B> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, backend: B) -> Self {
        Self {
            core,
            event_rx,
            backend,
        }
    }

    /// Main event loop. Returns what ran once the core asks to stop, a
    /// shutdown is requested or every event sender is gone.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("assetpipe runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        let report = self.core.into_report();
        info!(
            runs = report.total_runs(),
            failures = report.total_failures(),
            "runtime exiting"
        );
        Ok(report)
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTask(task) => self.dispatch(task).await,
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
                Ok(())
            }
        }
    }

    async fn dispatch(&mut self, task: ScheduledTask) -> Result<()> {
        debug!(category = %task.category, run_id = task.run_id, "dispatching task");
        self.backend.dispatch(task).await
    }
}
