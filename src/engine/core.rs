// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces:
//! - an updated core state (in-flight categories, pending slots, report)
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) reads events from the channel
//! and hands [`ScheduledTask`]s to the backend. The core has no channels, no
//! Tokio types and performs no IO, so it is unit tested directly.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::engine::queue::TriggerQueue;
use crate::engine::{
    RunReport, RuntimeEvent, RuntimeOptions, ScheduledTask, TaskOutcome, TriggerReason,
};
use crate::types::{Category, TriggerWhileRunningBehaviour};

/// Command produced by the core, to be executed by the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Hand this run to the backend.
    DispatchTask(ScheduledTask),
    /// Nothing is in flight or pending and the runtime is one-shot.
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

#[derive(Debug)]
pub struct CoreRuntime {
    in_flight: BTreeSet<Category>,
    queue: TriggerQueue,
    options: RuntimeOptions,
    next_run_id: u64,
    report: RunReport,
}

impl CoreRuntime {
    pub fn new(behaviour: TriggerWhileRunningBehaviour, options: RuntimeOptions) -> Self {
        Self {
            in_flight: BTreeSet::new(),
            queue: TriggerQueue::new(behaviour),
            options,
            next_run_id: 1,
            report: RunReport::default(),
        }
    }

    /// True when no category is running.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn is_running(&self, category: Category) -> bool {
        self.in_flight.contains(&category)
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Handle a single runtime event.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { category, reason } => {
                self.handle_trigger(category, reason)
            }
            RuntimeEvent::TaskCompleted { category, outcome } => {
                self.handle_completion(category, outcome)
            }
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn handle_trigger(&mut self, category: Category, reason: TriggerReason) -> CoreStep {
        if self.in_flight.contains(&category) {
            self.queue.record_trigger(category);
            return CoreStep::continue_with(Vec::new());
        }

        info!(%category, ?reason, "task triggered");
        CoreStep::continue_with(vec![self.dispatch(category, reason)])
    }

    fn handle_completion(&mut self, category: Category, outcome: TaskOutcome) -> CoreStep {
        if !self.in_flight.remove(&category) {
            warn!(%category, "completion for a category that was not running; ignoring");
            return CoreStep::continue_with(Vec::new());
        }

        match outcome {
            TaskOutcome::Success => info!(%category, "task completed successfully"),
            TaskOutcome::Failed => warn!(%category, "task failed"),
        }
        self.report.record(category, outcome);

        let mut commands = Vec::new();
        if self.queue.take(category) {
            debug!(%category, "starting queued run");
            commands.push(self.dispatch(category, TriggerReason::FileWatch));
        }

        let mut keep_running = true;
        if self.options.exit_when_idle && self.is_idle() && self.queue.is_empty() {
            keep_running = false;
            commands.push(CoreCommand::RequestExit);
        }

        CoreStep {
            commands,
            keep_running,
        }
    }

    fn dispatch(&mut self, category: Category, reason: TriggerReason) -> CoreCommand {
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        self.in_flight.insert(category);
        CoreCommand::DispatchTask(ScheduledTask {
            category,
            run_id,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(category: Category) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            category,
            reason: TriggerReason::FileWatch,
        }
    }

    fn completed(category: Category, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted { category, outcome }
    }

    fn dispatched(step: &CoreStep) -> Vec<Category> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTask(t) => Some(t.category),
                CoreCommand::RequestExit => None,
            })
            .collect()
    }

    #[test]
    fn idle_category_is_dispatched_immediately() {
        let mut core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default());
        let step = core.step(trigger(Category::Script));
        assert_eq!(dispatched(&step), vec![Category::Script]);
        assert!(core.is_running(Category::Script));
    }

    #[test]
    fn repeated_triggers_while_running_coalesce_into_one_rerun() {
        let mut core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default());
        core.step(trigger(Category::Style));

        for _ in 0..3 {
            let step = core.step(trigger(Category::Style));
            assert!(dispatched(&step).is_empty());
        }

        let step = core.step(completed(Category::Style, TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec![Category::Style]);

        let step = core.step(completed(Category::Style, TaskOutcome::Success));
        assert!(dispatched(&step).is_empty());
        assert!(core.is_idle());
        assert_eq!(core.report().runs(Category::Style), 2);
    }

    #[test]
    fn skip_mode_drops_triggers_for_busy_category() {
        let mut core = CoreRuntime::new(TriggerWhileRunningBehaviour::Skip, RuntimeOptions::default());
        core.step(trigger(Category::Image));
        core.step(trigger(Category::Image));

        let step = core.step(completed(Category::Image, TaskOutcome::Success));
        assert!(dispatched(&step).is_empty());
        assert!(core.is_idle());
    }

    #[test]
    fn different_categories_run_concurrently() {
        let mut core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default());
        assert_eq!(dispatched(&core.step(trigger(Category::Script))), vec![Category::Script]);
        assert_eq!(dispatched(&core.step(trigger(Category::Template))), vec![Category::Template]);
        assert!(core.is_running(Category::Script) && core.is_running(Category::Template));
    }

    #[test]
    fn one_shot_exits_after_last_completion() {
        let options = RuntimeOptions {
            exit_when_idle: true,
        };
        let mut core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, options);
        core.step(trigger(Category::Script));
        core.step(trigger(Category::Style));

        let step = core.step(completed(Category::Script, TaskOutcome::Success));
        assert!(step.keep_running);

        let step = core.step(completed(Category::Style, TaskOutcome::Failed));
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::RequestExit));
        assert_eq!(core.report().failures(Category::Style), 1);
    }

    #[test]
    fn stray_completion_is_ignored() {
        let mut core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default());
        let step = core.step(completed(Category::IconFont, TaskOutcome::Success));
        assert!(step.keep_running);
        assert_eq!(core.report().total_runs(), 0);
    }

    #[test]
    fn run_ids_increase() {
        let mut core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default());
        let a = core.step(trigger(Category::Script));
        let b = core.step(trigger(Category::Style));
        let ids: Vec<u64> = a
            .commands
            .iter()
            .chain(b.commands.iter())
            .filter_map(|c| match c {
                CoreCommand::DispatchTask(t) => Some(t.run_id),
                CoreCommand::RequestExit => None,
            })
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, RuntimeOptions::default());
        assert!(!core.step(RuntimeEvent::ShutdownRequested).keep_running);
    }
}
