use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::engine::{RuntimeEvent, ScheduledTask, TaskOutcome};
use assetpipe::errors::Result;
use assetpipe::tasks::TaskBackend;
use assetpipe::types::Category;
use tokio::sync::mpsc;

/// A fake backend that:
/// - records which categories were "run"
/// - reports `TaskCompleted` after an optional delay, failing the
///   categories it was told to fail.
pub struct FakeBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<Category>>>,
    failing: BTreeSet<Category>,
    delay: Duration,
}

impl FakeBackend {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<Category>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: BTreeSet::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(mut self, category: Category) -> Self {
        self.failing.insert(category);
        self
    }

    /// Keep every run "in flight" for `delay` before completing it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl TaskBackend for FakeBackend {
    fn dispatch(
        &mut self,
        task: ScheduledTask,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let delay = self.delay;
        let outcome = if self.failing.contains(&task.category) {
            TaskOutcome::Failed
        } else {
            TaskOutcome::Success
        };

        Box::pin(async move {
            executed.lock().unwrap().push(task.category);

            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _ = tx
                    .send(RuntimeEvent::TaskCompleted {
                        category: task.category,
                        outcome,
                    })
                    .await;
            });
            Ok(())
        })
    }
}
