// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::{Category, TriggerWhileRunningBehaviour};

/// Triggers that arrive while a run of the same category is in flight.
///
/// Semantics:
/// - Each category has at most one pending slot. Any number of triggers
///   recorded while a run is in flight coalesce into that slot, so exactly
///   one follow-up run happens when the current one finishes.
/// - With `Skip`, triggers for a busy category are dropped.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    pending: BTreeSet<Category>,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            pending: BTreeSet::new(),
        }
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Returns true if no category has a pending run.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, category: Category) -> bool {
        self.pending.contains(&category)
    }

    /// Record a trigger for a busy category. Returns whether it was kept.
    pub fn record_trigger(&mut self, category: Category) -> bool {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                let fresh = self.pending.insert(category);
                debug!(%category, coalesced = !fresh, "trigger queued behind in-flight run");
                true
            }
            TriggerWhileRunningBehaviour::Skip => {
                debug!(%category, "category busy; trigger skipped");
                false
            }
        }
    }

    /// Remove and return the pending slot of `category`.
    pub fn take(&mut self, category: Category) -> bool {
        self.pending.remove(&category)
    }
}
