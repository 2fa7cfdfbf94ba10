//! Queue of deferred index mutations.
//!
//! Mutations are keyed by document id. A mutation for an id that is still
//! queued replaces the queued one but keeps its place in line, so an id is
//! applied at most once per drain with its latest content.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use log::{debug, error};

use crate::data::DocId;
use crate::engine::Engine;
use crate::error::Result;

/// A queued mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Index content under an id, replacing what was there.
    Add { id: DocId, content: String },
    /// Drop what an id holds, then index new content under it.
    Update { id: DocId, content: String },
    /// Remove an id.
    Remove { id: DocId },
}

impl Task {
    pub fn id(&self) -> &DocId {
        match self {
            Task::Add { id, .. } | Task::Update { id, .. } | Task::Remove { id } => id,
        }
    }

    fn apply(self, engine: &mut Engine) -> Result<()> {
        match self {
            Task::Add { id, content } => engine.add(id, &content),
            Task::Update { id, content } => {
                engine.remove(&id)?;
                engine.add(id, &content)
            }
            Task::Remove { id } => engine.remove(id).map(|_| ()),
        }
    }
}

/// Outcome of one drain turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub applied: usize,
    /// Tasks that returned an error and were dropped.
    pub failed: usize,
    pub remaining: usize,
}

/// FIFO queue of pending mutations with a resumable, time-budgeted drain.
#[derive(Debug, Default)]
pub struct TaskQueue {
    order: VecDeque<DocId>,
    pending: AHashMap<DocId, Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task. Returns true if it replaced a task for the same id.
    pub fn push(&mut self, task: Task) -> bool {
        let id = task.id().clone();
        if let Some(queued) = self.pending.get_mut(&id) {
            *queued = task;
            return true;
        }
        self.order.push_back(id.clone());
        self.pending.insert(id, task);
        false
    }

    /// The queued task for `id`, if any.
    pub fn get(&self, id: &DocId) -> Option<&Task> {
        self.pending.get(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.pending.clear();
    }

    /// Apply queued tasks in order until the queue is empty or `budget` has
    /// elapsed. At least one task is taken per call when any is queued.
    ///
    /// A failing task is logged and dropped; the drain carries on with the
    /// tasks after it.
    pub fn drain(&mut self, engine: &mut Engine, budget: Duration) -> DrainReport {
        let started = Instant::now();
        let mut applied = 0;
        let mut failed = 0;

        while let Some(id) = self.order.pop_front() {
            if let Some(task) = self.pending.remove(&id) {
                match task.apply(engine) {
                    Ok(()) => applied += 1,
                    Err(err) => {
                        error!("dropping queued mutation for {id}: {err}");
                        failed += 1;
                    }
                }
            }
            if started.elapsed() >= budget {
                break;
            }
        }

        let report = DrainReport {
            applied,
            failed,
            remaining: self.len(),
        };
        if applied + failed > 0 {
            debug!(
                "drained {} tasks ({} failed), {} remaining",
                report.applied, report.failed, report.remaining
            );
        }
        report
    }
}
