//! Index whose mutations are applied by a background runner.
//!
//! Mutations return as soon as they are queued. A runner thread drains the
//! queue in time-budgeted turns and yields between turns, so a large batch
//! never holds the index for longer than one budget at a time. Searches
//! answer against whatever has been applied so far; a callback search runs
//! on the runner once the queue is empty.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error};
use parking_lot::Mutex;

use crate::analysis::registry::Registry;
use crate::data::DocId;
use crate::engine::config::IndexConfig;
use crate::engine::search::SearchRequest;
use crate::engine::{DocumentIndex, Engine, IndexInfo, SearchCallback};
use crate::error::{LotusError, Result};
use crate::maintenance::task_queue::{Task, TaskQueue};

/// Time a single drain turn may spend applying mutations.
pub const DEFAULT_BUDGET: Duration = Duration::from_millis(100);

enum Signal {
    Wake,
    Shutdown,
}

struct Shared {
    engine: Mutex<Engine>,
    queue: Mutex<TaskQueue>,
    pending_search: Mutex<Option<(SearchRequest, SearchCallback)>>,
    budget: Duration,
}

impl Shared {
    /// Drain turn by turn until the queue is empty. Returns the number of
    /// mutations that failed.
    fn drain(&self) -> usize {
        let mut failed = 0;
        loop {
            let report = {
                let mut engine = self.engine.lock();
                let mut queue = self.queue.lock();
                queue.drain(&mut engine, self.budget)
            };
            failed += report.failed;
            if report.remaining == 0 {
                return failed;
            }
            thread::yield_now();
        }
    }

    fn run_pending_search(&self) {
        let Some((request, callback)) = self.pending_search.lock().take() else {
            return;
        };
        let result = self.engine.lock().search(request);
        callback(result);
    }
}

fn run(shared: Arc<Shared>, signals: Receiver<Signal>) {
    loop {
        let mut shutdown = matches!(signals.recv(), Ok(Signal::Shutdown) | Err(_));
        // coalesce wake-ups that piled up while draining
        while let Ok(signal) = signals.try_recv() {
            if matches!(signal, Signal::Shutdown) {
                shutdown = true;
            }
        }

        let failed = shared.drain();
        if failed > 0 {
            error!("{failed} deferred mutations failed");
        }
        shared.run_pending_search();

        if shutdown {
            debug!("deferred runner stopped");
            return;
        }
    }
}

/// An [`Engine`] with queued mutations.
pub struct DeferredEngine {
    shared: Arc<Shared>,
    signals: Sender<Signal>,
    runner: Option<JoinHandle<()>>,
}

impl DeferredEngine {
    pub fn new(config: IndexConfig, registry: Arc<Registry>) -> Result<Self> {
        Self::with_budget(config, registry, DEFAULT_BUDGET)
    }

    /// Create a deferred index whose drain turns last at most `budget`.
    pub fn with_budget(
        config: IndexConfig,
        registry: Arc<Registry>,
        budget: Duration,
    ) -> Result<Self> {
        let engine = Engine::new(config, registry)?;
        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
            queue: Mutex::new(TaskQueue::new()),
            pending_search: Mutex::new(None),
            budget,
        });

        let (signals, receiver) = unbounded();
        let runner_shared = Arc::clone(&shared);
        let runner = thread::Builder::new()
            .name("lotus-deferred".to_string())
            .spawn(move || run(runner_shared, receiver))
            .map_err(|e| LotusError::worker(format!("failed to spawn deferred runner: {e}")))?;

        Ok(DeferredEngine {
            shared,
            signals,
            runner: Some(runner),
        })
    }

    fn enqueue(&self, task: Task) -> Result<()> {
        self.shared.queue.lock().push(task);
        self.wake()
    }

    fn wake(&self) -> Result<()> {
        self.signals
            .send(Signal::Wake)
            .map_err(|_| LotusError::worker("deferred runner has stopped"))
    }

    /// Whether `id` will be indexed once the queue is applied.
    fn is_known(&self, id: &DocId) -> bool {
        let queued = self.shared.queue.lock().get(id).cloned();
        match queued {
            Some(Task::Remove { .. }) => false,
            // content that encodes to nothing leaves the id unindexed
            Some(Task::Add { content, .. }) | Some(Task::Update { content, .. }) => self
                .shared
                .engine
                .lock()
                .encode(&content)
                .is_ok_and(|encoded| !encoded.is_empty()),
            None => self.shared.engine.lock().contains(id),
        }
    }

    /// Queue `content` for indexing under `id`.
    pub fn add(&self, id: impl Into<DocId>, content: &str) -> Result<()> {
        let id = id.into();
        if id.is_blank() || content.is_empty() {
            return Ok(());
        }
        self.enqueue(Task::Add {
            id,
            content: content.to_string(),
        })
    }

    /// Queue new content for a known or queued id.
    pub fn update(&self, id: impl Into<DocId>, content: &str) -> Result<bool> {
        let id = id.into();
        if !self.is_known(&id) {
            return Ok(false);
        }
        self.enqueue(Task::Update {
            id,
            content: content.to_string(),
        })?;
        Ok(true)
    }

    /// Queue the removal of a known or queued id.
    pub fn remove(&self, id: impl Into<DocId>) -> Result<bool> {
        let id = id.into();
        if !self.is_known(&id) {
            return Ok(false);
        }
        self.enqueue(Task::Remove { id })?;
        Ok(true)
    }

    /// Apply every queued mutation on the calling thread.
    ///
    /// Mutations that fail are dropped and the rest still apply; the count
    /// of failures is reported as an error.
    pub fn flush(&self) -> Result<()> {
        match self.shared.drain() {
            0 => Ok(()),
            failed => Err(LotusError::analysis(format!(
                "{failed} queued mutations failed"
            ))),
        }
    }

    /// Search the mutations applied so far.
    pub fn search(&self, request: impl Into<SearchRequest>) -> Result<Vec<DocId>> {
        self.shared.engine.lock().search(request)
    }

    /// Run a search on the runner once queued mutations are applied.
    ///
    /// Only the latest callback search is kept: one that has not run yet is
    /// replaced and never called.
    pub fn search_with_callback<F>(
        &self,
        request: impl Into<SearchRequest>,
        callback: F,
    ) -> Result<()>
    where
        F: FnOnce(Result<Vec<DocId>>) + Send + 'static,
    {
        *self.shared.pending_search.lock() = Some((request.into(), Box::new(callback)));
        self.wake()
    }

    /// Number of queued mutations.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn len(&self) -> usize {
        self.shared.engine.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop queued mutations, documents and cached queries.
    pub fn reset(&self) {
        let mut engine = self.shared.engine.lock();
        self.shared.queue.lock().clear();
        engine.reset();
    }

    pub fn info(&self) -> IndexInfo {
        let mut info = self.shared.engine.lock().info();
        info.pending_tasks = self.pending();
        info
    }
}

impl DocumentIndex for DeferredEngine {
    fn add(&mut self, id: DocId, content: &str) -> Result<()> {
        DeferredEngine::add(self, id, content)
    }

    fn update(&mut self, id: DocId, content: &str) -> Result<bool> {
        DeferredEngine::update(self, id, content)
    }

    fn remove(&mut self, id: &DocId) -> Result<bool> {
        DeferredEngine::remove(self, id)
    }

    fn search(&mut self, request: SearchRequest) -> Result<Vec<DocId>> {
        DeferredEngine::search(self, request)
    }

    fn reset(&mut self) -> Result<()> {
        DeferredEngine::reset(self);
        Ok(())
    }

    fn len(&self) -> usize {
        DeferredEngine::len(self)
    }

    fn info(&self) -> Result<IndexInfo> {
        Ok(DeferredEngine::info(self))
    }
}

impl Drop for DeferredEngine {
    fn drop(&mut self) {
        let _ = self.signals.send(Signal::Shutdown);
        if let Some(runner) = self.runner.take() {
            let _ = runner.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::TokenizeMode;

    fn deferred() -> DeferredEngine {
        let config = IndexConfig::builder().mode(TokenizeMode::Strict).build();
        DeferredEngine::new(config, Arc::new(Registry::new())).unwrap()
    }

    #[test]
    fn test_flush_applies_queue() {
        let index = deferred();
        for i in 0..50 {
            index.add(i, &format!("doc{i} shared")).unwrap();
        }
        index.flush().unwrap();

        assert_eq!(index.pending(), 0);
        assert_eq!(index.len(), 50);
        assert_eq!(index.search("doc7").unwrap(), vec![DocId::Int(7)]);
    }

    #[test]
    fn test_remove_of_queued_add() {
        let index = deferred();
        index.add(1, "transient").unwrap();
        assert!(index.remove(1).unwrap());
        index.flush().unwrap();

        assert!(index.search("transient").unwrap().is_empty());
        assert!(!index.remove(2).unwrap());
    }

    #[test]
    fn test_callback_search_sees_queued_mutations() {
        let index = deferred();
        index.add(1, "eventually visible").unwrap();

        let (tx, rx) = crossbeam_channel::bounded(1);
        index
            .search_with_callback("visible", move |result| {
                let _ = tx.send(result);
            })
            .unwrap();

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(result, vec![DocId::Int(1)]);
    }

    #[test]
    fn test_reset_drops_queue() {
        let index = deferred();
        for i in 0..20 {
            index.add(i, "queued").unwrap();
        }
        index.reset();
        index.flush().unwrap();

        assert!(index.is_empty());
        assert_eq!(index.info().pending_tasks, 0);
    }
}
