//! Index split over shard threads.
//!
//! Documents are placed on shards round robin and the placement is recorded,
//! so updates and removals reach the shard holding the document. Searches
//! are broadcast to every shard; a collector thread merges the replies in
//! arrival order until every shard has answered or the limit is reached.
//! Each search carries a ticket and only replies for the current ticket are
//! merged, so answers to a superseded search are dropped on arrival.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, trace};
use parking_lot::{Condvar, Mutex};

use crate::analysis::encoder::Encoder;
use crate::analysis::pipeline::EncodePipeline;
use crate::analysis::registry::Registry;
use crate::cache::FrequencyCache;
use crate::data::DocId;
use crate::engine::config::IndexConfig;
use crate::engine::search::SearchRequest;
use crate::engine::{DocumentIndex, IndexInfo, SearchCallback};
use crate::error::{LotusError, Result};
use crate::store::document::{DocumentRegistry, Placement};
use crate::worker::protocol::{SearchReply, WorkerRequest, WorkerResponse};
use crate::worker::shard::ShardHandle;

/// How long a blocking call waits for shard replies.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Merge state of the search in flight.
#[derive(Default)]
struct Collection {
    ticket: u64,
    query: String,
    limit: usize,
    replies: usize,
    result: Vec<DocId>,
    error: Option<String>,
    callback: Option<SearchCallback>,
    finished: Option<std::result::Result<Vec<DocId>, String>>,
    done: bool,
}

struct Shared {
    collection: Mutex<Collection>,
    ready: Condvar,
    cache: Mutex<Option<FrequencyCache<Vec<DocId>>>>,
    shard_count: usize,
}

impl Shared {
    /// Merge one reply. Returns the callback to run when the reply completed
    /// a callback search.
    fn accept(
        &self,
        reply: SearchReply,
    ) -> Option<(SearchCallback, std::result::Result<Vec<DocId>, String>)> {
        let mut collection = self.collection.lock();
        if reply.ticket != collection.ticket || collection.done {
            trace!(
                "discarding reply of shard {} for ticket {}",
                reply.shard_id, reply.ticket
            );
            return None;
        }

        collection.replies += 1;
        if collection.error.is_none() {
            collection.error = reply.error;
        }
        let room = collection.limit.saturating_sub(collection.result.len());
        collection.result.extend(reply.result.into_iter().take(room));

        if collection.replies < self.shard_count && collection.result.len() < collection.limit {
            return None;
        }

        collection.done = true;
        let outcome = match collection.error.take() {
            Some(message) => Err(message),
            None => Ok(std::mem::take(&mut collection.result)),
        };
        if let (Ok(result), Some(cache)) = (&outcome, self.cache.lock().as_mut()) {
            cache.set(collection.query.clone(), result.clone());
        }

        match collection.callback.take() {
            Some(callback) => Some((callback, outcome)),
            None => {
                collection.finished = Some(outcome);
                self.ready.notify_all();
                None
            }
        }
    }
}

fn collect(
    shared: Arc<Shared>,
    responses: Receiver<WorkerResponse>,
    infos: Sender<(usize, IndexInfo)>,
) {
    for response in responses.iter() {
        match response {
            WorkerResponse::Search(reply) => {
                if let Some((callback, outcome)) = shared.accept(reply) {
                    callback(outcome.map_err(LotusError::worker));
                }
            }
            WorkerResponse::Info { shard_id, info } => {
                if infos.send((shard_id, info)).is_err() {
                    error!("info reply of shard {shard_id} has no receiver");
                }
            }
        }
    }
    debug!("collector stopped");
}

/// An index spread over shard threads.
pub struct ShardedEngine {
    config: IndexConfig,
    pipeline: EncodePipeline,
    shards: Vec<ShardHandle>,
    documents: Mutex<DocumentRegistry>,
    next_shard: AtomicUsize,
    next_ticket: AtomicU64,
    shared: Arc<Shared>,
    search_lock: Mutex<()>,
    infos: Mutex<Receiver<(usize, IndexInfo)>>,
    collector: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl ShardedEngine {
    /// Start `shards` shard threads, each with its own index built from
    /// `config` with the query cache disabled.
    pub fn new(config: IndexConfig, registry: Arc<Registry>, shards: usize) -> Result<Self> {
        if shards == 0 {
            return Err(LotusError::invalid_argument(
                "a sharded index needs at least one shard",
            ));
        }
        let settings = config.resolve(&registry)?;

        let shared = Arc::new(Shared {
            collection: Mutex::new(Collection::default()),
            ready: Condvar::new(),
            cache: Mutex::new(settings.cache.capacity().map(FrequencyCache::new)),
            shard_count: shards,
        });

        let (responses_tx, responses_rx) = unbounded();
        let (infos_tx, infos_rx) = unbounded();

        let mut handles = Vec::with_capacity(shards);
        for shard_id in 0..shards {
            let handle = ShardHandle::spawn(shard_id, Arc::clone(&registry), responses_tx.clone())?;
            handle.register(&config)?;
            handles.push(handle);
        }
        drop(responses_tx);

        let collector_shared = Arc::clone(&shared);
        let collector = thread::Builder::new()
            .name("lotus-collector".to_string())
            .spawn(move || collect(collector_shared, responses_rx, infos_tx))
            .map_err(|e| LotusError::worker(format!("failed to spawn collector: {e}")))?;

        debug!("started {shards} shards");

        Ok(ShardedEngine {
            config,
            pipeline: settings.pipeline,
            shards: handles,
            documents: Mutex::new(DocumentRegistry::new()),
            next_shard: AtomicUsize::new(0),
            next_ticket: AtomicU64::new(0),
            shared,
            search_lock: Mutex::new(()),
            infos: Mutex::new(infos_rx),
            collector: Some(collector),
            timeout: DEFAULT_REPLY_TIMEOUT,
        })
    }

    /// Set how long blocking calls wait for shard replies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard holding `id`, if known.
    pub fn placement(&self, id: &DocId) -> Option<usize> {
        match self.documents.lock().get(id) {
            Some(Placement::Shard(shard)) => Some(shard),
            _ => None,
        }
    }

    /// Whether `content` leaves anything to index once encoded.
    fn indexable(&self, content: &str) -> Result<bool> {
        if content.is_empty() {
            return Ok(false);
        }
        Ok(!self.pipeline.encode(content)?.is_empty())
    }

    /// Index `content` under `id` on the next shard in turn. A known id stays
    /// on its shard; content that encodes to nothing removes it instead.
    pub fn add(&self, id: impl Into<DocId>, content: &str) -> Result<()> {
        let id = id.into();
        if id.is_blank() {
            return Ok(());
        }
        if !self.indexable(content)? {
            self.remove(id)?;
            return Ok(());
        }

        let mut documents = self.documents.lock();
        let shard = match documents.get(&id) {
            Some(Placement::Shard(shard)) => shard,
            _ => self.next_shard.fetch_add(1, Ordering::Relaxed) % self.shards.len(),
        };
        self.shards[shard].send(WorkerRequest::Add {
            id: id.clone(),
            content: content.to_string(),
        })?;
        documents.insert(id, Placement::Shard(shard));
        Ok(())
    }

    pub fn update(&self, id: impl Into<DocId>, content: &str) -> Result<bool> {
        let id = id.into();
        let mut documents = self.documents.lock();
        let Some(Placement::Shard(shard)) = documents.get(&id) else {
            return Ok(false);
        };
        if !self.indexable(content)? {
            documents.remove(&id);
            self.shards[shard].send(WorkerRequest::Remove { id })?;
            return Ok(true);
        }
        self.shards[shard].send(WorkerRequest::Update {
            id: id.clone(),
            content: content.to_string(),
        })?;
        documents.insert(id, Placement::Shard(shard));
        Ok(true)
    }

    pub fn remove(&self, id: impl Into<DocId>) -> Result<bool> {
        let id = id.into();
        let mut documents = self.documents.lock();
        let Some(Placement::Shard(shard)) = documents.remove(&id) else {
            return Ok(false);
        };
        self.shards[shard].send(WorkerRequest::Remove { id })?;
        Ok(true)
    }

    /// Cached result for `query`, emptying the cache first if documents
    /// changed since the last search.
    fn cached(&self, query: &str) -> Option<Vec<DocId>> {
        let dirty = self.documents.lock().take_dirty();
        let mut cache = self.shared.cache.lock();
        let cache = cache.as_mut()?;
        if dirty {
            cache.reset();
            None
        } else {
            cache.get(query).cloned()
        }
    }

    /// Start a new collection and broadcast the search. Any collection still
    /// in flight is abandoned, callback included.
    fn broadcast(&self, request: &SearchRequest, callback: Option<SearchCallback>) -> Result<u64> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        let limit = request.effective_limit();

        *self.shared.collection.lock() = Collection {
            ticket,
            query: request.query.clone(),
            limit,
            callback,
            ..Collection::default()
        };

        for shard in &self.shards {
            shard.send(WorkerRequest::Search {
                ticket,
                query: request.query.clone(),
                limit,
                threshold: request.threshold,
            })?;
        }
        Ok(ticket)
    }

    /// Search every shard and wait for the merged result.
    pub fn search(&self, request: impl Into<SearchRequest>) -> Result<Vec<DocId>> {
        let request = request.into();
        if request.query.is_empty() {
            return Ok(Vec::new());
        }

        let _serial = self.search_lock.lock();
        if let Some(hit) = self.cached(&request.query) {
            return Ok(hit);
        }

        let ticket = self.broadcast(&request, None)?;
        let deadline = Instant::now() + self.timeout;

        let mut collection = self.shared.collection.lock();
        loop {
            if collection.ticket == ticket {
                if let Some(outcome) = collection.finished.take() {
                    return outcome.map_err(LotusError::worker);
                }
            }
            if self
                .shared
                .ready
                .wait_until(&mut collection, deadline)
                .timed_out()
            {
                return Err(LotusError::worker(format!(
                    "shards did not answer {:?} within {:?}",
                    request.query, self.timeout
                )));
            }
        }
    }

    /// Search every shard and hand the merged result to `callback` on the
    /// collector thread.
    ///
    /// Only the latest callback is kept: starting another callback search
    /// before this one completes drops it without calling it.
    ///
    /// A cached result is handed over on the calling thread after the search
    /// lock is released, so the callback may search this index again. A
    /// callback run on the collector thread must not block on a search of
    /// this index, since that search waits for the collector.
    pub fn search_with_callback<F>(
        &self,
        request: impl Into<SearchRequest>,
        callback: F,
    ) -> Result<()>
    where
        F: FnOnce(Result<Vec<DocId>>) + Send + 'static,
    {
        let request = request.into();
        if request.query.is_empty() {
            callback(Ok(Vec::new()));
            return Ok(());
        }

        let hit = {
            let _serial = self.search_lock.lock();
            match self.cached(&request.query) {
                Some(hit) => hit,
                None => {
                    self.broadcast(&request, Some(Box::new(callback)))?;
                    return Ok(());
                }
            }
        };
        callback(Ok(hit));
        Ok(())
    }

    /// Statistics of every shard, ordered by shard id.
    pub fn shard_info(&self) -> Result<Vec<IndexInfo>> {
        let infos = self.infos.lock();
        // replies left over from a timed-out call
        while infos.try_recv().is_ok() {}

        for shard in &self.shards {
            shard.send(WorkerRequest::Info)?;
        }

        let deadline = Instant::now() + self.timeout;
        let mut collected: Vec<Option<IndexInfo>> = vec![None; self.shards.len()];
        for _ in 0..self.shards.len() {
            let (shard_id, info) = infos.recv_deadline(deadline).map_err(|_| {
                LotusError::worker(format!("shards did not report within {:?}", self.timeout))
            })?;
            if let Some(slot) = collected.get_mut(shard_id) {
                *slot = Some(info);
            }
        }

        collected
            .into_iter()
            .enumerate()
            .map(|(shard_id, info)| {
                info.ok_or_else(|| LotusError::worker(format!("shard {shard_id} did not report")))
            })
            .collect()
    }

    /// Combined statistics of every shard.
    pub fn info(&self) -> Result<IndexInfo> {
        let shards = self.shard_info()?;
        let mut info = shards.first().cloned().unwrap_or_default();
        for other in shards.iter().skip(1) {
            info.merge(other);
        }

        let documents = self.documents.lock();
        info.items = documents.len();
        info.clean = documents.is_clean();
        info.workers = self.shards.len();
        info.cached_queries = self.shared.cache.lock().as_ref().map_or(0, FrequencyCache::len);
        Ok(info)
    }

    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear every shard, the placements and the cache.
    pub fn reset(&self) -> Result<()> {
        let mut documents = self.documents.lock();
        for shard in &self.shards {
            shard.send(WorkerRequest::Reset)?;
        }
        documents.clear();
        if let Some(cache) = self.shared.cache.lock().as_mut() {
            cache.reset();
        }
        Ok(())
    }
}

impl DocumentIndex for ShardedEngine {
    fn add(&mut self, id: DocId, content: &str) -> Result<()> {
        ShardedEngine::add(self, id, content)
    }

    fn update(&mut self, id: DocId, content: &str) -> Result<bool> {
        ShardedEngine::update(self, id, content)
    }

    fn remove(&mut self, id: &DocId) -> Result<bool> {
        ShardedEngine::remove(self, id)
    }

    fn search(&mut self, request: SearchRequest) -> Result<Vec<DocId>> {
        ShardedEngine::search(self, request)
    }

    fn reset(&mut self) -> Result<()> {
        ShardedEngine::reset(self)
    }

    fn len(&self) -> usize {
        ShardedEngine::len(self)
    }

    fn info(&self) -> Result<IndexInfo> {
        ShardedEngine::info(self)
    }
}

impl Drop for ShardedEngine {
    fn drop(&mut self) {
        for shard in self.shards.iter_mut() {
            shard.shutdown();
        }
        if let Some(collector) = self.collector.take() {
            let _ = collector.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::TokenizeMode;

    fn sharded(shards: usize) -> ShardedEngine {
        let config = IndexConfig::builder().mode(TokenizeMode::Strict).build();
        ShardedEngine::new(config, Arc::new(Registry::new()), shards)
            .unwrap()
            .with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn test_round_robin_placement() {
        let index = sharded(3);
        for i in 0..6 {
            index.add(i, "spread").unwrap();
        }
        assert_eq!(index.placement(&DocId::Int(0)), Some(0));
        assert_eq!(index.placement(&DocId::Int(4)), Some(1));

        index.update(4, "moved content").unwrap();
        assert_eq!(index.placement(&DocId::Int(4)), Some(1));
    }

    #[test]
    fn test_zero_shards_rejected() {
        let result = ShardedEngine::new(IndexConfig::default(), Arc::new(Registry::new()), 0);
        assert!(matches!(result, Err(LotusError::InvalidArgument(_))));
    }

    #[test]
    fn test_merged_search() {
        let index = sharded(2);
        index.add(1, "common alpha").unwrap();
        index.add(2, "common beta").unwrap();
        index.add(3, "common gamma").unwrap();

        let mut result = index.search("common").unwrap();
        result.sort();
        assert_eq!(result, vec![DocId::Int(1), DocId::Int(2), DocId::Int(3)]);
        assert_eq!(index.search(SearchRequest::new("common").with_limit(2)).unwrap().len(), 2);
        assert_eq!(index.search("beta").unwrap(), vec![DocId::Int(2)]);
    }

    #[test]
    fn test_empty_content_drops_placement() {
        let config = IndexConfig::builder()
            .mode(TokenizeMode::Strict)
            .encode("simple")
            .build();
        let index = ShardedEngine::new(config, Arc::new(Registry::new()), 2)
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        index.add(1, "apple").unwrap();
        index.add(2, "pear").unwrap();

        assert!(index.update(1, "").unwrap());
        assert_eq!(index.placement(&DocId::Int(1)), None);
        assert_eq!(index.len(), 1);
        assert!(index.search("apple").unwrap().is_empty());
        assert!(!index.remove(1).unwrap());

        index.add(2, "?!").unwrap();
        assert_eq!(index.placement(&DocId::Int(2)), None);
        assert!(index.is_empty());
        assert!(index.search("pear").unwrap().is_empty());

        index.add(3, "").unwrap();
        assert_eq!(index.placement(&DocId::Int(3)), None);
    }

    #[test]
    fn test_shard_info() {
        let index = sharded(2);
        index.add(1, "one").unwrap();
        index.add(2, "two").unwrap();
        index.add(3, "three").unwrap();

        let shards = index.shard_info().unwrap();
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].items, 2);
        assert_eq!(shards[1].items, 1);

        let info = index.info().unwrap();
        assert_eq!(info.items, 3);
        assert_eq!(info.workers, 2);
    }
}
