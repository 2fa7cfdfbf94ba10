//! A shard: one thread owning one [`Engine`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, warn};

use crate::analysis::registry::Registry;
use crate::engine::Engine;
use crate::engine::config::{CacheSetting, IndexConfig};
use crate::engine::search::SearchRequest;
use crate::error::{LotusError, Result};
use crate::worker::protocol::{SearchReply, WorkerRequest, WorkerResponse};

/// Handle to a running shard thread.
#[derive(Debug)]
pub struct ShardHandle {
    shard_id: usize,
    requests: Sender<WorkerRequest>,
    thread: Option<JoinHandle<()>>,
}

impl ShardHandle {
    /// Start shard `shard_id`. It answers on `responses` and stays idle until
    /// it receives [`WorkerRequest::Register`].
    pub fn spawn(
        shard_id: usize,
        registry: Arc<Registry>,
        responses: Sender<WorkerResponse>,
    ) -> Result<Self> {
        let (requests, receiver) = unbounded();
        let thread = thread::Builder::new()
            .name(format!("lotus-shard-{shard_id}"))
            .spawn(move || serve(shard_id, registry, receiver, responses))
            .map_err(|e| LotusError::worker(format!("failed to spawn shard {shard_id}: {e}")))?;

        Ok(ShardHandle {
            shard_id,
            requests,
            thread: Some(thread),
        })
    }

    pub fn shard_id(&self) -> usize {
        self.shard_id
    }

    pub fn send(&self, request: WorkerRequest) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| LotusError::worker(format!("shard {} has stopped", self.shard_id)))
    }

    /// Send the registration message, forcing the shard-local settings.
    pub fn register(&self, config: &IndexConfig) -> Result<()> {
        let mut config = config.clone();
        config.cache = CacheSetting::Disabled;
        config.worker = None;
        config.deferred = false;
        self.send(WorkerRequest::Register {
            shard_id: self.shard_id,
            config,
        })
    }

    /// Stop the shard and wait for its thread. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.requests.send(WorkerRequest::Shutdown);
            if thread.join().is_err() {
                error!("shard {} panicked", self.shard_id);
            }
        }
    }
}

impl Drop for ShardHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(
    shard_id: usize,
    registry: Arc<Registry>,
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
) {
    let mut engine: Option<Engine> = None;

    for request in requests.iter() {
        match request {
            WorkerRequest::Register { config, .. } => {
                match Engine::new(config, Arc::clone(&registry)) {
                    Ok(built) => {
                        debug!("shard {shard_id} registered");
                        engine = Some(built);
                    }
                    Err(err) => error!("shard {shard_id} failed to register: {err}"),
                }
            }
            WorkerRequest::Shutdown => break,
            request => match engine.as_mut() {
                Some(engine) => handle(shard_id, engine, request, &responses),
                None => warn!("shard {shard_id} dropped a request received before registration"),
            },
        }
    }

    debug!("shard {shard_id} stopped");
}

fn handle(
    shard_id: usize,
    engine: &mut Engine,
    request: WorkerRequest,
    responses: &Sender<WorkerResponse>,
) {
    let response = match request {
        WorkerRequest::Add { id, content } => {
            if let Err(err) = engine.add(id, &content) {
                error!("shard {shard_id} failed to add: {err}");
            }
            None
        }
        WorkerRequest::Update { id, content } => {
            if let Err(err) = engine.update(id, &content) {
                error!("shard {shard_id} failed to update: {err}");
            }
            None
        }
        WorkerRequest::Remove { id } => {
            if let Err(err) = engine.remove(id) {
                error!("shard {shard_id} failed to remove: {err}");
            }
            None
        }
        WorkerRequest::Search {
            ticket,
            query,
            limit,
            threshold,
        } => {
            let request = SearchRequest {
                query: query.clone(),
                limit: Some(limit),
                threshold,
            };
            let (result, error) = match engine.search(request) {
                Ok(result) => (result, None),
                Err(err) => (Vec::new(), Some(err.to_string())),
            };
            Some(WorkerResponse::Search(SearchReply {
                shard_id,
                ticket,
                query,
                limit,
                result,
                error,
            }))
        }
        WorkerRequest::Reset => {
            engine.reset();
            None
        }
        WorkerRequest::Info => Some(WorkerResponse::Info {
            shard_id,
            info: engine.info(),
        }),
        WorkerRequest::Register { .. } | WorkerRequest::Shutdown => None,
    };

    if let Some(response) = response {
        if responses.send(response).is_err() {
            error!("shard {shard_id} lost its reply channel");
        }
    }
}
