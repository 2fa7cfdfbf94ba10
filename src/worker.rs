//! Sharded execution over worker threads.
//!
//! Each shard owns a private [`Engine`](crate::engine::Engine) on its own
//! thread and talks to the pool through typed messages.
//!
//! # Module Structure
//!
//! - `protocol`: request and response messages
//! - `shard`: a shard thread and its handle
//! - `pool`: `ShardedEngine`, placement and result merging

pub mod pool;
pub mod protocol;
pub mod shard;

pub use pool::ShardedEngine;
pub use protocol::{SearchReply, WorkerRequest, WorkerResponse};
pub use shard::ShardHandle;
