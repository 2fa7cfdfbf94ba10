//! Background maintenance of an index.
//!
//! # Module Structure
//!
//! - `task_queue`: FIFO mutation queue with a time-budgeted drain

pub mod task_queue;

pub use task_queue::{DrainReport, Task, TaskQueue};
