//! Document bookkeeping shared by every index flavour.

pub mod document;

pub use document::{DocumentRegistry, Placement};
