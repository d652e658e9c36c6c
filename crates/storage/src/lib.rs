//! Store abstraction and implementations for propagation tracking.
//!
//! This crate provides a trait-based key-value store interface with an
//! in-memory reference implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory;

pub use trait_::{KeyValueStore, StoreError, Result};
pub use memory::MemoryStore;
