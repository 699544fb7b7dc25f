//! State persistence for suspended chains.
//!
//! This module provides:
//! - The [`store::StateStore`] contract and its stored record
//! - An in-memory store and a file-backed store
//! - Chain lifecycle transitions
//! - A background sweeper for expired entries

pub mod error;
pub mod file;
pub mod lease;
pub mod lifecycle;
pub mod memory;
pub mod store;
pub mod sweeper;

pub use error::{StateError, StateResult};
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use store::{StateEntry, StateStore};
