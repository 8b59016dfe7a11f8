//! Temporal-KV: bitemporal key-value store
//!
//! Every fact is addressed by a [`TemporalKey`](core::TemporalKey): a
//! partition, an application key, the valid time at which the fact became
//! true, and the transaction id at which it was recorded. Corrections are new
//! versions, so both "what was true at T" and "what did we believe at tx X"
//! stay answerable.
//!
//! # Core Concepts
//!
//! - **Temporal keys**: packed big-endian so the engine's byte order is the
//!   temporal order
//! - **Typed values**: raw bytes or JSON, tagged with one byte
//! - **Clocks**: injected timestamp sources for transaction ids
//! - **Graph overlay**: directed edges stored as ordinary temporal entries
//!
//! # Example
//!
//! ```no_run
//! use temporal_kv::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example() -> temporal_kv::error::Result<()> {
//! let store = KvStore::open(&StoreConfig::new("./data"), Arc::new(MonotonicClock::new()))?;
//!
//! let key = TemporalKey::new(0, b"user:1".to_vec(), 1_000, 1)?;
//! store.put(&key, &Value::Raw(b"active".to_vec()))?;
//! assert_eq!(store.get(&key)?, Some(Value::Raw(b"active".to_vec())));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod graph;
pub mod storage;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::StoreConfig;
    pub use crate::core::*;
    pub use crate::error::{Error, Result};
    pub use crate::graph::{Edge, Graph, EDGE_PARTITION};
    pub use crate::storage::*;
}
