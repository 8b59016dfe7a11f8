//! Storage layer: the key-value facade over the embedded engine

pub mod batch;
pub mod store;

pub use batch::WriteBatch;
pub use store::{Items, KvStore};
