//! Graph overlay: directed edges stored as ordinary temporal entries
//!
//! Edges live in [`EDGE_PARTITION`] under the user key
//! `source || 0x00 || destination`, with their properties stored as a JSON
//! value. Every write is a new version; nothing here resolves versions, so
//! callers wanting "latest as of" pick the greatest `(valid_from, tx_id)`.

pub mod edge;

pub use edge::{Edge, NodeId, NODE_SEPARATOR};

use crate::core::key::TemporalKey;
use crate::core::value::Value;
use crate::error::{Error, Result};
use crate::storage::{Items, KvStore};
use std::sync::Arc;
use tracing::debug;

/// Partition reserved for edges
pub const EDGE_PARTITION: u32 = 1;

/// Directed-edge view over a [`KvStore`]
#[derive(Debug, Clone)]
pub struct Graph {
    store: Arc<KvStore>,
}

impl Graph {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }

    /// Key under which one version of an edge is stored
    pub fn edge_key(
        source: &[u8],
        destination: &[u8],
        valid_from: u64,
        tx_id: u64,
    ) -> Result<TemporalKey> {
        let user_key = edge::encode_user_key(source, destination)?;
        TemporalKey::new(EDGE_PARTITION, user_key, valid_from, tx_id)
    }

    /// Store one version of `edge`
    pub fn put_edge(&self, edge: &Edge, valid_from: u64, tx_id: u64) -> Result<TemporalKey> {
        let key = Self::edge_key(&edge.source, &edge.destination, valid_from, tx_id)?;
        let value = Value::json(&edge.properties)?;
        self.store.put(&key, &value)?;
        debug!(valid_from, tx_id, "put edge");
        Ok(key)
    }

    /// Store one version of `edge`, stamping `tx_id` from the store's clock
    pub fn record_edge(&self, edge: &Edge, valid_from: u64) -> Result<TemporalKey> {
        self.put_edge(edge, valid_from, self.store.now_ts())
    }

    /// Every stored version of edges leaving `node` with `valid_from <= as_of_valid`
    pub fn out_edges(&self, node: &[u8], as_of_valid: u64) -> OutEdges {
        OutEdges {
            items: self.store.partition_items(EDGE_PARTITION),
            node: node.to_vec(),
            as_of_valid,
        }
    }

    /// All versions of one edge, ordered by `(valid_from, tx_id)`
    pub fn edge_versions(
        &self,
        source: &[u8],
        destination: &[u8],
    ) -> Result<Vec<(TemporalKey, Edge)>> {
        let user_key = edge::encode_user_key(source, destination)?;
        self.store
            .versions(EDGE_PARTITION, &user_key)?
            .into_iter()
            .map(|(key, value)| {
                let edge = decode_edge(&key, &value)?;
                Ok((key, edge))
            })
            .collect()
    }
}

fn decode_edge(key: &TemporalKey, value: &Value) -> Result<Edge> {
    let (source, destination) = edge::decode_user_key(&key.user_key)?;
    let payload = match value {
        Value::Json(payload) => payload,
        Value::Raw(_) => {
            return Err(Error::Decode(format!("edge {} stored with raw tag", key)));
        }
    };
    Ok(Edge {
        source: source.to_vec(),
        destination: destination.to_vec(),
        properties: edge::decode_properties(payload)?,
    })
}

/// Lazy filter over the edge partition
pub struct OutEdges {
    items: Items,
    node: Vec<u8>,
    as_of_valid: u64,
}

impl Iterator for OutEdges {
    type Item = Result<Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, value) = match self.items.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e)),
            };
            if key.valid_from > self.as_of_valid {
                continue;
            }
            let source = match edge::decode_user_key(&key.user_key) {
                Ok((source, _)) => source,
                Err(e) => return Some(Err(e)),
            };
            if source != self.node.as_slice() {
                continue;
            }
            return Some(decode_edge(&key, &value));
        }
    }
}
