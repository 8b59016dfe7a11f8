//! Directed edges and their user-key encoding

use crate::error::{Error, Result};
use serde_json::{Map, Value as JsonValue};

/// Byte separating source and destination inside an edge's user key
pub const NODE_SEPARATOR: u8 = 0x00;

/// Opaque node identifier
pub type NodeId = Vec<u8>;

/// Directed edge with JSON properties
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: NodeId,
    pub destination: NodeId,
    pub properties: Map<String, JsonValue>,
}

impl Edge {
    pub fn new(
        source: impl Into<NodeId>,
        destination: impl Into<NodeId>,
        properties: Map<String, JsonValue>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            properties,
        }
    }

    /// Edge without properties
    pub fn bare(source: impl Into<NodeId>, destination: impl Into<NodeId>) -> Self {
        Self::new(source, destination, Map::new())
    }

    /// Property lookup
    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name)
    }
}

/// `source || 0x00 || destination`, rejecting ids that contain the separator
pub(crate) fn encode_user_key(source: &[u8], destination: &[u8]) -> Result<Vec<u8>> {
    check_node_id("source", source)?;
    check_node_id("destination", destination)?;

    let mut user_key = Vec::with_capacity(source.len() + 1 + destination.len());
    user_key.extend_from_slice(source);
    user_key.push(NODE_SEPARATOR);
    user_key.extend_from_slice(destination);
    Ok(user_key)
}

/// Split an edge user key at the first separator
pub(crate) fn decode_user_key(user_key: &[u8]) -> Result<(&[u8], &[u8])> {
    let at = user_key
        .iter()
        .position(|&b| b == NODE_SEPARATOR)
        .ok_or_else(|| Error::Decode("edge key has no node separator".to_string()))?;
    Ok((&user_key[..at], &user_key[at + 1..]))
}

/// Parse stored properties, which must be a JSON object
pub(crate) fn decode_properties(payload: &[u8]) -> Result<Map<String, JsonValue>> {
    match serde_json::from_slice::<JsonValue>(payload)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(Error::Decode(format!(
            "edge properties must be a JSON object, found {}",
            other
        ))),
    }
}

fn check_node_id(role: &str, id: &[u8]) -> Result<()> {
    if id.contains(&NODE_SEPARATOR) {
        return Err(Error::InvalidNodeId(format!(
            "{} node id contains the reserved 0x{:02x} byte",
            role, NODE_SEPARATOR
        )));
    }
    Ok(())
}
