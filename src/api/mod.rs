//! Boundary adapter for transport layers
//!
//! Transports address entries with a single URL-safe base64 key and move
//! raw bytes as URL-safe base64 text. Every such entry lives in partition 0
//! with `valid_from` and `tx_id` fixed at zero.

use crate::core::key::TemporalKey;
use crate::core::value::Value;
use crate::error::Result;
use crate::storage::KvStore;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use std::sync::Arc;

/// Partition used for untimed boundary access
pub const UNTIMED_PARTITION: u32 = 0;

/// URL-safe alphabet, padded on output, padding optional on input
const BOUNDARY_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes for the boundary
pub fn encode_b64(bytes: &[u8]) -> String {
    BOUNDARY_B64.encode(bytes)
}

/// Decode boundary text to bytes
pub fn decode_b64(text: &str) -> Result<Vec<u8>> {
    Ok(BOUNDARY_B64.decode(text)?)
}

/// Untimed key for a base64-encoded user key
pub fn untimed_key(encoded_key: &str) -> Result<TemporalKey> {
    TemporalKey::untimed(UNTIMED_PARTITION, decode_b64(encoded_key)?)
}

/// Single-partition, untimed view of a [`KvStore`]
#[derive(Debug, Clone)]
pub struct UntimedKv {
    store: Arc<KvStore>,
}

impl UntimedKv {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self { store }
    }

    /// Base64 payload stored under `encoded_key`, if any
    pub fn get(&self, encoded_key: &str) -> Result<Option<String>> {
        let key = untimed_key(encoded_key)?;
        Ok(self.store.get(&key)?.map(|value| encode_b64(value.payload())))
    }

    /// Store the decoded `encoded_value` as raw bytes
    pub fn put(&self, encoded_key: &str, encoded_value: &str) -> Result<()> {
        let key = untimed_key(encoded_key)?;
        let value = Value::Raw(decode_b64(encoded_value)?);
        self.store.put(&key, &value)
    }

    /// Remove the entry. Returns whether it existed.
    pub fn delete(&self, encoded_key: &str) -> Result<bool> {
        self.store.delete(&untimed_key(encoded_key)?)
    }
}
