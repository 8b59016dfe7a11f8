//! Typed value codec
//!
//! Stored values are a one-byte type tag followed by the payload. The codec
//! never inspects JSON payloads; parsing happens only when a consumer asks
//! for it.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Type tag written in front of every stored payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueTag {
    Raw = 0x00,
    Json = 0x01,
}

impl TryFrom<u8> for ValueTag {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(ValueTag::Raw),
            0x01 => Ok(ValueTag::Json),
            other => Err(Error::Decode(format!("unknown value type tag 0x{:02x}", other))),
        }
    }
}

/// Stored payload together with its declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Opaque bytes
    Raw(Vec<u8>),
    /// Bytes the caller guarantees to be a JSON document
    Json(Vec<u8>),
}

impl Value {
    /// Serialize `value` to JSON and wrap it
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Value::Json(serde_json::to_vec(value)?))
    }

    /// Deserialize the payload as JSON, whatever the tag
    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(self.payload())?)
    }

    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Raw(_) => ValueTag::Raw,
            Value::Json(_) => ValueTag::Json,
        }
    }

    pub fn payload(&self) -> &[u8] {
        match self {
            Value::Raw(payload) | Value::Json(payload) => payload,
        }
    }

    pub fn into_payload(self) -> Vec<u8> {
        match self {
            Value::Raw(payload) | Value::Json(payload) => payload,
        }
    }

    /// Tag byte followed by the payload
    pub fn encode(&self) -> Vec<u8> {
        let payload = self.payload();
        let mut buf = Vec::with_capacity(1 + payload.len());
        buf.push(self.tag() as u8);
        buf.extend_from_slice(payload);
        buf
    }

    /// Inverse of [`Value::encode`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, payload) = bytes
            .split_first()
            .ok_or_else(|| Error::Decode("empty value buffer".to_string()))?;

        let payload = payload.to_vec();
        Ok(match ValueTag::try_from(tag)? {
            ValueTag::Raw => Value::Raw(payload),
            ValueTag::Json => Value::Json(payload),
        })
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Raw(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Raw(bytes.to_vec())
    }
}
