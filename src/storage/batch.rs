//! Atomic multi-key writes
//!
//! A [`WriteBatch`] buffers puts and deletes in memory. Nothing reaches the
//! engine until it is handed to [`KvStore::write_batch`](super::KvStore::write_batch),
//! which applies every operation or none of them.

use crate::core::key::TemporalKey;
use crate::core::value::Value;
use crate::error::Result;

/// A buffered operation, already in packed form
#[derive(Debug, Clone)]
pub(crate) enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Puts and deletes applied together
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a put. Fails immediately if the key cannot be packed.
    pub fn put(&mut self, key: &TemporalKey, value: &Value) -> Result<&mut Self> {
        self.ops.push(BatchOp::Put {
            key: key.pack()?,
            value: value.encode(),
        });
        Ok(self)
    }

    /// Buffer removal of one exact key
    pub fn delete(&mut self, key: &TemporalKey) -> Result<&mut Self> {
        self.ops.push(BatchOp::Delete { key: key.pack()? });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn into_sled(self) -> sled::Batch {
        let mut batch = sled::Batch::default();
        for op in self.ops {
            match op {
                BatchOp::Put { key, value } => batch.insert(key, value),
                BatchOp::Delete { key } => batch.remove(key),
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_buffers_ops() {
        let key = TemporalKey::new(0, b"a".to_vec(), 1, 1).unwrap();
        let mut batch = WriteBatch::new();
        assert!(batch.is_empty());

        batch.put(&key, &Value::Raw(b"1".to_vec())).unwrap();
        batch.delete(&key).unwrap();
        assert_eq!(batch.len(), 2);
    }
}
