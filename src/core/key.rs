//! Temporal key: the packed, ordered address of every stored fact
//!
//! Packed layout, all integers big-endian:
//!
//! ```text
//! [partition:4][user_key_len:4][valid_from:8][tx_id:8][user_key...]
//! ```
//!
//! Big-endian fixed-width integers make the engine's byte-wise key order
//! agree with numeric order on partition, key length, valid time and
//! transaction id.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the fixed header preceding the user key bytes
pub const HEADER_SIZE: usize = 24;

/// Fully specified bitemporal key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalKey {
    /// Namespace discriminator
    pub partition: u32,
    /// Application-chosen key, shared by all versions of one entity
    pub user_key: Vec<u8>,
    /// When the fact became true, microseconds
    pub valid_from: u64,
    /// When the fact was recorded
    pub tx_id: u64,
}

impl TemporalKey {
    /// Create a key, rejecting user keys longer than the length field allows
    pub fn new(
        partition: u32,
        user_key: impl Into<Vec<u8>>,
        valid_from: u64,
        tx_id: u64,
    ) -> Result<Self> {
        let user_key = user_key.into();
        check_user_key_len(user_key.len())?;
        Ok(Self {
            partition,
            user_key,
            valid_from,
            tx_id,
        })
    }

    /// Key with `valid_from` and `tx_id` both zero
    pub fn untimed(partition: u32, user_key: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(partition, user_key, 0, 0)
    }

    /// Serialize to the packed layout
    pub fn pack(&self) -> Result<Vec<u8>> {
        let len = check_user_key_len(self.user_key.len())?;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.user_key.len());
        buf.put_u32(self.partition);
        buf.put_u32(len);
        buf.put_u64(self.valid_from);
        buf.put_u64(self.tx_id);
        buf.put_slice(&self.user_key);
        Ok(buf.to_vec())
    }

    /// Parse the packed layout.
    ///
    /// Bytes past the declared user key length are ignored.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Decode(format!(
                "key is {} bytes, header needs {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let mut buf = bytes;
        let partition = buf.get_u32();
        let len = buf.get_u32() as usize;
        let valid_from = buf.get_u64();
        let tx_id = buf.get_u64();

        if len > buf.remaining() {
            return Err(Error::Decode(format!(
                "declared user key length {} exceeds remaining {} bytes",
                len,
                buf.remaining()
            )));
        }

        Ok(Self {
            partition,
            user_key: buf[..len].to_vec(),
            valid_from,
            tx_id,
        })
    }

    /// Whether `other` addresses a version of the same entity
    pub fn same_entity(&self, other: &TemporalKey) -> bool {
        self.partition == other.partition && self.user_key == other.user_key
    }
}

impl fmt::Display for TemporalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}@valid={},tx={}",
            self.partition,
            String::from_utf8_lossy(&self.user_key),
            self.valid_from,
            self.tx_id
        )
    }
}

fn check_user_key_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        Error::Encode(format!(
            "user key of {} bytes exceeds the {} byte limit",
            len,
            u32::MAX
        ))
    })
}

/// Prefix shared by every packed key in `partition`
pub fn partition_prefix(partition: u32) -> [u8; 4] {
    partition.to_be_bytes()
}

/// Prefix shared by every packed key in `partition` whose user key is `len` bytes
pub fn key_length_prefix(partition: u32, len: usize) -> Result<[u8; 8]> {
    let len = check_user_key_len(len)?;
    let mut prefix = [0u8; 8];
    prefix[..4].copy_from_slice(&partition.to_be_bytes());
    prefix[4..].copy_from_slice(&len.to_be_bytes());
    Ok(prefix)
}
