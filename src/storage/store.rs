//! Bitemporal key-value store backed by sled
//!
//! Every call is its own atomic unit: single-key writes are one engine
//! operation, multi-key writes go through [`WriteBatch`]. Reads never block
//! writers.

use crate::config::StoreConfig;
use crate::core::key::{key_length_prefix, partition_prefix, TemporalKey};
use crate::core::temporal::Clock;
use crate::core::value::Value;
use crate::error::{Error, Result};
use crate::storage::batch::WriteBatch;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Central persistence facade
#[derive(Debug)]
pub struct KvStore {
    db: sled::Db,
    /// Fills in `tx_id` when callers leave it out
    clock: Arc<dyn Clock>,
    read_only: bool,
    sync_writes: bool,
}

impl KvStore {
    /// Open (or create) the store described by `config`
    pub fn open(config: &StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        if config.read_only && !is_existing_database(&config.path) {
            return Err(Error::Storage(format!(
                "cannot open {} read-only: no existing database there",
                config.path.display()
            )));
        }

        let flush_every_ms = if config.read_only {
            None
        } else {
            config.flush_every_ms
        };
        let mut engine = sled::Config::new()
            .cache_capacity(config.cache_capacity_bytes)
            .flush_every_ms(flush_every_ms)
            .temporary(config.temporary);
        if !config.path.as_os_str().is_empty() {
            engine = engine.path(&config.path);
        }
        let db = engine.open()?;

        info!(
            path = %config.path.display(),
            read_only = config.read_only,
            sync_writes = config.sync_writes,
            "opened store"
        );

        Ok(Self {
            db,
            clock,
            read_only: config.read_only,
            sync_writes: config.sync_writes,
        })
    }

    /// Open a throwaway store that is deleted on drop
    pub fn temporary(clock: Arc<dyn Clock>) -> Result<Self> {
        let config = StoreConfig::new("")
            .with_temporary(true)
            .with_sync_writes(false);
        Self::open(&config, clock)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current reading of the injected clock
    pub fn now_ts(&self) -> u64 {
        self.clock.now_ts()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Exact-match lookup on all four key fields
    pub fn get(&self, key: &TemporalKey) -> Result<Option<Value>> {
        match self.db.get(key.pack()?)? {
            Some(raw) => Ok(Some(Value::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Store `value` under `key`, replacing only an identical key
    pub fn put(&self, key: &TemporalKey, value: &Value) -> Result<()> {
        self.check_writable()?;
        self.db.insert(key.pack()?, value.encode())?;
        debug!(
            partition = key.partition,
            valid_from = key.valid_from,
            tx_id = key.tx_id,
            tag = ?value.tag(),
            "put"
        );
        self.after_write()
    }

    /// Store a new version, defaulting `valid_from` to 0 and stamping
    /// `tx_id` from the clock when not supplied. Returns the key written.
    pub fn record(
        &self,
        partition: u32,
        user_key: impl Into<Vec<u8>>,
        valid_from: Option<u64>,
        tx_id: Option<u64>,
        value: &Value,
    ) -> Result<TemporalKey> {
        let tx_id = tx_id.unwrap_or_else(|| self.clock.now_ts());
        let key = TemporalKey::new(partition, user_key, valid_from.unwrap_or(0), tx_id)?;
        self.put(&key, value)?;
        Ok(key)
    }

    /// Remove one exact key. Returns whether it existed.
    pub fn delete(&self, key: &TemporalKey) -> Result<bool> {
        self.check_writable()?;
        let existed = self.db.remove(key.pack()?)?.is_some();
        debug!(
            partition = key.partition,
            valid_from = key.valid_from,
            tx_id = key.tx_id,
            existed,
            "delete"
        );
        self.after_write()?;
        Ok(existed)
    }

    /// Apply every operation in `batch` atomically
    pub fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        self.check_writable()?;
        let ops = batch.len();
        self.db.apply_batch(batch.into_sled())?;
        debug!(ops, "applied batch");
        self.after_write()
    }

    /// Every entry in packed-key order.
    ///
    /// Each call starts a fresh scan from the beginning.
    pub fn items(&self) -> Items {
        Items {
            inner: self.db.iter(),
        }
    }

    /// Entries of one partition in packed-key order
    pub fn partition_items(&self, partition: u32) -> Items {
        Items {
            inner: self.db.scan_prefix(partition_prefix(partition)),
        }
    }

    /// All versions of one entity, ordered by `(valid_from, tx_id)`
    pub fn versions(
        &self,
        partition: u32,
        user_key: &[u8],
    ) -> Result<Vec<(TemporalKey, Value)>> {
        let prefix = key_length_prefix(partition, user_key.len())?;
        let scan = Items {
            inner: self.db.scan_prefix(prefix),
        };

        let mut versions = Vec::new();
        for entry in scan {
            let (key, value) = entry?;
            if key.user_key == user_key {
                versions.push((key, value));
            }
        }
        Ok(versions)
    }

    /// Number of stored entries, all partitions
    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Force buffered writes to disk
    pub fn flush(&self) -> Result<()> {
        let bytes = self.db.flush()?;
        info!(bytes, "flushed store");
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            warn!("rejected write on read-only store");
            return Err(Error::ReadOnly);
        }
        Ok(())
    }

    fn after_write(&self) -> Result<()> {
        if self.sync_writes {
            self.db.flush()?;
        }
        Ok(())
    }
}

/// Whether `path` holds the files sled writes when it creates a database
fn is_existing_database(path: &Path) -> bool {
    path.join("conf").is_file() && path.join("db").is_file()
}

/// Lazy scan over decoded entries.
///
/// Malformed entries surface as `Err` items rather than being skipped.
pub struct Items {
    inner: sled::Iter,
}

impl Iterator for Items {
    type Item = Result<(TemporalKey, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(
            entry
                .map_err(Error::from)
                .and_then(|(key, value)| Ok((TemporalKey::unpack(&key)?, Value::decode(&value)?))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::{ManualClock, MonotonicClock};
    use serde_json::json;

    fn store() -> KvStore {
        KvStore::temporary(Arc::new(MonotonicClock::new())).unwrap()
    }

    fn key(user_key: &str, valid_from: u64, tx_id: u64) -> TemporalKey {
        TemporalKey::new(0, user_key.as_bytes().to_vec(), valid_from, tx_id).unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let kv = store();
        let k = key("foo", 0, 0);
        kv.put(&k, &Value::Raw(b"bar".to_vec())).unwrap();

        assert_eq!(kv.get(&k).unwrap(), Some(Value::Raw(b"bar".to_vec())));
    }

    #[test]
    fn test_get_requires_exact_key() {
        let kv = store();
        kv.put(&key("foo", 1, 1), &Value::Raw(b"bar".to_vec())).unwrap();

        assert_eq!(kv.get(&key("foo", 1, 2)).unwrap(), None);
        assert_eq!(kv.get(&key("foo", 2, 1)).unwrap(), None);
        assert_eq!(kv.get(&key("fop", 1, 1)).unwrap(), None);
        let other_partition = TemporalKey::new(1, b"foo".to_vec(), 1, 1).unwrap();
        assert_eq!(kv.get(&other_partition).unwrap(), None);
    }

    #[test]
    fn test_identical_key_overwrites() {
        let kv = store();
        let k = key("foo", 1, 1);
        kv.put(&k, &Value::Raw(b"one".to_vec())).unwrap();
        kv.put(&k, &Value::Json(b"2".to_vec())).unwrap();

        assert_eq!(kv.get(&k).unwrap(), Some(Value::Json(b"2".to_vec())));
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn test_versions_coexist() {
        let kv = store();
        let original = key("foo", 1, 1);
        let newer = key("foo", 1, 2);
        kv.put(&original, &Value::Raw(b"v1".to_vec())).unwrap();
        kv.put(&newer, &Value::Raw(b"v2".to_vec())).unwrap();

        assert_eq!(kv.get(&original).unwrap(), Some(Value::Raw(b"v1".to_vec())));
        assert_eq!(kv.get(&newer).unwrap(), Some(Value::Raw(b"v2".to_vec())));
    }

    #[test]
    fn test_delete_semantics() {
        let kv = store();
        let k = key("foo", 0, 7);
        assert!(!kv.delete(&k).unwrap());

        kv.put(&k, &Value::Raw(b"bar".to_vec())).unwrap();
        assert!(kv.delete(&k).unwrap());
        assert!(!kv.delete(&k).unwrap());
        assert_eq!(kv.get(&k).unwrap(), None);
    }

    #[test]
    fn test_delete_leaves_other_versions() {
        let kv = store();
        kv.put(&key("foo", 0, 1), &Value::Raw(b"a".to_vec())).unwrap();
        kv.put(&key("foo", 0, 2), &Value::Raw(b"b".to_vec())).unwrap();

        assert!(kv.delete(&key("foo", 0, 1)).unwrap());
        assert_eq!(kv.get(&key("foo", 0, 2)).unwrap(), Some(Value::Raw(b"b".to_vec())));
    }

    #[test]
    fn test_items_in_key_order() {
        let kv = store();
        let k3 = TemporalKey::new(2, b"a".to_vec(), 0, 0).unwrap();
        let k2 = key("a", 5, 1);
        let k1 = key("a", 1, 9);
        for k in [&k3, &k2, &k1] {
            kv.put(k, &Value::Raw(Vec::new())).unwrap();
        }

        let keys: Vec<TemporalKey> = kv.items().map(|e| e.unwrap().0).collect();
        assert_eq!(keys, vec![k1, k2, k3]);

        // each call restarts the scan
        assert_eq!(kv.items().count(), 3);
    }

    #[test]
    fn test_items_surface_decode_errors() {
        let kv = store();
        kv.put(&key("ok", 0, 0), &Value::Raw(Vec::new())).unwrap();
        kv.db.insert(vec![0xff; 4], vec![0x00]).unwrap();

        let entries: Vec<_> = kv.items().collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_ok());
        assert!(matches!(entries[1], Err(Error::Decode(_))));
    }

    #[test]
    fn test_get_surfaces_bad_value_tag() {
        let kv = store();
        let k = key("bad", 0, 0);
        kv.db.insert(k.pack().unwrap(), vec![0x09, 1, 2]).unwrap();

        assert!(matches!(kv.get(&k), Err(Error::Decode(_))));
    }

    #[test]
    fn test_record_stamps_tx_from_clock() {
        let clock = Arc::new(ManualClock::new(100));
        let kv = KvStore::temporary(clock.clone()).unwrap();

        let first = kv.record(0, b"k".to_vec(), None, None, &Value::Raw(b"1".to_vec())).unwrap();
        assert_eq!(first.valid_from, 0);
        assert_eq!(first.tx_id, 100);

        clock.advance(5);
        let second = kv
            .record(0, b"k".to_vec(), Some(42), None, &Value::Raw(b"2".to_vec()))
            .unwrap();
        assert_eq!(second.valid_from, 42);
        assert_eq!(second.tx_id, 105);

        let explicit = kv
            .record(0, b"k".to_vec(), Some(1), Some(3), &Value::Raw(b"3".to_vec()))
            .unwrap();
        assert_eq!(explicit.tx_id, 3);
        assert_eq!(kv.versions(0, b"k").unwrap().len(), 3);
    }

    #[test]
    fn test_versions_ordered_and_scoped() {
        let kv = store();
        kv.put(&key("alice", 20, 1), &Value::json(&json!({"v": 3})).unwrap()).unwrap();
        kv.put(&key("alice", 10, 5), &Value::json(&json!({"v": 2})).unwrap()).unwrap();
        kv.put(&key("alice", 10, 2), &Value::json(&json!({"v": 1})).unwrap()).unwrap();
        kv.put(&key("alicf", 10, 1), &Value::Raw(Vec::new())).unwrap();
        kv.put(&key("bob", 10, 1), &Value::Raw(Vec::new())).unwrap();
        kv.put(&TemporalKey::new(1, b"alice".to_vec(), 0, 0).unwrap(), &Value::Raw(Vec::new()))
            .unwrap();

        let versions = kv.versions(0, b"alice").unwrap();
        let coords: Vec<(u64, u64)> =
            versions.iter().map(|(k, _)| (k.valid_from, k.tx_id)).collect();
        assert_eq!(coords, vec![(10, 2), (10, 5), (20, 1)]);
    }

    #[test]
    fn test_partition_items() {
        let kv = store();
        kv.put(&key("a", 0, 0), &Value::Raw(Vec::new())).unwrap();
        kv.put(&TemporalKey::new(1, b"b".to_vec(), 0, 0).unwrap(), &Value::Raw(Vec::new()))
            .unwrap();
        kv.put(&TemporalKey::new(1, b"c".to_vec(), 0, 0).unwrap(), &Value::Raw(Vec::new()))
            .unwrap();

        let partition_one: Vec<_> = kv.partition_items(1).map(|e| e.unwrap().0).collect();
        assert_eq!(partition_one.len(), 2);
        assert!(partition_one.iter().all(|k| k.partition == 1));
    }

    #[test]
    fn test_write_batch_applies_all() {
        let kv = store();
        let stale = key("old", 0, 0);
        kv.put(&stale, &Value::Raw(Vec::new())).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .put(&key("x", 0, 1), &Value::Raw(b"1".to_vec()))
            .unwrap()
            .put(&key("y", 0, 1), &Value::Raw(b"2".to_vec()))
            .unwrap()
            .delete(&stale)
            .unwrap();
        kv.write_batch(batch).unwrap();

        assert_eq!(kv.get(&key("x", 0, 1)).unwrap(), Some(Value::Raw(b"1".to_vec())));
        assert_eq!(kv.get(&key("y", 0, 1)).unwrap(), Some(Value::Raw(b"2".to_vec())));
        assert_eq!(kv.get(&stale).unwrap(), None);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("db"));
        let k = key("persist", 1, 1);

        {
            let kv = KvStore::open(&config, Arc::new(MonotonicClock::new())).unwrap();
            kv.put(&k, &Value::Raw(b"yes".to_vec())).unwrap();
        }

        let kv = KvStore::open(&config, Arc::new(MonotonicClock::new())).unwrap();
        assert_eq!(kv.get(&k).unwrap(), Some(Value::Raw(b"yes".to_vec())));
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        let k = key("foo", 0, 0);
        {
            let kv =
                KvStore::open(&StoreConfig::new(&path), Arc::new(MonotonicClock::new())).unwrap();
            kv.put(&k, &Value::Raw(b"bar".to_vec())).unwrap();
            kv.flush().unwrap();
        }

        let config = StoreConfig::new(&path).with_read_only(true);
        let kv = KvStore::open(&config, Arc::new(MonotonicClock::new())).unwrap();
        assert!(kv.is_read_only());
        assert_eq!(kv.get(&k).unwrap(), Some(Value::Raw(b"bar".to_vec())));
        assert!(matches!(kv.put(&k, &Value::Raw(Vec::new())), Err(Error::ReadOnly)));
        assert!(matches!(kv.delete(&k), Err(Error::ReadOnly)));
        assert!(matches!(kv.write_batch(WriteBatch::new()), Err(Error::ReadOnly)));
    }

    #[test]
    fn test_read_only_requires_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("missing")).with_read_only(true);
        let err = KvStore::open(&config, Arc::new(MonotonicClock::new())).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_read_only_leaves_plain_dir_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path()).with_read_only(true);
        let err = KvStore::open(&config, Arc::new(MonotonicClock::new())).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_second_open_fails_while_locked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        let writer = KvStore::open(&StoreConfig::new(&path), Arc::new(MonotonicClock::new()))
            .unwrap();
        writer.put(&key("foo", 0, 0), &Value::Raw(b"bar".to_vec())).unwrap();

        let writable = KvStore::open(&StoreConfig::new(&path), Arc::new(MonotonicClock::new()));
        assert!(matches!(writable, Err(Error::Storage(_))));

        let config = StoreConfig::new(&path).with_read_only(true);
        let read_only = KvStore::open(&config, Arc::new(MonotonicClock::new()));
        assert!(matches!(read_only, Err(Error::Storage(_))));
    }

    #[test]
    fn test_open_on_regular_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = KvStore::open(&StoreConfig::new(file.path()), Arc::new(MonotonicClock::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_) | Error::Io(_)));
    }

    #[test]
    fn test_concurrent_writers() {
        let kv = Arc::new(store());
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let kv = Arc::clone(&kv);
                std::thread::spawn(move || {
                    for i in 0..50u64 {
                        kv.put(&key("shared", i, t), &Value::Raw(vec![t as u8])).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(kv.versions(0, b"shared").unwrap().len(), 200);
    }
}
