// RocksDB-backed transactional store
//
// Design Principles:
// 1. One column family per bucket
// 2. Single writer - a process-wide lock is held for the life of a write transaction
// 3. Snapshot readers - read transactions see the state as of their start
// 4. Atomicity - a write transaction commits every bucket update or none

use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, SnapshotWithThreadMode,
    Transaction, TransactionDB, TransactionDBOptions, TransactionOptions, WriteOptions, DB,
};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::DbConfig;
use crate::error::{Error, Result};

/// Main database handle
pub struct Store {
    db: TransactionDB,
    write_lock: Mutex<()>,
    sync_writes: bool,
}

impl Store {
    /// Open or create the database, creating a column family for every
    /// bucket in `buckets` that does not exist yet.
    ///
    /// Performance Tuning:
    /// - write_buffer_size / block cache from `DbConfig`
    /// - compression: LZ4 (hash-heavy values still compress)
    pub fn open(config: &DbConfig, buckets: &[&str]) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(3);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let cache = rocksdb::Cache::new_lru_cache(config.block_cache_size);
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_block_cache(&cache);
        block_opts.set_block_size(16 * 1024);
        opts.set_block_based_table_factory(&block_opts);

        opts.set_wal_bytes_per_sync(1024 * 1024);
        opts.set_level_compaction_dynamic_level_bytes(true);

        // Every column family already on disk must be opened, plus the requested ones
        let existing = DB::list_cf(&opts, &config.path).unwrap_or_default();
        let created: Vec<&str> = buckets
            .iter()
            .copied()
            .filter(|b| !existing.iter().any(|e| e == b))
            .collect();

        let mut names: Vec<String> = existing.clone();
        names.extend(created.iter().map(|s| s.to_string()));
        let cfs = names
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, opts.clone()));

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &TransactionDBOptions::default(),
            &config.path,
            cfs,
        )
        .map_err(|e| {
            if created.is_empty() {
                Error::Storage(e)
            } else {
                Error::CreateBucketFailed {
                    bucket: created.join(", "),
                    source: e,
                }
            }
        })?;

        if !created.is_empty() {
            tracing::info!("[db] created buckets: {}", created.join(", "));
        }
        tracing::info!("[db] opened {}", config.path.display());

        Ok(Store {
            db,
            write_lock: Mutex::new(()),
            sync_writes: config.sync_writes,
        })
    }

    /// Start a snapshot read transaction
    pub fn begin_read(&self) -> Tx<'_> {
        Tx {
            store: self,
            kind: TxKind::Read(self.db.snapshot()),
        }
    }

    /// Start a write transaction; blocks while another write transaction is open
    pub fn begin_write(&self) -> Tx<'_> {
        let guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.sync_writes);
        let txn = self
            .db
            .transaction_opt(&write_opts, &TransactionOptions::default());

        Tx {
            store: self,
            kind: TxKind::Write { txn, _guard: guard },
        }
    }

    /// Run `f` in a read transaction
    pub fn view<T>(&self, f: impl FnOnce(&Tx<'_>) -> Result<T>) -> Result<T> {
        let tx = self.begin_read();
        f(&tx)
    }

    /// Run `f` in a write transaction, committing only if it succeeds
    pub fn update<T>(&self, f: impl FnOnce(&Tx<'_>) -> Result<T>) -> Result<T> {
        let tx = self.begin_write();
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    fn cf(&self, bucket: &'static str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(bucket)
            .ok_or(Error::BucketNotExist { bucket })
    }

    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.db.cf_handle(bucket).is_some()
    }
}

enum TxKind<'db> {
    Read(SnapshotWithThreadMode<'db, TransactionDB>),
    // field order: the RocksDB transaction is dropped (rolled back) before the lock is released
    Write {
        txn: Transaction<'db, TransactionDB>,
        _guard: MutexGuard<'db, ()>,
    },
}

/// Transaction handle passed to every bucket operation
///
/// Values returned from reads are owned copies and stay valid after the
/// transaction ends. Dropping a write transaction without `commit` discards it.
pub struct Tx<'db> {
    store: &'db Store,
    kind: TxKind<'db>,
}

type RawEntry = std::result::Result<(Box<[u8]>, Box<[u8]>), rocksdb::Error>;

impl<'db> Tx<'db> {
    pub fn is_writable(&self) -> bool {
        matches!(self.kind, TxKind::Write { .. })
    }

    /// `Ok(None)` for a missing key or a missing bucket
    pub fn get(&self, bucket: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Ok(cf) = self.store.cf(bucket) else {
            return Ok(None);
        };
        let v = match &self.kind {
            TxKind::Read(snap) => snap.get_cf(cf, key)?,
            TxKind::Write { txn, .. } => txn.get_cf(cf, key)?,
        };
        Ok(v)
    }

    pub fn put(&self, bucket: &'static str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.store.cf(bucket)?;
        self.writer()?.put_cf(cf, key, value)?;
        Ok(())
    }

    pub fn delete(&self, bucket: &'static str, key: &[u8]) -> Result<()> {
        let cf = self.store.cf(bucket)?;
        self.writer()?.delete_cf(cf, key)?;
        Ok(())
    }

    /// Visit every entry in key order; stops at the first error from `f`
    pub fn for_each(
        &self,
        bucket: &'static str,
        mut f: impl FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        let cf = self.store.cf(bucket)?;
        match &self.kind {
            TxKind::Read(snap) => drain(snap.iterator_cf(cf, IteratorMode::Start), &mut f),
            TxKind::Write { txn, .. } => drain(txn.iterator_cf(cf, IteratorMode::Start), &mut f),
        }
    }

    pub fn is_empty(&self, bucket: &'static str) -> Result<bool> {
        let cf = self.store.cf(bucket)?;
        let first = match &self.kind {
            TxKind::Read(snap) => snap.iterator_cf(cf, IteratorMode::Start).next(),
            TxKind::Write { txn, .. } => txn.iterator_cf(cf, IteratorMode::Start).next(),
        };
        match first {
            Some(item) => {
                item?;
                Ok(false)
            }
            None => Ok(true),
        }
    }

    pub fn commit(self) -> Result<()> {
        match self.kind {
            TxKind::Write { txn, _guard } => {
                txn.commit()?;
                Ok(())
            }
            TxKind::Read(_) => Ok(()),
        }
    }

    fn writer(&self) -> Result<&Transaction<'db, TransactionDB>> {
        match &self.kind {
            TxKind::Write { txn, .. } => Ok(txn),
            TxKind::Read(_) => Err(Error::TxNotWritable),
        }
    }
}

fn drain(
    iter: impl Iterator<Item = RawEntry>,
    f: &mut impl FnMut(&[u8], &[u8]) -> Result<()>,
) -> Result<()> {
    for item in iter {
        let (k, v) = item?;
        f(&k, &v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const B: &str = "things";

    fn tmp() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&DbConfig::ephemeral(dir.path()), &[B]).unwrap();
        (dir, store)
    }

    #[test]
    fn test_commit_makes_writes_visible() {
        let (_d, store) = tmp();
        store.update(|tx| tx.put(B, b"k", b"v")).unwrap();
        let got = store.view(|tx| tx.get(B, b"k")).unwrap();
        assert_eq!(got, Some(b"v".to_vec()));
    }

    #[test]
    fn test_dropped_write_rolls_back() {
        let (_d, store) = tmp();
        {
            let tx = store.begin_write();
            tx.put(B, b"k", b"v").unwrap();
            assert_eq!(tx.get(B, b"k").unwrap(), Some(b"v".to_vec()));
        }
        assert_eq!(store.view(|tx| tx.get(B, b"k")).unwrap(), None);
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let (_d, store) = tmp();
        let r: Result<()> = store.update(|tx| {
            tx.put(B, b"k", b"v")?;
            Err(Error::VerifyStopped)
        });
        assert!(matches!(r, Err(Error::VerifyStopped)));
        assert_eq!(store.view(|tx| tx.get(B, b"k")).unwrap(), None);
    }

    #[test]
    fn test_reader_sees_snapshot() {
        let (_d, store) = tmp();
        store.update(|tx| tx.put(B, b"k", b"old")).unwrap();
        let reader = store.begin_read();
        store.update(|tx| tx.put(B, b"k", b"new")).unwrap();
        assert_eq!(reader.get(B, b"k").unwrap(), Some(b"old".to_vec()));
        assert_eq!(store.view(|tx| tx.get(B, b"k")).unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_read_tx_rejects_writes() {
        let (_d, store) = tmp();
        let tx = store.begin_read();
        assert!(!tx.is_writable());
        assert!(matches!(tx.put(B, b"k", b"v"), Err(Error::TxNotWritable)));
    }

    #[test]
    fn test_missing_bucket() {
        let (_d, store) = tmp();
        let tx = store.begin_write();
        assert_eq!(tx.get("nope", b"k").unwrap(), None);
        assert!(matches!(
            tx.put("nope", b"k", b"v"),
            Err(Error::BucketNotExist { bucket: "nope" })
        ));
        assert!(matches!(
            tx.for_each("nope", |_, _| Ok(())),
            Err(Error::BucketNotExist { .. })
        ));
    }

    #[test]
    fn test_reopen_keeps_buckets() {
        let dir = TempDir::new().unwrap();
        let config = DbConfig::ephemeral(dir.path());
        {
            let store = Store::open(&config, &[B, "other"]).unwrap();
            store.update(|tx| tx.put("other", b"k", b"v")).unwrap();
        }
        // reopening without naming "other" still opens it
        let store = Store::open(&config, &[B]).unwrap();
        assert!(store.bucket_exists("other"));
        assert_eq!(store.view(|tx| tx.get("other", b"k")).unwrap(), Some(b"v".to_vec()));
    }
}
