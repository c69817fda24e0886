// Transaction history index
//
// Primary stores (transactions, uxouts, block_sigs), address indices and
// metadata, all kept consistent by the indexer inside one write transaction
// per block.

pub mod address_index;
pub mod block_sigs;
pub mod indexer;
pub mod meta;
pub mod transactions;
pub mod uxouts;
pub mod verify;

pub use address_index::AddressIndex;
pub use block_sigs::BlockSigs;
pub use indexer::BlockSource;
pub use meta::{ChainMeta, HistoryMeta};
pub use transactions::{Transactions, TxRecord};
pub use uxouts::{Spend, UxOuts, UxRecord};
pub use verify::{VerifyReport, verify_codec};

use crate::config::DbConfig;
use crate::crypto::{Address, Hash, Sig};
use crate::db::{Bucket, Store, Tx};
use crate::error::{Error, Result};

pub const TRANSACTIONS_BUCKET: &str = "transactions";
pub const UXOUTS_BUCKET: &str = "uxouts";
pub const ADDRESS_TXNS_BUCKET: &str = "address_txns";
/// Address → output hashes. One consolidated bucket; the name is kept from
/// the earliest schema.
pub const ADDRESS_UX_BUCKET: &str = "address_in";
pub const BLOCK_SIGS_BUCKET: &str = "block_sigs";
pub const HISTORY_META_BUCKET: &str = "history_meta";
pub const CHAIN_META_BUCKET: &str = "blockchain_meta";

/// Every bucket the store must hold
pub const BUCKETS: &[&str] = &[
    TRANSACTIONS_BUCKET,
    UXOUTS_BUCKET,
    ADDRESS_TXNS_BUCKET,
    ADDRESS_UX_BUCKET,
    BLOCK_SIGS_BUCKET,
    HISTORY_META_BUCKET,
    CHAIN_META_BUCKET,
];

/// Buckets derived from blocks; cleared by `erase` and rebuilt by re-indexing.
/// Block signatures and the chain head are owned by the chain layer.
pub const HISTORY_BUCKETS: &[&str] = &[
    TRANSACTIONS_BUCKET,
    UXOUTS_BUCKET,
    ADDRESS_TXNS_BUCKET,
    ADDRESS_UX_BUCKET,
    HISTORY_META_BUCKET,
];

/// Bumped whenever a stored layout changes; a mismatch forces a rebuild
pub const SCHEMA_VERSION: u32 = 1;

pub(crate) fn key_hash(bucket: Bucket, key: &[u8]) -> Result<Hash> {
    bucket.decode(key, key)
}

/// History database: the store plus typed views over its buckets
pub struct HistoryDb {
    store: Store,
    pub transactions: Transactions,
    pub uxouts: UxOuts,
    pub address_txns: AddressIndex,
    pub address_ux: AddressIndex,
    pub block_sigs: BlockSigs,
    pub history_meta: HistoryMeta,
    pub chain_meta: ChainMeta,
}

impl HistoryDb {
    /// Open the database at `config.path`, creating missing buckets
    pub fn open(config: &DbConfig) -> Result<Self> {
        let store = Store::open(config, BUCKETS)?;
        Self::new(store)
    }

    /// Wrap an opened store. Every bucket must exist; an empty database is
    /// stamped with the current schema version.
    pub fn new(store: Store) -> Result<Self> {
        if let Some(bucket) = BUCKETS.iter().copied().find(|b| !store.bucket_exists(b)) {
            return Err(Error::BucketNotExist { bucket });
        }

        let db = HistoryDb {
            store,
            transactions: Transactions::new(),
            uxouts: UxOuts::new(),
            address_txns: AddressIndex::txns(),
            address_ux: AddressIndex::uxouts(),
            block_sigs: BlockSigs::new(),
            history_meta: HistoryMeta::new(),
            chain_meta: ChainMeta::new(),
        };

        db.store.update(|tx| {
            if db.history_meta.version(tx)?.is_none() && db.history_is_empty(tx)? {
                db.history_meta.set_version(tx, SCHEMA_VERSION)?;
                tracing::info!("[history] new database, schema version {}", SCHEMA_VERSION);
            }
            Ok(())
        })?;

        Ok(db)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn history_is_empty(&self, tx: &Tx<'_>) -> Result<bool> {
        for name in HISTORY_BUCKETS.iter().copied() {
            if !tx.is_empty(name)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ========== QUERIES ==========

    pub fn transaction(&self, hash: &Hash) -> Result<Option<TxRecord>> {
        self.store.view(|tx| self.transactions.get(tx, hash))
    }

    pub fn transactions(&self, hashes: &[Hash]) -> Result<Vec<TxRecord>> {
        self.store.view(|tx| self.transactions.get_slice(tx, hashes))
    }

    pub fn uxout(&self, hash: &Hash) -> Result<Option<UxRecord>> {
        self.store.view(|tx| self.uxouts.get(tx, hash))
    }

    pub fn uxouts(&self, hashes: &[Hash]) -> Result<Vec<UxRecord>> {
        self.store.view(|tx| self.uxouts.get_slice(tx, hashes))
    }

    /// Hashes of every transaction touching `address`, first-seen order
    pub fn address_txns(&self, address: &Address) -> Result<Vec<Hash>> {
        self.store.view(|tx| self.address_txns.get(tx, address))
    }

    /// Hashes of every output received by `address`, first-seen order
    pub fn address_ux(&self, address: &Address) -> Result<Vec<Hash>> {
        self.store.view(|tx| self.address_ux.get(tx, address))
    }

    pub fn address_transactions(&self, address: &Address) -> Result<Vec<TxRecord>> {
        self.store.view(|tx| {
            let hashes = self.address_txns.get(tx, address)?;
            self.transactions.get_slice(tx, &hashes)
        })
    }

    pub fn address_uxouts(&self, address: &Address) -> Result<Vec<UxRecord>> {
        self.store.view(|tx| {
            let hashes = self.address_ux.get(tx, address)?;
            self.uxouts.get_slice(tx, &hashes)
        })
    }

    /// Whether any transaction has ever involved `address`
    pub fn address_seen(&self, address: &Address) -> Result<bool> {
        self.store.view(|tx| self.address_txns.contains(tx, address))
    }

    pub fn parsed_height(&self) -> Result<Option<u64>> {
        self.store.view(|tx| self.history_meta.parsed_height(tx))
    }

    pub fn head_seq(&self) -> Result<Option<u64>> {
        self.store.view(|tx| self.chain_meta.head_seq(tx))
    }

    pub fn set_head_seq(&self, seq: u64) -> Result<()> {
        self.store.update(|tx| self.chain_meta.set_head_seq(tx, seq))
    }

    pub fn block_sig(&self, hash: &Hash) -> Result<Option<Sig>> {
        self.store.view(|tx| self.block_sigs.get(tx, hash))
    }

    pub fn add_block_sig(&self, hash: &Hash, sig: &Sig) -> Result<()> {
        self.store.update(|tx| self.block_sigs.add(tx, hash, sig))
    }

    /// Entry count of every bucket, in `BUCKETS` order
    pub fn bucket_counts(&self) -> Result<Vec<(&'static str, usize)>> {
        self.store.view(|tx| {
            let mut counts = Vec::with_capacity(BUCKETS.len());
            for name in BUCKETS.iter().copied() {
                counts.push((name, Bucket::new(name).len(tx)?));
            }
            Ok(counts)
        })
    }

    // ========== RESET ==========

    /// Clear every history bucket inside `tx` and stamp the current version
    pub fn erase_in(&self, tx: &Tx<'_>) -> Result<()> {
        for name in HISTORY_BUCKETS.iter().copied() {
            Bucket::new(name).reset(tx)?;
        }
        self.history_meta.set_version(tx, SCHEMA_VERSION)
    }

    pub fn erase(&self) -> Result<()> {
        self.store.update(|tx| self.erase_in(tx))?;
        tracing::info!("[history] erased history buckets");
        Ok(())
    }

    /// True when the stored index has to be rebuilt before use
    pub fn needs_reset(&self, tx: &Tx<'_>) -> Result<bool> {
        let parsed = self.history_meta.parsed_height(tx)?;
        match self.history_meta.version(tx)? {
            Some(v) if v != SCHEMA_VERSION => {
                tracing::warn!("[history] schema version {} != {}", v, SCHEMA_VERSION);
                return Ok(true);
            }
            None if !self.history_is_empty(tx)? => {
                tracing::warn!("[history] unversioned history data");
                return Ok(true);
            }
            _ => {}
        }

        if let (Some(parsed), Some(head)) = (parsed, self.chain_meta.head_seq(tx)?)
            && parsed > head
        {
            tracing::warn!("[history] parsed height {} beyond chain head {}", parsed, head);
            return Ok(true);
        }
        Ok(false)
    }

    /// Erase the history when `needs_reset` says so. Returns whether it did.
    pub fn reset_if_needed(&self) -> Result<bool> {
        let reset = self.store.update(|tx| {
            if self.needs_reset(tx)? {
                self.erase_in(tx)?;
                Ok(true)
            } else {
                Ok(false)
            }
        })?;
        if reset {
            tracing::info!("[history] reset, index will be rebuilt");
        }
        Ok(reset)
    }
}
