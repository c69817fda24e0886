// Small key/value buckets holding single counters
//
//   history_meta     "parsed_height" → u64 LE, "version" → u32 LE
//   blockchain_meta  "head_seq" → u64 LE (written by the chain layer)

use super::{CHAIN_META_BUCKET, HISTORY_META_BUCKET};
use crate::db::{Bucket, Tx};
use crate::error::Result;

pub const PARSED_HEIGHT_KEY: &[u8] = b"parsed_height";
pub const VERSION_KEY: &[u8] = b"version";
pub const HEAD_SEQ_KEY: &[u8] = b"head_seq";

/// Indexer progress and schema version
#[derive(Debug, Clone, Copy)]
pub struct HistoryMeta {
    bucket: Bucket,
}

impl HistoryMeta {
    pub const fn new() -> Self {
        HistoryMeta {
            bucket: Bucket::new(HISTORY_META_BUCKET),
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// Height of the last block applied to the index; `None` until the first block
    pub fn parsed_height(&self, tx: &Tx<'_>) -> Result<Option<u64>> {
        self.bucket.get_decoded(tx, PARSED_HEIGHT_KEY)
    }

    /// Never moves backwards: replaying an older block leaves the height alone
    pub fn set_parsed_height(&self, tx: &Tx<'_>, height: u64) -> Result<()> {
        match self.parsed_height(tx)? {
            Some(current) if current >= height => Ok(()),
            _ => self.bucket.put_encoded(tx, PARSED_HEIGHT_KEY, &height),
        }
    }

    pub fn version(&self, tx: &Tx<'_>) -> Result<Option<u32>> {
        self.bucket.get_decoded(tx, VERSION_KEY)
    }

    pub fn set_version(&self, tx: &Tx<'_>, version: u32) -> Result<()> {
        self.bucket.put_encoded(tx, VERSION_KEY, &version)
    }

    pub fn is_empty(&self, tx: &Tx<'_>) -> Result<bool> {
        self.bucket.is_empty(tx)
    }

    pub fn reset(&self, tx: &Tx<'_>) -> Result<()> {
        self.bucket.reset(tx)
    }
}

/// Canonical chain head, as seen by the history store
#[derive(Debug, Clone, Copy)]
pub struct ChainMeta {
    bucket: Bucket,
}

impl ChainMeta {
    pub const fn new() -> Self {
        ChainMeta {
            bucket: Bucket::new(CHAIN_META_BUCKET),
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn head_seq(&self, tx: &Tx<'_>) -> Result<Option<u64>> {
        self.bucket.get_decoded(tx, HEAD_SEQ_KEY)
    }

    pub fn set_head_seq(&self, tx: &Tx<'_>, seq: u64) -> Result<()> {
        self.bucket.put_encoded(tx, HEAD_SEQ_KEY, &seq)
    }
}
