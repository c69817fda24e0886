// Transactions bucket: txid[32] → TxRecord bytes
use serde::{Deserialize, Serialize};

use super::{TRANSACTIONS_BUCKET, key_hash};
use crate::codec::{CodecError, FixedLayout, Reader};
use crate::crypto::Hash;
use crate::db::{Bucket, Tx};
use crate::error::Result;
use crate::primitives::Transaction;

/// Indexed transaction and the height of the block containing it
///
/// Serialization Format:
///   [..n]     transaction (see `Transaction`)
///   [n..n+8]  block_seq (LE u64)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub txn: Transaction,
    pub block_seq: u64,
}

impl TxRecord {
    pub fn hash(&self) -> Hash {
        self.txn.hash()
    }
}

impl FixedLayout for TxRecord {
    fn encode_size(&self) -> usize {
        self.txn.encode_size() + 8
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.txn.encode_to(buf);
        buf.extend_from_slice(&self.block_seq.to_le_bytes());
    }

    fn decode_from(r: &mut Reader<'_>) -> std::result::Result<Self, CodecError> {
        Ok(TxRecord {
            txn: Transaction::decode_from(r)?,
            block_seq: r.u64()?,
        })
    }
}

/// Append-only store of every indexed transaction
#[derive(Debug, Clone, Copy)]
pub struct Transactions {
    bucket: Bucket,
}

impl Transactions {
    pub const fn new() -> Self {
        Transactions {
            bucket: Bucket::new(TRANSACTIONS_BUCKET),
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// Keyed by transaction hash. Re-adding a hash rewrites identical content.
    pub fn add(&self, tx: &Tx<'_>, record: &TxRecord) -> Result<()> {
        self.bucket.put_encoded(tx, record.hash().as_bytes(), record)
    }

    pub fn get(&self, tx: &Tx<'_>, hash: &Hash) -> Result<Option<TxRecord>> {
        self.bucket.get_decoded(tx, hash.as_bytes())
    }

    /// Records for the hashes that exist, in input order; missing hashes are skipped
    pub fn get_slice(&self, tx: &Tx<'_>, hashes: &[Hash]) -> Result<Vec<TxRecord>> {
        let mut out = Vec::with_capacity(hashes.len());
        for h in hashes {
            if let Some(rec) = self.get(tx, h)? {
                out.push(rec);
            }
        }
        Ok(out)
    }

    pub fn contains(&self, tx: &Tx<'_>, hash: &Hash) -> Result<bool> {
        Ok(self.bucket.get(tx, hash.as_bytes())?.is_some())
    }

    pub fn for_each(
        &self,
        tx: &Tx<'_>,
        mut f: impl FnMut(Hash, TxRecord) -> Result<()>,
    ) -> Result<()> {
        let bucket = self.bucket;
        bucket.for_each_decoded(tx, |k, rec| f(key_hash(bucket, k)?, rec))
    }

    pub fn len(&self, tx: &Tx<'_>) -> Result<usize> {
        self.bucket.len(tx)
    }

    pub fn is_empty(&self, tx: &Tx<'_>) -> Result<bool> {
        self.bucket.is_empty(tx)
    }

    pub fn reset(&self, tx: &Tx<'_>) -> Result<()> {
        self.bucket.reset(tx)
    }
}
