// Address → ordered, duplicate-free list of hashes
//
// Two instances share this type:
//   address_txns  every transaction that paid to or spent from the address
//   address_in    every output ever created for the address
//
// Key: address (version[1] + key[20]); value: Vec<Hash> in first-seen order.

use super::{ADDRESS_TXNS_BUCKET, ADDRESS_UX_BUCKET};
use crate::crypto::{Address, Hash};
use crate::db::{Bucket, Tx};
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct AddressIndex {
    bucket: Bucket,
}

impl AddressIndex {
    /// Transactions touching an address
    pub const fn txns() -> Self {
        AddressIndex {
            bucket: Bucket::new(ADDRESS_TXNS_BUCKET),
        }
    }

    /// Outputs received by an address
    pub const fn uxouts() -> Self {
        AddressIndex {
            bucket: Bucket::new(ADDRESS_UX_BUCKET),
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// Append `hash` unless it is already listed. Returns whether it was appended.
    pub fn add(&self, tx: &Tx<'_>, address: &Address, hash: &Hash) -> Result<bool> {
        let key = address.to_key();
        let mut hashes: Vec<Hash> = self.bucket.get_decoded(tx, &key)?.unwrap_or_default();
        if hashes.contains(hash) {
            return Ok(false);
        }
        hashes.push(*hash);
        self.bucket.put_encoded(tx, &key, &hashes)?;
        Ok(true)
    }

    /// Empty when the address has no recorded activity
    pub fn get(&self, tx: &Tx<'_>, address: &Address) -> Result<Vec<Hash>> {
        Ok(self
            .bucket
            .get_decoded(tx, &address.to_key())?
            .unwrap_or_default())
    }

    pub fn contains(&self, tx: &Tx<'_>, address: &Address) -> Result<bool> {
        Ok(self.bucket.get(tx, &address.to_key())?.is_some())
    }

    pub fn for_each(
        &self,
        tx: &Tx<'_>,
        mut f: impl FnMut(Address, Vec<Hash>) -> Result<()>,
    ) -> Result<()> {
        let bucket = self.bucket;
        bucket.for_each_decoded(tx, |k, hashes: Vec<Hash>| f(bucket.decode(k, k)?, hashes))
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
