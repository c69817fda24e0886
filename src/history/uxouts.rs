// UxOuts bucket: uxid[32] → UxRecord bytes
use serde::{Deserialize, Serialize};

use super::{UXOUTS_BUCKET, key_hash};
use crate::codec::{CodecError, FixedLayout, Reader};
use crate::crypto::Hash;
use crate::db::{Bucket, Tx};
use crate::error::{Error, Result};
use crate::primitives::UxOut;

/// Transaction and block that consumed an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spend {
    pub txid: Hash,
    pub block_seq: u64,
}

impl FixedLayout for Spend {
    fn encode_size(&self) -> usize {
        self.txid.encode_size() + 8
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.txid.encode_to(buf);
        buf.extend_from_slice(&self.block_seq.to_le_bytes());
    }

    fn decode_from(r: &mut Reader<'_>) -> std::result::Result<Self, CodecError> {
        Ok(Spend {
            txid: Hash::decode_from(r)?,
            block_seq: r.u64()?,
        })
    }
}

/// Output with spend metadata
///
/// Serialization Format:
///   [0..85]   out (UxOut: head 16 + body 69)
///   [85]      spent flag (0|1)
///   [86..126] spend txid + block_seq (only if flag == 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxRecord {
    pub out: UxOut,
    /// Written once, when the output is consumed; frozen afterwards
    pub spent: Option<Spend>,
}

impl UxRecord {
    pub fn unspent(out: UxOut) -> Self {
        UxRecord { out, spent: None }
    }

    pub fn hash(&self) -> Hash {
        self.out.hash()
    }

    pub fn is_spent(&self) -> bool {
        self.spent.is_some()
    }

    /// Record the spender. Repeating the same spend is a no-op; a different
    /// spender for an already spent output is rejected.
    pub fn mark_spent(&mut self, spend: Spend) -> Result<()> {
        match self.spent {
            None => {
                self.spent = Some(spend);
                Ok(())
            }
            Some(existing) if existing == spend => Ok(()),
            Some(existing) => Err(Error::OutputAlreadySpent {
                hash: self.hash().to_string(),
                spent_by: existing.txid.to_string(),
            }),
        }
    }
}

impl FixedLayout for UxRecord {
    fn encode_size(&self) -> usize {
        self.out.encode_size() + self.spent.encode_size()
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.out.encode_to(buf);
        self.spent.encode_to(buf);
    }

    fn decode_from(r: &mut Reader<'_>) -> std::result::Result<Self, CodecError> {
        Ok(UxRecord {
            out: UxOut::decode_from(r)?,
            spent: Option::decode_from(r)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UxOuts {
    bucket: Bucket,
}

impl UxOuts {
    pub const fn new() -> Self {
        UxOuts {
            bucket: Bucket::new(UXOUTS_BUCKET),
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    /// Unconditional put keyed by the output hash
    pub fn set(&self, tx: &Tx<'_>, record: &UxRecord) -> Result<()> {
        self.bucket.put_encoded(tx, record.hash().as_bytes(), record)
    }

    pub fn get(&self, tx: &Tx<'_>, hash: &Hash) -> Result<Option<UxRecord>> {
        self.bucket.get_decoded(tx, hash.as_bytes())
    }

    /// Like `get`, but a missing output is an `ObjectNotExist` error
    pub fn get_required(&self, tx: &Tx<'_>, hash: &Hash) -> Result<UxRecord> {
        self.get(tx, hash)?.ok_or_else(|| Error::ObjectNotExist {
            bucket: UXOUTS_BUCKET,
            key: hash.to_string(),
        })
    }

    /// Records for the hashes that exist, in input order
    pub fn get_slice(&self, tx: &Tx<'_>, hashes: &[Hash]) -> Result<Vec<UxRecord>> {
        let mut out = Vec::with_capacity(hashes.len());
        for h in hashes {
            if let Some(rec) = self.get(tx, h)? {
                out.push(rec);
            }
        }
        Ok(out)
    }

    pub fn for_each(
        &self,
        tx: &Tx<'_>,
        mut f: impl FnMut(Hash, UxRecord) -> Result<()>,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Address;
    use crate::history::test_util::tmp_store;
    use crate::primitives::{UxBody, UxHead};

    fn ux(seed: u8) -> UxOut {
        UxOut {
            head: UxHead { time: 100, bk_seq: 1 },
            body: UxBody {
                src_transaction: Hash([seed; 32]),
                address: Address::new(0, [seed; 20]),
                coins: 1_000_000,
                hours: 5,
            },
        }
    }

    #[test]
    fn test_record_layout() {
        let mut rec = UxRecord::unspent(ux(1));
        assert_eq!(rec.to_bytes().len(), 86);
        rec.spent = Some(Spend {
            txid: Hash([2; 32]),
            block_seq: 3,
        });
        let b = rec.to_bytes();
        assert_eq!(b.len(), 126);
        assert_eq!(b.len(), rec.encode_size());
        assert_eq!(UxRecord::from_bytes(&b).unwrap(), rec);
    }

    #[test]
    fn test_mark_spent_is_write_once() {
        let mut rec = UxRecord::unspent(ux(1));
        let first = Spend {
            txid: Hash([2; 32]),
            block_seq: 3,
        };
        rec.mark_spent(first).unwrap();
        rec.mark_spent(first).unwrap();
        assert_eq!(rec.spent, Some(first));

        let other = Spend {
            txid: Hash([9; 32]),
            block_seq: 4,
        };
        assert!(matches!(
            rec.mark_spent(other),
            Err(Error::OutputAlreadySpent { .. })
        ));
        assert_eq!(rec.spent, Some(first));
    }

    #[test]
    fn test_set_get_and_lookup_modify_put() {
        let (_d, store) = tmp_store();
        let uxouts = UxOuts::new();
        let rec = UxRecord::unspent(ux(5));
        let h = rec.hash();
        store.update(|tx| uxouts.set(tx, &rec)).unwrap();

        store
            .update(|tx| {
                let mut r = uxouts.get_required(tx, &h)?;
                r.mark_spent(Spend {
                    txid: Hash([8; 32]),
                    block_seq: 2,
                })?;
                uxouts.set(tx, &r)
            })
            .unwrap();

        let got = store.view(|tx| uxouts.get(tx, &h)).unwrap().unwrap();
        assert_eq!(got.spent.map(|s| s.txid), Some(Hash([8; 32])));
        assert_eq!(got.out, rec.out);
    }

    #[test]
    fn test_missing_output() {
        let (_d, store) = tmp_store();
        let uxouts = UxOuts::new();
        let tx = store.begin_read();
        assert_eq!(uxouts.get(&tx, &Hash([1; 32])).unwrap(), None);
        let err = uxouts.get_required(&tx, &Hash([1; 32])).unwrap_err();
        assert!(err.is_not_found());
    }
}
