// BlockSigs bucket: block hash[32] → signature[65]
use super::{BLOCK_SIGS_BUCKET, key_hash};
use crate::crypto::{Hash, Sig};
use crate::db::{Bucket, Tx};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct BlockSigs {
    bucket: Bucket,
}

impl BlockSigs {
    pub const fn new() -> Self {
        BlockSigs {
            bucket: Bucket::new(BLOCK_SIGS_BUCKET),
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn get(&self, tx: &Tx<'_>, hash: &Hash) -> Result<Option<Sig>> {
        self.bucket.get_decoded(tx, hash.as_bytes())
    }

    pub fn get_required(&self, tx: &Tx<'_>, hash: &Hash) -> Result<Sig> {
        self.get(tx, hash)?.ok_or_else(|| Error::MissingSignature {
            hash: hash.to_string(),
        })
    }

    /// A block has at most one signature. Storing the same signature again is
    /// a no-op; storing a different one fails and leaves the existing one.
    pub fn add(&self, tx: &Tx<'_>, hash: &Hash, sig: &Sig) -> Result<()> {
        match self.get(tx, hash)? {
            Some(existing) if existing == *sig => Ok(()),
            Some(_) => Err(Error::MissingSignature {
                hash: hash.to_string(),
            }),
            None => self.bucket.put_encoded(tx, hash.as_bytes(), sig),
        }
    }

    pub fn for_each(&self, tx: &Tx<'_>, mut f: impl FnMut(Hash, Sig) -> Result<()>) -> Result<()> {
        let bucket = self.bucket;
        bucket.for_each_decoded(tx, |k, sig| f(key_hash(bucket, k)?, sig))
    }

    pub fn len(&self, tx: &Tx<'_>) -> Result<usize> {
        self.bucket.len(tx)
    }

    pub fn is_empty(&self, tx: &Tx<'_>) -> Result<bool> {
        self.bucket.is_empty(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::test_util::tmp_store;

    #[test]
    fn test_add_and_get() {
        let (_d, store) = tmp_store();
        let sigs = BlockSigs::new();
        let h = Hash([1; 32]);
        let sig = Sig([7; 65]);
        store.update(|tx| sigs.add(tx, &h, &sig)).unwrap();

        let tx = store.begin_read();
        assert_eq!(sigs.get(&tx, &h).unwrap(), Some(sig));
        assert_eq!(sigs.get_required(&tx, &h).unwrap(), sig);
        assert_eq!(sigs.len(&tx).unwrap(), 1);
    }

    #[test]
    fn test_missing_signature() {
        let (_d, store) = tmp_store();
        let sigs = BlockSigs::new();
        let tx = store.begin_read();
        assert_eq!(sigs.get(&tx, &Hash([2; 32])).unwrap(), None);
        assert!(matches!(
            sigs.get_required(&tx, &Hash([2; 32])),
            Err(Error::MissingSignature { .. })
        ));
    }

    #[test]
    fn test_signature_is_write_once() {
        let (_d, store) = tmp_store();
        let sigs = BlockSigs::new();
        let h = Hash([3; 32]);
        let first = Sig([1; 65]);
        store.update(|tx| sigs.add(tx, &h, &first)).unwrap();
        store.update(|tx| sigs.add(tx, &h, &first)).unwrap();

        let err = store.update(|tx| sigs.add(tx, &h, &Sig([2; 65]))).unwrap_err();
        assert!(matches!(err, Error::MissingSignature { .. }));
        assert_eq!(store.view(|tx| sigs.get(tx, &h)).unwrap(), Some(first));
    }

    #[test]
    fn test_for_each() {
        let (_d, store) = tmp_store();
        let sigs = BlockSigs::new();
        store
            .update(|tx| {
                sigs.add(tx, &Hash([2; 32]), &Sig([2; 65]))?;
                sigs.add(tx, &Hash([1; 32]), &Sig([1; 65]))
            })
            .unwrap();
        let mut keys = Vec::new();
        store
            .view(|tx| {
                sigs.for_each(tx, |h, _| {
                    keys.push(h);
                    Ok(())
                })
            })
            .unwrap();
        assert_eq!(keys, vec![Hash([1; 32]), Hash([2; 32])]);
    }
}
