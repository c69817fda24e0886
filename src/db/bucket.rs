// Named collection scoped to one column family
//
// Holds no transaction state: every operation runs inside the `Tx` the caller
// passes in.

use super::store::Tx;
use crate::codec::FixedLayout;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    name: &'static str,
}

impl Bucket {
    pub const fn new(name: &'static str) -> Self {
        Bucket { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, tx: &Tx<'_>, key: &[u8]) -> Result<Option<Vec<u8>>> {
        tx.get(self.name, key)
    }

    pub fn put(&self, tx: &Tx<'_>, key: &[u8], value: &[u8]) -> Result<()> {
        tx.put(self.name, key, value)
    }

    pub fn delete(&self, tx: &Tx<'_>, key: &[u8]) -> Result<()> {
        tx.delete(self.name, key)
    }

    pub fn for_each(&self, tx: &Tx<'_>, f: impl FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
        tx.for_each(self.name, f)
    }

    pub fn len(&self, tx: &Tx<'_>) -> Result<usize> {
        let mut n = 0usize;
        self.for_each(tx, |_, _| {
            n += 1;
            Ok(())
        })?;
        Ok(n)
    }

    pub fn is_empty(&self, tx: &Tx<'_>) -> Result<bool> {
        tx.is_empty(self.name)
    }

    /// Remove every entry. The bucket itself keeps existing.
    pub fn reset(&self, tx: &Tx<'_>) -> Result<()> {
        let mut keys = Vec::new();
        self.for_each(tx, |k, _| {
            keys.push(k.to_vec());
            Ok(())
        })?;
        for k in &keys {
            self.delete(tx, k)?;
        }
        tracing::debug!("[db] reset {} ({} keys)", self.name, keys.len());
        Ok(())
    }

    // ========== TYPED ACCESS ==========

    /// Decode the value at `key`; corruption is reported with bucket and key
    pub fn get_decoded<T: FixedLayout>(&self, tx: &Tx<'_>, key: &[u8]) -> Result<Option<T>> {
        match self.get(tx, key)? {
            Some(data) => Ok(Some(self.decode(key, &data)?)),
            None => Ok(None),
        }
    }

    pub fn put_encoded<T: FixedLayout>(&self, tx: &Tx<'_>, key: &[u8], value: &T) -> Result<()> {
        self.put(tx, key, &value.to_bytes())
    }

    pub fn for_each_decoded<T: FixedLayout>(
        &self,
        tx: &Tx<'_>,
        mut f: impl FnMut(&[u8], T) -> Result<()>,
    ) -> Result<()> {
        self.for_each(tx, |k, v| f(k, self.decode(k, v)?))
    }

    pub fn decode<T: FixedLayout>(&self, key: &[u8], data: &[u8]) -> Result<T> {
        T::from_bytes(data).map_err(|source| Error::Decode {
            bucket: self.name,
            key: hex::encode(key),
            source,
        })
    }
}
