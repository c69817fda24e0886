// Cryptographic Hashing Wrappers
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::codec::{CodecError, FixedLayout, Reader};

pub const HASH_BYTES: usize = 32;

/// SHA-256 content identifier for transactions, outputs and blocks
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(pub [u8; HASH_BYTES]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; HASH_BYTES]);

    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_BYTES]
    }

    pub fn from_slice(b: &[u8]) -> Option<Hash> {
        <[u8; HASH_BYTES]>::try_from(b).ok().map(Hash)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut h = [0u8; HASH_BYTES];
        hex::decode_to_slice(s, &mut h)?;
        Ok(Hash(h))
    }
}

impl FixedLayout for Hash {
    fn encode_size(&self) -> usize {
        HASH_BYTES
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Hash(r.array()?))
    }
}

/// SHA-256 of a byte string
pub fn sha256(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// SHA-256 Concat: hashes a then b without allocating a temporary Vec
pub fn sha256_concat(a: &[u8], b: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    Hash(hasher.finalize().into())
}

/// SHA-256 of a record's fixed-layout encoding
pub fn hash_of<T: FixedLayout>(value: &T) -> Hash {
    sha256(&value.to_bytes())
}
