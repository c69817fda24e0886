// Address Management
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::hash::sha256_concat;
use crate::codec::{CodecError, FixedLayout, Reader};
use crate::error::Error;

pub const ADDRESS_KEY_BYTES: usize = 20;
pub const ADDRESS_BYTES: usize = 1 + ADDRESS_KEY_BYTES;
const CHECKSUM_BYTES: usize = 4;

/// Versioned public-key-hash address
///
/// Encoded (and used as an index key) as version byte then the 20-byte key.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Address {
    pub version: u8,
    pub key: [u8; ADDRESS_KEY_BYTES],
}

impl Address {
    pub fn new(version: u8, key: [u8; ADDRESS_KEY_BYTES]) -> Self {
        Address { version, key }
    }

    /// Bucket key bytes
    pub fn to_key(&self) -> [u8; ADDRESS_BYTES] {
        let mut k = [0u8; ADDRESS_BYTES];
        k[0] = self.version;
        k[1..].copy_from_slice(&self.key);
        k
    }

    pub fn from_key(b: &[u8]) -> Option<Address> {
        if b.len() != ADDRESS_BYTES {
            return None;
        }
        let mut key = [0u8; ADDRESS_KEY_BYTES];
        key.copy_from_slice(&b[1..]);
        Some(Address { version: b[0], key })
    }

    fn checksum(&self) -> [u8; CHECKSUM_BYTES] {
        let h = sha256_concat(&self.key, &[self.version]);
        let mut c = [0u8; CHECKSUM_BYTES];
        c.copy_from_slice(&h.0[..CHECKSUM_BYTES]);
        c
    }
}

/// Base58 of key + version + checksum(sha256(key + version))[0..4]
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(ADDRESS_BYTES + CHECKSUM_BYTES);
        raw.extend_from_slice(&self.key);
        raw.push(self.version);
        raw.extend_from_slice(&self.checksum());
        f.write_str(&bs58::encode(raw).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = bs58::decode(s)
            .into_vec()
            .map_err(|_| Error::InvalidAddress("invalid base58 encoding"))?;
        if raw.len() != ADDRESS_BYTES + CHECKSUM_BYTES {
            return Err(Error::InvalidAddress("invalid length"));
        }
        let mut key = [0u8; ADDRESS_KEY_BYTES];
        key.copy_from_slice(&raw[..ADDRESS_KEY_BYTES]);
        let addr = Address {
            version: raw[ADDRESS_KEY_BYTES],
            key,
        };
        if raw[ADDRESS_BYTES..] != addr.checksum() {
            return Err(Error::InvalidAddress("invalid checksum"));
        }
        Ok(addr)
    }
}

impl FixedLayout for Address {
    fn encode_size(&self) -> usize {
        ADDRESS_BYTES
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.push(self.version);
        buf.extend_from_slice(&self.key);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let version = r.u8()?;
        let key = r.array()?;
        Ok(Address { version, key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address::new(0, [0x5Au8; ADDRESS_KEY_BYTES])
    }

    #[test]
    fn test_string_roundtrip() {
        let a = sample();
        let s = a.to_string();
        assert_eq!(s.parse::<Address>().unwrap(), a);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let mut raw = bs58::decode(sample().to_string()).into_vec().unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let s = bs58::encode(raw).into_string();
        assert!(matches!(
            s.parse::<Address>(),
            Err(Error::InvalidAddress("invalid checksum"))
        ));
    }

    #[test]
    fn test_key_bytes_match_encoding() {
        let a = Address::new(3, [7u8; ADDRESS_KEY_BYTES]);
        assert_eq!(a.to_key().to_vec(), a.to_bytes());
        assert_eq!(Address::from_key(&a.to_key()), Some(a));
        assert_eq!(Address::from_key(&[0u8; 5]), None);
    }
}
