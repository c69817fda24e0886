// Data Structures: Unspent output
use serde::{Deserialize, Serialize};

use crate::codec::{CodecError, FixedLayout, Reader};
use crate::crypto::hash::hash_of;
use crate::crypto::{Address, Hash};

/// Where and when the output was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxHead {
    pub time: u64,
    pub bk_seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxBody {
    pub src_transaction: Hash,
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxOut {
    pub head: UxHead,
    pub body: UxBody,
}

impl UxOut {
    /// Output ID: SHA-256 of the encoded body. The head is excluded so the
    /// ID is known as soon as the creating transaction is.
    pub fn hash(&self) -> Hash {
        hash_of(&self.body)
    }
}

impl FixedLayout for UxHead {
    fn encode_size(&self) -> usize {
        16
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&self.bk_seq.to_le_bytes());
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(UxHead {
            time: r.u64()?,
            bk_seq: r.u64()?,
        })
    }
}

impl FixedLayout for UxBody {
    fn encode_size(&self) -> usize {
        self.src_transaction.encode_size() + self.address.encode_size() + 16
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.src_transaction.encode_to(buf);
        self.address.encode_to(buf);
        buf.extend_from_slice(&self.coins.to_le_bytes());
        buf.extend_from_slice(&self.hours.to_le_bytes());
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(UxBody {
            src_transaction: Hash::decode_from(r)?,
            address: Address::decode_from(r)?,
            coins: r.u64()?,
            hours: r.u64()?,
        })
    }
}

impl FixedLayout for UxOut {
    fn encode_size(&self) -> usize {
        self.head.encode_size() + self.body.encode_size()
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.head.encode_to(buf);
        self.body.encode_to(buf);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(UxOut {
            head: UxHead::decode_from(r)?,
            body: UxBody::decode_from(r)?,
        })
    }
}
