// Data Structures: Block
use serde::{Deserialize, Serialize};

use super::transaction::Transaction;
use super::uxout::{UxBody, UxHead, UxOut};
use crate::codec::{CodecError, FixedLayout, Reader};
use crate::crypto::Hash;
use crate::crypto::hash::{hash_of, sha256};

pub const BLOCK_HEADER_BYTES: usize = 4 + 8 + 8 + 8 + 32 + 32 + 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub time: u64,
    /// Block height; genesis is 0
    pub seq: u64,
    pub fee: u64,
    pub prev_hash: Hash,
    pub body_hash: Hash,
    pub ux_hash: Hash,
}

impl BlockHeader {
    /// Block hash: SHA-256 of the encoded header
    pub fn hash(&self) -> Hash {
        hash_of(self)
    }
}

impl FixedLayout for BlockHeader {
    fn encode_size(&self) -> usize {
        BLOCK_HEADER_BYTES
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.extend_from_slice(&self.seq.to_le_bytes());
        buf.extend_from_slice(&self.fee.to_le_bytes());
        self.prev_hash.encode_to(buf);
        self.body_hash.encode_to(buf);
        self.ux_hash.encode_to(buf);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(BlockHeader {
            version: r.u32()?,
            time: r.u64()?,
            seq: r.u64()?,
            fee: r.u64()?,
            prev_hash: Hash::decode_from(r)?,
            body_hash: Hash::decode_from(r)?,
            ux_hash: Hash::decode_from(r)?,
        })
    }
}

/// A finalized block: header and ordered transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub head: BlockHeader,
    pub body: Vec<Transaction>,
}

impl Block {
    /// Assembles a block on top of `prev`, filling `body_hash`
    pub fn new(prev: Option<&BlockHeader>, time: u64, fee: u64, body: Vec<Transaction>) -> Self {
        let (seq, prev_hash) = match prev {
            Some(p) => (p.seq + 1, p.hash()),
            None => (0, Hash::ZERO),
        };
        let head = BlockHeader {
            version: 0,
            time,
            seq,
            fee,
            prev_hash,
            body_hash: Self::body_hash(&body),
            ux_hash: Hash::ZERO,
        };
        Block { head, body }
    }

    pub fn hash(&self) -> Hash {
        self.head.hash()
    }

    pub fn seq(&self) -> u64 {
        self.head.seq
    }

    /// SHA-256 over the concatenated transaction IDs
    pub fn body_hash(body: &[Transaction]) -> Hash {
        let mut b = Vec::with_capacity(body.len() * 32);
        for tx in body {
            b.extend_from_slice(tx.hash().as_bytes());
        }
        sha256(&b)
    }

    /// Outputs created by transaction `tx`, stamped with this block's time and height
    pub fn created_outputs<'a>(&'a self, tx: &'a Transaction) -> impl Iterator<Item = UxOut> + 'a {
        let src_transaction = tx.hash();
        let head = UxHead {
            time: self.head.time,
            bk_seq: self.head.seq,
        };
        tx.outputs.iter().map(move |o| UxOut {
            head,
            body: UxBody {
                src_transaction,
                address: o.address,
                coins: o.coins,
                hours: o.hours,
            },
        })
    }
}

impl FixedLayout for Block {
    fn encode_size(&self) -> usize {
        self.head.encode_size() + self.body.encode_size()
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.head.encode_to(buf);
        self.body.encode_to(buf);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Block {
            head: BlockHeader::decode_from(r)?,
            body: Vec::decode_from(r)?,
        })
    }
}
