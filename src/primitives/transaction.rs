// Data Structures: Transaction
use serde::{Deserialize, Serialize};

use crate::codec::{CodecError, FixedLayout, Reader};
use crate::crypto::hash::{hash_of, sha256};
use crate::crypto::{Address, Hash, Sig};

/// Transaction output: a new balance owned by `address`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub address: Address,
    pub coins: u64,
    pub hours: u64,
}

impl FixedLayout for TransactionOutput {
    fn encode_size(&self) -> usize {
        self.address.encode_size() + 16
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        self.address.encode_to(buf);
        buf.extend_from_slice(&self.coins.to_le_bytes());
        buf.extend_from_slice(&self.hours.to_le_bytes());
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(TransactionOutput {
            address: Address::decode_from(r)?,
            coins: r.u64()?,
            hours: r.u64()?,
        })
    }
}

/// Finalized transaction body
///
/// Serialization Format:
///   [0..4]    length (LE u32, encoded size of the whole transaction)
///   [4]       type
///   [5..37]   inner hash
///   then      sigs    (u32 count, 65 bytes each)
///   then      inputs  (u32 count, 32-byte uxout hashes)
///   then      outputs (u32 count, 37 bytes each)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub length: u32,
    pub tx_type: u8,
    pub inner_hash: Hash,
    pub sigs: Vec<Sig>,
    pub inputs: Vec<Hash>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// Builds a transaction with `length` and `inner_hash` filled in.
    /// One signature slot per input.
    pub fn new(inputs: Vec<Hash>, outputs: Vec<TransactionOutput>, sigs: Vec<Sig>) -> Self {
        let mut tx = Transaction {
            length: 0,
            tx_type: 0,
            inner_hash: Hash::ZERO,
            sigs,
            inputs,
            outputs,
        };
        tx.inner_hash = tx.hash_inner();
        tx.length = tx.encode_size() as u32;
        tx
    }

    /// Transaction ID: SHA-256 of the full encoding
    pub fn hash(&self) -> Hash {
        hash_of(self)
    }

    /// SHA-256 of the encoded inputs and outputs (what the signatures commit to)
    pub fn hash_inner(&self) -> Hash {
        let mut b = Vec::with_capacity(self.inputs.encode_size() + self.outputs.encode_size());
        self.inputs.encode_to(&mut b);
        self.outputs.encode_to(&mut b);
        sha256(&b)
    }

    /// Addresses receiving outputs, in output order
    pub fn output_addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.outputs.iter().map(|o| o.address)
    }
}

impl FixedLayout for Transaction {
    fn encode_size(&self) -> usize {
        4 + 1
            + self.inner_hash.encode_size()
            + self.sigs.encode_size()
            + self.inputs.encode_size()
            + self.outputs.encode_size()
    }

    fn encode_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.length.to_le_bytes());
        buf.push(self.tx_type);
        self.inner_hash.encode_to(buf);
        self.sigs.encode_to(buf);
        self.inputs.encode_to(buf);
        self.outputs.encode_to(buf);
    }

    fn decode_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Transaction {
            length: r.u32()?,
            tx_type: r.u8()?,
            inner_hash: Hash::decode_from(r)?,
            sigs: Vec::decode_from(r)?,
            inputs: Vec::decode_from(r)?,
            outputs: Vec::decode_from(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(seed: u8, coins: u64) -> TransactionOutput {
        TransactionOutput {
            address: Address::new(0, [seed; 20]),
            coins,
            hours: 10,
        }
    }

    #[test]
    fn test_new_fills_length_and_inner_hash() {
        let tx = Transaction::new(vec![Hash([1u8; 32])], vec![out(2, 1_000_000)], vec![Sig::default()]);
        assert_eq!(tx.length as usize, tx.to_bytes().len());
        assert_eq!(tx.inner_hash, tx.hash_inner());
        assert!(!tx.inner_hash.is_zero());
    }

    #[test]
    fn test_encode_layout() {
        let tx = Transaction::new(vec![], vec![out(3, 5)], vec![]);
        let b = tx.to_bytes();
        // length + type + inner + 3 counts + one 37-byte output
        assert_eq!(b.len(), 4 + 1 + 32 + 4 + 4 + 4 + 37);
        assert_eq!(&b[0..4], &(b.len() as u32).to_le_bytes());
        assert_eq!(Transaction::from_bytes(&b).unwrap(), tx);
    }

    #[test]
    fn test_hash_depends_on_outputs() {
        let a = Transaction::new(vec![], vec![out(3, 5)], vec![]);
        let b = Transaction::new(vec![], vec![out(3, 6)], vec![]);
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), a.clone().hash());
    }

    #[test]
    fn test_truncated_transaction() {
        let tx = Transaction::new(vec![Hash([9u8; 32])], vec![out(1, 1)], vec![Sig::default()]);
        let b = tx.to_bytes();
        assert!(matches!(
            Transaction::from_bytes(&b[..b.len() - 1]),
            Err(CodecError::BufferUnderflow { .. })
        ));
    }
}
