// Codec tests: FixedCodec ↔ ReflectCodec over randomly generated records
//
// Seeded so a failure reproduces with the same records.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

use skyhistory::codec::{Codec, CodecError, FixedCodec, FixedLayout, ReflectCodec};
use skyhistory::crypto::{Address, Hash, Sig};
use skyhistory::history::verify::check;
use skyhistory::history::{Spend, TxRecord, UxRecord};
use skyhistory::primitives::{
    Block, BlockHeader, Transaction, TransactionOutput, UxBody, UxHead, UxOut,
};

const RECORDS: usize = 1000;

fn hash(rng: &mut StdRng) -> Hash {
    Hash(rng.r#gen())
}

fn sig(rng: &mut StdRng) -> Sig {
    let mut b = [0u8; 65];
    rng.fill(&mut b[..]);
    Sig(b)
}

fn address(rng: &mut StdRng) -> Address {
    Address::new(rng.r#gen(), rng.r#gen())
}

fn output(rng: &mut StdRng) -> TransactionOutput {
    TransactionOutput {
        address: address(rng),
        coins: rng.r#gen(),
        hours: rng.r#gen(),
    }
}

fn transaction(rng: &mut StdRng) -> Transaction {
    let n_in = rng.gen_range(0..5);
    let n_out = rng.gen_range(0..5);
    let inputs = (0..n_in).map(|_| hash(rng)).collect();
    let outputs = (0..n_out).map(|_| output(rng)).collect();
    let sigs = (0..n_in).map(|_| sig(rng)).collect();
    let mut tx = Transaction::new(inputs, outputs, sigs);
    tx.tx_type = rng.r#gen();
    tx
}

fn uxout(rng: &mut StdRng) -> UxOut {
    UxOut {
        head: UxHead {
            time: rng.r#gen(),
            bk_seq: rng.r#gen(),
        },
        body: UxBody {
            src_transaction: hash(rng),
            address: address(rng),
            coins: rng.r#gen(),
            hours: rng.r#gen(),
        },
    }
}

fn ux_record(rng: &mut StdRng) -> UxRecord {
    let spent = rng.gen_bool(0.5).then(|| Spend {
        txid: hash(rng),
        block_seq: rng.r#gen(),
    });
    UxRecord {
        out: uxout(rng),
        spent,
    }
}

fn tx_record(rng: &mut StdRng) -> TxRecord {
    TxRecord {
        txn: transaction(rng),
        block_seq: rng.r#gen(),
    }
}

fn header(rng: &mut StdRng) -> BlockHeader {
    BlockHeader {
        version: rng.r#gen(),
        time: rng.r#gen(),
        seq: rng.r#gen(),
        fee: rng.r#gen(),
        prev_hash: hash(rng),
        body_hash: hash(rng),
        ux_hash: hash(rng),
    }
}

fn block(rng: &mut StdRng) -> Block {
    let n = rng.gen_range(0..4);
    Block {
        head: header(rng),
        body: (0..n).map(|_| transaction(rng)).collect(),
    }
}

fn hash_list(rng: &mut StdRng) -> Vec<Hash> {
    let n = rng.gen_range(0..20);
    (0..n).map(|_| hash(rng)).collect()
}

/// Round-trip, size and cross-codec agreement for `RECORDS` generated values
fn agree<T>(seed: u64, mut generate: impl FnMut(&mut StdRng) -> T)
where
    T: FixedLayout + Serialize + DeserializeOwned + PartialEq + Debug,
{
    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..RECORDS {
        let x = generate(&mut rng);
        let fixed = <FixedCodec as Codec<T>>::encode(&x).unwrap();
        assert_eq!(fixed.len(), x.encode_size(), "encode_size of {x:?}");

        let back: T = <FixedCodec as Codec<T>>::decode(&fixed).unwrap();
        assert_eq!(back, x);

        let reflected: T = <ReflectCodec as Codec<T>>::decode(&fixed).unwrap();
        assert_eq!(reflected, x);

        let reflect_bytes = <ReflectCodec as Codec<T>>::encode(&x).unwrap();
        assert_eq!(reflect_bytes, fixed, "encodings differ for {x:?}");

        check::<T>("generated", b"k", &fixed).unwrap();
    }
}

#[test]
fn test_hash_lists_agree() {
    agree(1, hash_list);
}

#[test]
fn test_signatures_agree() {
    agree(2, sig);
}

#[test]
fn test_transactions_agree() {
    agree(3, transaction);
}

#[test]
fn test_tx_records_agree() {
    agree(4, tx_record);
}

#[test]
fn test_uxouts_agree() {
    agree(5, uxout);
}

#[test]
fn test_ux_records_agree() {
    agree(6, ux_record);
}

#[test]
fn test_block_headers_agree() {
    agree(7, header);
}

#[test]
fn test_blocks_agree() {
    agree(8, block);
}

#[test]
fn test_meta_values_agree() {
    agree(9, |rng| rng.r#gen::<u64>());
    agree(10, |rng| rng.r#gen::<u32>());
}

// ========== MALFORMED INPUT ==========

#[test]
fn test_truncated_records_fail_in_both_codecs() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let rec = ux_record(&mut rng);
        let bytes = rec.to_bytes();
        let cut = rng.gen_range(0..bytes.len());
        let short = &bytes[..cut];

        let fixed = <FixedCodec as Codec<UxRecord>>::decode(short).unwrap_err();
        let reflected = <ReflectCodec as Codec<UxRecord>>::decode(short).unwrap_err();
        assert!(matches!(fixed, CodecError::BufferUnderflow { .. }), "{fixed}");
        assert!(matches!(reflected, CodecError::BufferUnderflow { .. }), "{reflected}");
    }
}

#[test]
fn test_trailing_bytes_fail_in_both_codecs() {
    let mut rng = StdRng::seed_from_u64(12);
    let mut bytes = tx_record(&mut rng).to_bytes();
    bytes.extend_from_slice(&[0, 0, 0]);

    assert_eq!(
        <FixedCodec as Codec<TxRecord>>::decode(&bytes).unwrap_err(),
        CodecError::RemainingBytes(3)
    );
    assert_eq!(
        <ReflectCodec as Codec<TxRecord>>::decode(&bytes).unwrap_err(),
        CodecError::RemainingBytes(3)
    );
}

#[test]
fn test_bad_spent_flag_rejected() {
    let mut rng = StdRng::seed_from_u64(13);
    let mut rec = ux_record(&mut rng);
    rec.spent = None;
    let mut bytes = rec.to_bytes();
    let flag = bytes.len() - 1;
    bytes[flag] = 2;

    assert_eq!(
        <FixedCodec as Codec<UxRecord>>::decode(&bytes).unwrap_err(),
        CodecError::InvalidFlag(2)
    );
    assert_eq!(
        <ReflectCodec as Codec<UxRecord>>::decode(&bytes).unwrap_err(),
        CodecError::InvalidFlag(2)
    );
}
