// Cross-codec verification
//
// Walks every bucket and checks that each stored value decodes to the same
// record with FixedCodec and ReflectCodec, and that both re-encode to the
// exact stored bytes. Any disagreement is fatal and names bucket and key.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};

use super::meta::VERSION_KEY;
use super::{
    ADDRESS_TXNS_BUCKET, ADDRESS_UX_BUCKET, BLOCK_SIGS_BUCKET, CHAIN_META_BUCKET,
    HISTORY_META_BUCKET, TRANSACTIONS_BUCKET, TxRecord, UXOUTS_BUCKET, UxRecord,
};
use crate::codec::{Codec, FixedCodec, FixedLayout, ReflectCodec};
use crate::crypto::{Hash, Sig};
use crate::db::{Bucket, Store, Tx};
use crate::error::{Error, Result};

/// Records checked per bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub buckets: Vec<(&'static str, usize)>,
}

impl VerifyReport {
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, n)| n).sum()
    }
}

/// Verify every record in a snapshot of `store`. Setting `quit` stops the
/// walk before the next record with `VerifyStopped`.
pub fn verify_codec(store: &Store, quit: &AtomicBool) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    store.view(|tx| {
        report
            .buckets
            .push((TRANSACTIONS_BUCKET, walk::<TxRecord>(tx, TRANSACTIONS_BUCKET, quit)?));
        report
            .buckets
            .push((UXOUTS_BUCKET, walk::<UxRecord>(tx, UXOUTS_BUCKET, quit)?));
        report
            .buckets
            .push((ADDRESS_TXNS_BUCKET, walk::<Vec<Hash>>(tx, ADDRESS_TXNS_BUCKET, quit)?));
        report
            .buckets
            .push((ADDRESS_UX_BUCKET, walk::<Vec<Hash>>(tx, ADDRESS_UX_BUCKET, quit)?));
        report
            .buckets
            .push((BLOCK_SIGS_BUCKET, walk::<Sig>(tx, BLOCK_SIGS_BUCKET, quit)?));
        report
            .buckets
            .push((HISTORY_META_BUCKET, walk_meta(tx, HISTORY_META_BUCKET, quit)?));
        report
            .buckets
            .push((CHAIN_META_BUCKET, walk_meta(tx, CHAIN_META_BUCKET, quit)?));
        Ok(())
    })?;
    tracing::info!("[verify] {} records agree across codecs", report.total());
    Ok(report)
}

fn walk<T>(tx: &Tx<'_>, bucket: &'static str, quit: &AtomicBool) -> Result<usize>
where
    T: FixedLayout + Serialize + DeserializeOwned + PartialEq + Debug,
{
    let mut n = 0usize;
    Bucket::new(bucket).for_each(tx, |k, v| {
        if quit.load(Ordering::Relaxed) {
            return Err(Error::VerifyStopped);
        }
        check::<T>(bucket, k, v)?;
        n += 1;
        Ok(())
    })?;
    tracing::debug!("[verify] {}: {} records", bucket, n);
    Ok(n)
}

// meta buckets mix value types by key
fn walk_meta(tx: &Tx<'_>, bucket: &'static str, quit: &AtomicBool) -> Result<usize> {
    let mut n = 0usize;
    Bucket::new(bucket).for_each(tx, |k, v| {
        if quit.load(Ordering::Relaxed) {
            return Err(Error::VerifyStopped);
        }
        if k == VERSION_KEY {
            check::<u32>(bucket, k, v)?;
        } else {
            check::<u64>(bucket, k, v)?;
        }
        n += 1;
        Ok(())
    })?;
    Ok(n)
}

/// Check one stored value: both codecs must decode it to the same record and
/// re-encode that record to the same bytes.
pub fn check<T>(bucket: &'static str, key: &[u8], data: &[u8]) -> Result<()>
where
    T: FixedLayout + Serialize + DeserializeOwned + PartialEq + Debug,
{
    let mismatch = |detail: String| Error::CodecMismatch {
        bucket,
        key: hex::encode(key),
        detail,
    };

    let fixed: T = <FixedCodec as Codec<T>>::decode(data).map_err(|source| Error::Decode {
        bucket,
        key: hex::encode(key),
        source,
    })?;
    let reflect_name = <ReflectCodec as Codec<T>>::NAME;
    let reflected: T = <ReflectCodec as Codec<T>>::decode(data)
        .map_err(|e| mismatch(format!("{reflect_name} decode failed: {e}")))?;
    if fixed != reflected {
        return Err(mismatch(format!(
            "decoded records differ: {fixed:?} != {reflected:?}"
        )));
    }

    let fixed_bytes = <FixedCodec as Codec<T>>::encode(&fixed)?;
    let reflect_bytes = <ReflectCodec as Codec<T>>::encode(&fixed)
        .map_err(|e| mismatch(format!("{reflect_name} encode failed: {e}")))?;
    if fixed_bytes != reflect_bytes {
        return Err(mismatch("encodings differ".to_string()));
    }
    if fixed_bytes != data {
        return Err(mismatch("re-encoding differs from stored bytes".to_string()));
    }
    if fixed.encode_size() != data.len() {
        return Err(mismatch(format!(
            "encode_size {} != stored length {}",
            fixed.encode_size(),
            data.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, Reader};
    use crate::config::DbConfig;
    use crate::crypto::Address;
    use crate::history::HistoryDb;
    use crate::primitives::{Block, Transaction, TransactionOutput};
    use serde::Deserialize;
    use tempfile::TempDir;

    fn populated() -> (TempDir, HistoryDb) {
        let dir = TempDir::new().unwrap();
        let db = HistoryDb::open(&DbConfig::ephemeral(dir.path())).unwrap();
        let tx = Transaction::new(
            vec![],
            vec![TransactionOutput {
                address: Address::new(0, [4; 20]),
                coins: 5,
                hours: 6,
            }],
            vec![Sig([3; 65])],
        );
        let block = Block::new(None, 10, 0, vec![tx]);
        db.process_block(&block).unwrap();
        db.add_block_sig(&block.hash(), &Sig([9; 65])).unwrap();
        db.set_head_seq(0).unwrap();
        (dir, db)
    }

    #[test]
    fn test_populated_db_verifies() {
        let (_d, db) = populated();
        let report = verify_codec(db.store(), &AtomicBool::new(false)).unwrap();
        let count = |name: &str| report.buckets.iter().find(|(n, _)| *n == name).map(|b| b.1);
        assert_eq!(count(TRANSACTIONS_BUCKET), Some(1));
        assert_eq!(count(UXOUTS_BUCKET), Some(1));
        assert_eq!(count(BLOCK_SIGS_BUCKET), Some(1));
        assert_eq!(count(HISTORY_META_BUCKET), Some(2));
        assert_eq!(count(CHAIN_META_BUCKET), Some(1));
        assert_eq!(report.total(), 8);
    }

    #[test]
    fn test_stop_signal() {
        let (_d, db) = populated();
        let quit = AtomicBool::new(true);
        assert!(matches!(
            verify_codec(db.store(), &quit),
            Err(Error::VerifyStopped)
        ));
    }

    #[test]
    fn test_corrupt_record_names_bucket() {
        let (_d, db) = populated();
        db.store()
            .update(|tx| tx.put(UXOUTS_BUCKET, &[0x11; 32], &[1, 2, 3]))
            .unwrap();
        match verify_codec(db.store(), &AtomicBool::new(false)) {
            Err(Error::Decode { bucket, key, .. }) => {
                assert_eq!(bucket, UXOUTS_BUCKET);
                assert_eq!(key, hex::encode([0x11; 32]));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    // fixed layout writes big-endian, so the codecs disagree
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Skewed(u32);

    impl FixedLayout for Skewed {
        fn encode_size(&self) -> usize {
            4
        }

        fn encode_to(&self, buf: &mut Vec<u8>) {
            buf.extend_from_slice(&self.0.to_be_bytes());
        }

        fn decode_from(r: &mut Reader<'_>) -> std::result::Result<Self, CodecError> {
            Ok(Skewed(u32::from_be_bytes(r.array()?)))
        }
    }

    #[test]
    fn test_disagreeing_codecs_reported() {
        let err = check::<Skewed>("skewed", b"k", &[0, 0, 0, 1]).unwrap_err();
        match err {
            Error::CodecMismatch { bucket, key, .. } => {
                assert_eq!(bucket, "skewed");
                assert_eq!(key, hex::encode(b"k"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // palindromic bytes decode alike either way
        check::<Skewed>("skewed", b"k", &[7, 7, 7, 7]).unwrap();
    }
}
