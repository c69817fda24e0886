// Crate-wide error type for storage, codec and indexing failures

use crate::codec::CodecError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bucket {bucket} does not exist")]
    BucketNotExist { bucket: &'static str },

    /// Internal lookups that require a record; `get`-style APIs return `None` instead
    #[error("object {key} does not exist in bucket {bucket}")]
    ObjectNotExist { bucket: &'static str, key: String },

    #[error("create bucket {bucket} failed: {source}")]
    CreateBucketFailed {
        bucket: String,
        #[source]
        source: rocksdb::Error,
    },

    #[error("bucket {bucket} key {key}: {source}")]
    Decode {
        bucket: &'static str,
        key: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("codec mismatch in bucket {bucket} key {key}: {detail}")]
    CodecMismatch {
        bucket: &'static str,
        key: String,
        detail: String,
    },

    #[error("no matching signature for block {hash}")]
    MissingSignature { hash: String },

    #[error("output {hash} already spent by {spent_by}")]
    OutputAlreadySpent { hash: String, spent_by: String },

    #[error("verification stopped")]
    VerifyStopped,

    #[error("write attempted through a read-only transaction")]
    TxNotWritable,

    #[error("block {seq} not available from source")]
    BlockNotFound { seq: u64 },

    #[error("invalid address: {0}")]
    InvalidAddress(&'static str),

    #[error("storage: {0}")]
    Storage(#[from] rocksdb::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectNotExist { .. })
    }
}
