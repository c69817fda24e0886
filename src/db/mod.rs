// Embedded storage: RocksDB TransactionDB, transaction handles, buckets
pub mod bucket;
pub mod store;

pub use bucket::Bucket;
pub use store::{Store, Tx};
