// Skyhistory: transactional blockchain history index
//
// Layers, leaf first:
//   db         RocksDB TransactionDB, read/write transaction handles, buckets
//   codec      fixed-layout record codec + serde-driven reference codec
//   history    primary stores, address indices, metadata, block indexer, verifier

pub mod codec;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod history;
pub mod primitives;

pub use error::{Error, Result};
