//! Error types for the image store.

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised while reading or writing image documents.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A `RocksDB` read, write or flush failed.
    #[error("database error: {0}")]
    Database(#[from] rocksdb::Error),

    /// The open database lacks a column family the schema requires.
    #[error("column family not found: {0}")]
    MissingColumnFamily(&'static str),

    /// An image document could not be encoded as CBOR.
    #[error("failed to encode image document: {0}")]
    Encode(String),

    /// A stored image document could not be decoded.
    #[error("failed to decode image document: {0}")]
    Decode(String),

    /// The store refused to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
