// Path: crates/corenet-gdb/src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GdbError {
    #[error("operation not supported by this driver")]
    NotSupported,
    #[error("unsupported driver name: {0}")]
    UnsupportedDriver(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid group name: {0}")]
    InvalidGroup(String),
    #[error("no transaction in progress")]
    NoActiveTransaction,
    #[error("a transaction is already in progress")]
    TransactionAlreadyActive,
    #[error("pinned record can only be replaced or erased by its original author")]
    PinnedByAnotherAuthor,
    #[error("bad glob pattern: {0}")]
    BadPattern(String),
}
