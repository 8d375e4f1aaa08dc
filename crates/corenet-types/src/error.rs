// Path: crates/corenet-types/src/error.rs

use thiserror::Error;

/// Errors shared by every core module for malformed external input.
///
/// Per-module crates define their own richer error enums; this one covers
/// the structural parse/validate failures that show up at more than one
/// layer (address strings, driver hashes, config values).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("malformed node address: {0}")]
    MalformedAddress(String),
    #[error("malformed guuid: {0}")]
    MalformedGuuid(String),
    #[error("malformed driver hash: {0}")]
    MalformedDriverHash(String),
    #[error("group name exceeds 128 bytes or contains disallowed characters: {0}")]
    InvalidGroupName(String),
    #[error("key exceeds 512 bytes")]
    KeyTooLong,
    #[error("truncated packet: can't read field {0}")]
    TruncatedPacket(&'static str),
    #[error("blank driver hash is never valid in storage")]
    BlankDriverHash,
}
