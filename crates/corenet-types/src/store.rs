// Path: crates/corenet-types/src/store.rs

use crate::error::CoreError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Structural flags carried by every store object.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
    pub struct StoreFlags: u8 {
        /// May only be replaced or erased by its original author.
        const PINNED = 0b0000_0001;
        /// Marks this record a tombstone rather than live data.
        const ERASE = 0b0000_0010;
        /// Set by the driver when an object is freshly created locally.
        const NEW = 0b0000_0100;
    }
}

/// The operation a store object represents on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpType {
    Add = 0x61,
    Del = 0x64,
}

impl OpType {
    pub fn from_byte(b: u8) -> Option<OpType> {
        match b {
            0x61 => Some(OpType::Add),
            0x64 => Some(OpType::Del),
            _ => None,
        }
    }
}

/// The group-scoped total order key: big-endian `(timestamp, crc)`.
///
/// Printed as `0x` followed by 16 lowercase hex chars for the timestamp and
/// 16 for the crc — 34 characters total. A driver hash of all zeros is
/// never valid in storage.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverHash {
    pub timestamp: u64,
    pub crc: u64,
}

impl DriverHash {
    pub fn is_blank(&self) -> bool {
        self.timestamp == 0 && self.crc == 0
    }
}

impl fmt::Display for DriverHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}{:016x}", self.timestamp, self.crc)
    }
}

impl fmt::Debug for DriverHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DriverHash({})", self)
    }
}

impl FromStr for DriverHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::MalformedDriverHash(s.to_string()))?;
        if body.len() != 32 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::MalformedDriverHash(s.to_string()));
        }
        let timestamp = u64::from_str_radix(&body[0..16], 16)
            .map_err(|_| CoreError::MalformedDriverHash(s.to_string()))?;
        let crc = u64::from_str_radix(&body[16..32], 16)
            .map_err(|_| CoreError::MalformedDriverHash(s.to_string()))?;
        Ok(DriverHash { timestamp, crc })
    }
}

const MAX_GROUP_LEN: usize = 128;
const MAX_KEY_LEN: usize = 512;

/// Validates a group name: UTF-8, at most 128 bytes, alphanumeric plus
/// `.`, `_`, `-`.
pub fn validate_group_name(group: &str) -> Result<(), CoreError> {
    if group.is_empty()
        || group.len() > MAX_GROUP_LEN
        || !group
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(CoreError::InvalidGroupName(group.to_string()));
    }
    Ok(())
}

/// The unit of replicated state in the global key/value store.
///
/// `(group, key)` is the logical primary key; `DriverHash(timestamp, crc)`
/// is the total order within a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreObject {
    pub group: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub flags: StoreFlags,
    /// Opaque, self-sized author signature. The core validates only its
    /// shape (non-empty when the object is not a bootstrap record); the
    /// signing scheme itself is an external collaborator.
    pub signature: Vec<u8>,
    /// Nanosecond creation timestamp.
    pub timestamp: u64,
    /// CRC-64 over `(group, key, value)`, used for integrity and ordering.
    pub crc: u64,
    pub op_type: OpType,
}

impl StoreObject {
    /// The `(timestamp, crc)` driver hash used as this object's total-order
    /// position within its group.
    pub fn driver_hash(&self) -> DriverHash {
        DriverHash {
            timestamp: self.timestamp,
            crc: self.crc,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.flags.contains(StoreFlags::PINNED)
    }

    pub fn is_erase(&self) -> bool {
        self.flags.contains(StoreFlags::ERASE)
    }

    /// `key.len() <= 512` and `group` passes `validate_group_name`.
    pub fn validate_shape(&self) -> Result<(), CoreError> {
        validate_group_name(&self.group)?;
        if self.key.len() > MAX_KEY_LEN {
            return Err(CoreError::KeyTooLong);
        }
        if self.driver_hash().is_blank() {
            return Err(CoreError::BlankDriverHash);
        }
        Ok(())
    }

    /// Deep copy, preserving the empty/non-empty-ness of every buffer
    /// individually (mirrors the C original's `store_obj_copy`).
    pub fn deep_copy(&self) -> StoreObject {
        self.clone()
    }

    /// Deep copy with a trailing opaque payload appended to `value`,
    /// mirroring the "extended" copy variant used by replication shims
    /// that smuggle transport-layer metadata alongside a record.
    pub fn deep_copy_extended(&self, extra: &[u8]) -> StoreObject {
        let mut copy = self.clone();
        copy.value.extend_from_slice(extra);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_hash_iff_zero_fields() {
        let blank = DriverHash {
            timestamp: 0,
            crc: 0,
        };
        assert!(blank.is_blank());
        let non_blank = DriverHash {
            timestamp: 1,
            crc: 0,
        };
        assert!(!non_blank.is_blank());
    }

    #[test]
    fn driver_hash_round_trip() {
        let h = DriverHash {
            timestamp: 0x1122_3344_5566_7788,
            crc: 0x99aa_bbcc_ddee_ff00,
        };
        let s = h.to_string();
        assert_eq!(s.len(), 34);
        let parsed: DriverHash = s.parse().expect("parse");
        assert_eq!(h, parsed);
    }

    #[test]
    fn group_name_validation() {
        assert!(validate_group_name("local.node.last_id").is_ok());
        assert!(validate_group_name("bad group!").is_err());
        assert!(validate_group_name(&"a".repeat(129)).is_err());
    }

    #[test]
    fn object_validate_shape_rejects_blank_hash() {
        let obj = StoreObject {
            group: "g".into(),
            key: b"k".to_vec(),
            value: vec![],
            flags: StoreFlags::empty(),
            signature: vec![],
            timestamp: 0,
            crc: 0,
            op_type: OpType::Add,
        };
        assert_eq!(obj.validate_shape(), Err(CoreError::BlankDriverHash));
    }
}
