// Path: crates/corenet-types/src/addr.rs

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 64-bit opaque node identifier.
///
/// Printed and parsed as four colon-separated big-endian 16-bit groups in
/// hex: `AAAA::BBBB::CCCC::DDDD`. The zero address means "unset/invalid".
/// Two addresses compare by raw 64-bit equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAddress(pub u64);

impl NodeAddress {
    pub const UNSET: NodeAddress = NodeAddress(0);

    pub fn is_unset(&self) -> bool {
        self.0 == 0
    }

    /// Splits into the four big-endian 16-bit groups, most significant first.
    fn groups(&self) -> [u16; 4] {
        let b = self.0.to_be_bytes();
        [
            u16::from_be_bytes([b[0], b[1]]),
            u16::from_be_bytes([b[2], b[3]]),
            u16::from_be_bytes([b[4], b[5]]),
            u16::from_be_bytes([b[6], b[7]]),
        ]
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.groups();
        write!(f, "{:x}::{:x}::{:x}::{:x}", g[0], g[1], g[2], g[3])
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({})", self)
    }
}

impl FromStr for NodeAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split("::").collect();
        if parts.len() != 4 {
            return Err(CoreError::MalformedAddress(s.to_string()));
        }
        let mut value: u64 = 0;
        for part in parts {
            if part.is_empty() || part.len() > 4 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(CoreError::MalformedAddress(s.to_string()));
            }
            let group = u16::from_str_radix(part, 16)
                .map_err(|_| CoreError::MalformedAddress(s.to_string()))?;
            value = (value << 16) | u64::from(group);
        }
        Ok(NodeAddress(value))
    }
}
